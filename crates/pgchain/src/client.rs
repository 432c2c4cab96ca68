//! Generic client trait for unified database access.

use crate::error::{ChainError, ChainResult};
use crate::row::{Record, record_from_row};
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Statements arrive already compiled to `$n` placeholders with their positional values,
/// and rows come back as [`Record`]s. Query builders accept anything implementing this
/// trait, so a transaction can be used wherever a client is expected.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<Vec<Record>>> + Send;

    /// Execute a query and return all rows, associating a tag for logging.
    ///
    /// The default implementation ignores `tag` and calls [`GenericClient::query`].
    fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<Vec<Record>>> + Send {
        let _ = tag;
        self.query(sql, params)
    }

    /// Execute a query and return the first row, if any.
    ///
    /// Semantics:
    /// - 0 rows: returns `Ok(None)`
    /// - 1 row: returns `Ok(Some(row))`
    /// - multiple rows: returns `Ok(Some(first_row))` (does **not** error)
    fn query_opt(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<Option<Record>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a query and return the first row, if any, associating a tag.
    fn query_opt_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<Option<Record>>> + Send {
        async move {
            let rows = self.query_tagged(tag, sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<u64>> + Send;

    /// Execute a statement and return the number of affected rows, associating a tag.
    ///
    /// The default implementation ignores `tag` and calls [`GenericClient::execute`].
    fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<u64>> + Send {
        let _ = tag;
        self.execute(sql, params)
    }
}

fn as_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn into_records(rows: Vec<tokio_postgres::Row>) -> ChainResult<Vec<Record>> {
    rows.iter().map(record_from_row).collect()
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> ChainResult<Vec<Record>> {
        let rows = tokio_postgres::Client::query(self, sql, &as_params(params))
            .await
            .map_err(ChainError::from_db_error)?;
        into_records(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ChainResult<u64> {
        tokio_postgres::Client::execute(self, sql, &as_params(params))
            .await
            .map_err(ChainError::from_db_error)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> ChainResult<Vec<Record>> {
        let rows = tokio_postgres::Transaction::query(self, sql, &as_params(params))
            .await
            .map_err(ChainError::from_db_error)?;
        into_records(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ChainResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, &as_params(params))
            .await
            .map_err(ChainError::from_db_error)
    }
}

impl<C: GenericClient> GenericClient for &C {
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<Vec<Record>>> + Send {
        (**self).query(sql, params)
    }

    fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<Vec<Record>>> + Send {
        (**self).query_tagged(tag, sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<u64>> + Send {
        (**self).execute(sql, params)
    }

    fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = ChainResult<u64>> + Send {
        (**self).execute_tagged(tag, sql, params)
    }
}
