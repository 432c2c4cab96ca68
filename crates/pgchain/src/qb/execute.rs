//! Terminal operations: assemble, bind, run, and shape the result.

use crate::client::GenericClient;
use crate::error::ChainResult;
use crate::qb::table::{Aggregate, TableQuery};
use crate::row::{FromRecord, Record};
use crate::value::Value;

fn collect_values<K, V, I>(values: I) -> Vec<(String, Value)>
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl<C: GenericClient> TableQuery<'_, C> {
    /// Every matching row. An empty `columns` slice selects `*`.
    pub async fn select_all(self, columns: &[&str]) -> ChainResult<Vec<Record>> {
        let statement = self.select_statement(columns)?;
        self.db.fetch_all(&statement).await
    }

    /// The first matching row, or `None`. Adds `LIMIT 1` when no limit is set.
    pub async fn select_one(self, columns: &[&str]) -> ChainResult<Option<Record>> {
        let statement = self.select_one_statement(columns)?;
        self.db.fetch_opt(&statement).await
    }

    /// Like [`TableQuery::select_all`], mapping each row through [`FromRecord`].
    pub async fn select_all_as<T: FromRecord>(self, columns: &[&str]) -> ChainResult<Vec<T>> {
        let records = self.select_all(columns).await?;
        records.iter().map(T::from_record).collect()
    }

    /// Like [`TableQuery::select_one`], mapping the row through [`FromRecord`].
    pub async fn select_one_as<T: FromRecord>(self, columns: &[&str]) -> ChainResult<Option<T>> {
        let record = self.select_one(columns).await?;
        record.as_ref().map(T::from_record).transpose()
    }

    /// Insert one row and return its primary key (see [`TableQuery::primary_key`]).
    ///
    /// ```ignore
    /// let id = db
    ///     .from("users")
    ///     .insert([("name", Value::from("Ann")), ("age", Value::from(30))])
    ///     .await?;
    /// ```
    pub async fn insert<K, V, I>(self, values: I) -> ChainResult<Value>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let statement = self.insert_statement(&collect_values(values))?;
        let record = self.db.fetch_opt(&statement).await?;
        Ok(record
            .and_then(|r| r.values().first().cloned())
            .unwrap_or(Value::Null))
    }

    /// Update matching rows and return how many were affected.
    pub async fn update<K, V, I>(self, values: I) -> ChainResult<u64>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let statement = self.update_statement(&collect_values(values))?;
        self.db.execute(&statement).await
    }

    /// Delete matching rows and return how many were affected.
    pub async fn delete(self) -> ChainResult<u64> {
        let statement = self.delete_statement()?;
        self.db.execute(&statement).await
    }

    /// `COUNT(*)`.
    pub async fn count(self) -> ChainResult<Value> {
        self.aggregate(Aggregate::Count, None).await
    }

    /// `COUNT(column)`: non-null values only.
    pub async fn count_column(self, column: &str) -> ChainResult<Value> {
        self.aggregate(Aggregate::Count, Some(column)).await
    }

    pub async fn sum(self, column: &str) -> ChainResult<Value> {
        self.aggregate(Aggregate::Sum, Some(column)).await
    }

    pub async fn avg(self, column: &str) -> ChainResult<Value> {
        self.aggregate(Aggregate::Avg, Some(column)).await
    }

    pub async fn min(self, column: &str) -> ChainResult<Value> {
        self.aggregate(Aggregate::Min, Some(column)).await
    }

    pub async fn max(self, column: &str) -> ChainResult<Value> {
        self.aggregate(Aggregate::Max, Some(column)).await
    }

    /// `total` of the first result row, or [`Value::Null`] when there is none.
    pub async fn aggregate(self, aggregate: Aggregate, column: Option<&str>) -> ChainResult<Value> {
        let statement = self.aggregate_statement(aggregate, column)?;
        let record = self.db.fetch_opt(&statement).await?;
        Ok(record
            .and_then(|r| r.get("total").cloned())
            .unwrap_or(Value::Null))
    }
}
