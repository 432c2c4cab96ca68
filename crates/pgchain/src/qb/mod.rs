//! Fluent query builder.
//!
//! A [`Database`] wraps one client handle and hands out [`TableQuery`] sessions. Each
//! session collects clause fragments and named bindings, and a terminal operation turns
//! them into one statement:
//!
//! ```ignore
//! use pgchain::prelude::*;
//!
//! let db = Database::new(ConnectionProvider::from_env()?);
//!
//! // SELECT * FROM "users" WHERE "age" >= :age_where AND "status" = :status_where
//! let adults = db
//!     .from("users")
//!     .filter("age >= 18, status = active")
//!     .select_all(&[])
//!     .await?;
//!
//! // INSERT INTO "users" ("name", "age") VALUES (:name, :age) RETURNING "id"
//! let id = db
//!     .from("users")
//!     .insert([("name", Value::from("Ann")), ("age", Value::from(30))])
//!     .await?;
//!
//! // UPDATE "users" SET "status" = :status_set WHERE "id" = :id_where
//! db.from("users").filter("id = 5").update([("status", "inactive")]).await?;
//!
//! // DELETE FROM "users" WHERE "id" = :id_where
//! db.from("users").filter("id = 5").delete().await?;
//!
//! // SELECT COUNT(*) AS total FROM "users"
//! let total = db.from("users").count().await?;
//! ```
//!
//! Named placeholders are compiled to `$n` right before execution, and text values are
//! sanitized when they are bound.

mod execute;
mod param;
mod table;

pub use param::{Binder, Binding, Clause, Compiled};
pub use table::{Aggregate, BuiltStatement, Direction, TableQuery};

use crate::client::GenericClient;
use crate::config::QueryConfig;
use crate::error::ChainResult;
use crate::log::SqlLogger;
use crate::row::Record;

/// Entry point: one client handle plus the [`QueryConfig`] its sessions follow.
#[derive(Debug)]
pub struct Database<C> {
    client: C,
    config: QueryConfig,
    logger: SqlLogger,
}

impl<C> Database<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, QueryConfig::default())
    }

    pub fn with_config(client: C, config: QueryConfig) -> Self {
        let logger = SqlLogger::from(&config);
        Self {
            client,
            config,
            logger,
        }
    }

    /// Start a session against `table`. The name is sanitized and quoted.
    pub fn from(&self, table: &str) -> TableQuery<'_, C> {
        TableQuery::new(self, table)
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }
}

impl<C: GenericClient> Database<C> {
    pub(crate) async fn fetch_all(&self, statement: &BuiltStatement) -> ChainResult<Vec<Record>> {
        self.logger.log(statement);
        self.client
            .query_tagged(
                statement.tag,
                &statement.compiled.sql,
                &statement.compiled.params,
            )
            .await
    }

    pub(crate) async fn fetch_opt(
        &self,
        statement: &BuiltStatement,
    ) -> ChainResult<Option<Record>> {
        self.logger.log(statement);
        self.client
            .query_opt_tagged(
                statement.tag,
                &statement.compiled.sql,
                &statement.compiled.params,
            )
            .await
    }

    pub(crate) async fn execute(&self, statement: &BuiltStatement) -> ChainResult<u64> {
        self.logger.log(statement);
        self.client
            .execute_tagged(
                statement.tag,
                &statement.compiled.sql,
                &statement.compiled.params,
            )
            .await
    }
}
