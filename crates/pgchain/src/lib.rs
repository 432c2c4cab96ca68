//! # pgchain
//!
//! A fluent query builder for PostgreSQL driven by condition strings.
//!
//! ## Features
//!
//! - **Condition strings**: `"age >= 18, status = active"` becomes an AND-conjoined WHERE
//! - **Named placeholders**: `:age_where`, `:name_set`, `:name`, compiled to `$n` at execution
//! - **Sanitized input**: identifiers and text values are stripped of markup and escaped
//! - **Safe defaults**: malformed conditions and unfiltered UPDATE/DELETE are rejected
//! - **Lazy connection**: the handle is dialed on first use and reused afterwards
//! - **Transaction-friendly**: any `GenericClient` (client, transaction, reference) works
//!
//! ## Usage
//!
//! ```ignore
//! use pgchain::prelude::*;
//!
//! let db = Database::new(ConnectionProvider::from_env()?);
//!
//! let adults = db
//!     .from("users")
//!     .filter("age >= 18, status = active")
//!     .order_by([("name", Direction::Asc)])
//!     .limit(20, Some(1))
//!     .select_all(&["id", "name"])
//!     .await?;
//!
//! let id = db
//!     .from("users")
//!     .insert([("name", Value::from("Ann")), ("age", Value::from(30))])
//!     .await?;
//!
//! let removed = db.from("users").filter("id = 5").delete().await?;
//! let total = db.from("users").count().await?;
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod connection;
pub mod error;
pub mod ident;
pub mod log;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod sanitize;
pub mod value;

pub use client::GenericClient;
pub use condition::{ConditionError, Op, Triple};
pub use config::{ConnectionConfig, MalformedConditionPolicy, QueryConfig, UnfilteredWritePolicy};
pub use connection::ConnectionProvider;
pub use error::{ChainError, ChainResult};
pub use ident::Ident;
pub use log::SqlLogger;
pub use qb::{Aggregate, BuiltStatement, Database, Direction, TableQuery};
pub use row::{FromRecord, Record};
pub use sanitize::sanitize;
pub use value::Value;
