//! Convenient imports for typical `pgchain` usage.
//!
//! ```ignore
//! use pgchain::prelude::*;
//! ```

pub use crate::{
    ChainError, ChainResult, ConnectionConfig, ConnectionProvider, Database, Direction,
    FromRecord, GenericClient, QueryConfig, Record, TableQuery, Value,
};
