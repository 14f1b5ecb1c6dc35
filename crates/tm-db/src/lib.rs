//! tm-db - Database connector layer for Tidemark
//!
//! This crate provides the blocking, transactional `Connector` trait the
//! execution engine drives, and its DuckDB implementation.

pub mod duckdb;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod traits;

pub use duckdb::DuckDbConnector;
pub use error::{DbError, DbResult};
pub use traits::{Connector, SqlValue};
