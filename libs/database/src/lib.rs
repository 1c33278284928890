//! Database library providing the PostgreSQL connector and shared utilities
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL support with SeaORM
//! - `config` - Configuration support with `core_config::FromEnv`
//!
//! # Example
//!
//! ```ignore
//! use database::common::RetryConfig;
//! use database::postgres::{PostgresConfig, connect_from_config_with_retry};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = connect_from_config_with_retry(config, Some(RetryConfig::fixed(4, 2000))).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
