//! Shared test infrastructure backed by throwaway containers.
//!
//! - `TestDatabase`: PostgreSQL container (feature: "postgres")
//! - `TestRabbitMq`: RabbitMQ container (feature: "rabbitmq")
//!
//! Both need a running Docker daemon, so tests using them are marked
//! `#[ignore = "requires docker"]` and run with `cargo test -- --ignored`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::TestDatabase;
//!
//! #[tokio::test]
//! #[ignore = "requires docker"]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let repo = PgMessageRepository::new(db.connection());
//! }
//! ```
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["rabbitmq"] }
//! ```

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "rabbitmq")]
mod rabbitmq;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

#[cfg(feature = "rabbitmq")]
pub use rabbitmq::TestRabbitMq;
