//! Messages Domain
//!
//! The `messages` table behind `/api/hello` and `/api/message`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← Axum routes + OpenAPI
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Seeding, query metrics
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + PostgreSQL / in-memory)
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_messages::{MessageService, PgMessageRepository};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//!
//! let service = MessageService::new(PgMessageRepository::new(db));
//! service.initialize().await?;
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::{MessageError, MessageResult};
pub use handlers::{MessagesApiDoc, router};
pub use memory::InMemoryMessageRepository;
pub use models::{CreateMessageQuery, CreatedMessage, DatabaseStatus, HelloResponse, Message};
pub use postgres::PgMessageRepository;
pub use repository::MessageRepository;
pub use service::MessageService;
