use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder,
};

use crate::{entity, error::MessageResult, models::Message, repository::MessageRepository};

const CREATE_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id SERIAL PRIMARY KEY,
    content TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#;

pub struct PgMessageRepository {
    db: DatabaseConnection,
}

impl PgMessageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn ensure_schema(&self) -> MessageResult<()> {
        self.db.execute_unprepared(CREATE_MESSAGES_TABLE).await?;
        Ok(())
    }

    async fn latest(&self) -> MessageResult<Option<Message>> {
        let model = entity::Entity::find()
            .order_by_desc(entity::Column::Id)
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }

    async fn create(&self, content: String) -> MessageResult<Message> {
        let active_model = entity::ActiveModel {
            content: Set(content),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await?;

        tracing::info!(message_id = model.id, "Created message");
        Ok(model.into())
    }

    async fn count(&self) -> MessageResult<u64> {
        let count = entity::Entity::find().count(&self.db).await?;
        Ok(count)
    }

    async fn ping(&self) -> MessageResult<()> {
        database::postgres::check_health(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MessageError;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    fn row(id: i32, content: &str) -> entity::Model {
        entity::Model {
            id,
            content: content.to_string(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1).and_then(|d| d.and_hms_opt(12, 0, 0)),
        }
    }

    #[tokio::test]
    async fn test_latest_maps_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(7, "newest")]])
            .into_connection();
        let repo = PgMessageRepository::new(db);

        let latest = repo.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, 7);
        assert_eq!(latest.content, "newest");
        assert_eq!(latest.timestamp().as_deref(), Some("2025-01-01 12:00:00"));
    }

    #[tokio::test]
    async fn test_latest_on_empty_table() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<entity::Model>::new()])
            .into_connection();
        let repo = PgMessageRepository::new(db);

        assert!(repo.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_returns_stored_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(11, "from test")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 11,
                rows_affected: 1,
            }])
            .into_connection();
        let repo = PgMessageRepository::new(db);

        let created = repo.create("from test".to_string()).await.unwrap();
        assert_eq!(created.id, 11);
        assert_eq!(created.content, "from test");
    }

    #[tokio::test]
    async fn test_ensure_schema_runs_create_table() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let repo = PgMessageRepository::new(db);

        repo.ensure_schema().await.unwrap();

        let log = repo.db.into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(format!("{:?}", log[0]).contains("CREATE TABLE IF NOT EXISTS messages"));
    }

    #[tokio::test]
    async fn test_query_error_becomes_database_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();
        let repo = PgMessageRepository::new(db);

        let err = repo.latest().await.unwrap_err();
        assert!(matches!(err, MessageError::Database(msg) if msg.contains("connection reset")));
    }
}
