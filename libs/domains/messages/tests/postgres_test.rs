//! Against a real PostgreSQL. Run with `cargo test -p domain_messages -- --ignored`.

use domain_messages::{
    DatabaseStatus, MessageRepository, MessageService, PgMessageRepository,
    models::SEED_MESSAGE,
};
use test_utils::TestDatabase;

#[tokio::test]
#[ignore = "requires docker"]
async fn initialize_creates_table_and_seeds_once() {
    let db = TestDatabase::new().await;
    let service = MessageService::new(PgMessageRepository::new(db.connection()));

    service.initialize().await.unwrap();
    service.initialize().await.unwrap();

    let repo = PgMessageRepository::new(db.connection());
    assert_eq!(repo.count().await.unwrap(), 1);
    let latest = repo.latest().await.unwrap().unwrap();
    assert_eq!(latest.content, SEED_MESSAGE);
    assert!(latest.created_at.is_some());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn create_returns_serial_id_and_server_timestamp() {
    let db = TestDatabase::new().await;
    let repo = PgMessageRepository::new(db.connection());
    repo.ensure_schema().await.unwrap();

    let first = repo.create("one".to_string()).await.unwrap();
    let second = repo.create("two".to_string()).await.unwrap();

    assert_eq!(second.id, first.id + 1);
    assert!(second.created_at.is_some());
    assert_eq!(repo.latest().await.unwrap().unwrap().content, "two");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn database_status_is_connected() {
    let db = TestDatabase::new().await;
    let service = MessageService::new(PgMessageRepository::new(db.connection()));

    assert_eq!(service.database_status().await, DatabaseStatus::Connected);
}
