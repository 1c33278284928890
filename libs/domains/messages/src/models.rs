use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Attribution returned with every `/api/hello` response
pub const MESSAGE_SOURCE: &str = "PostgreSQL Database";

/// Row inserted when the table is first created empty
pub const SEED_MESSAGE: &str = "Hello from PostgreSQL Database!";

/// Content used by `POST /api/message` when none is given
pub const DEFAULT_CONTENT: &str = "New message";

const NO_MESSAGES: &str = "No messages found";

/// A row of the messages table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i32,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Message {
    /// `YYYY-MM-DD HH:MM:SS[.ffffff]`, the form PostgreSQL timestamps print in
    pub fn timestamp(&self) -> Option<String> {
        self.created_at.map(|t| t.to_string())
    }
}

/// Response of `GET /api/hello`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HelloResponse {
    #[schema(example = "Hello from PostgreSQL Database!")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2025-01-01 12:00:00.123456")]
    pub timestamp: Option<String>,
    #[schema(example = "PostgreSQL Database")]
    pub source: String,
}

impl From<Option<Message>> for HelloResponse {
    fn from(latest: Option<Message>) -> Self {
        match latest {
            Some(message) => Self {
                timestamp: message.timestamp(),
                message: message.content,
                source: MESSAGE_SOURCE.to_string(),
            },
            None => Self {
                message: NO_MESSAGES.to_string(),
                timestamp: None,
                source: MESSAGE_SOURCE.to_string(),
            },
        }
    }
}

/// Query string of `POST /api/message`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CreateMessageQuery {
    /// Message text (default "New message")
    pub content: Option<String>,
}

impl CreateMessageQuery {
    pub fn content_or_default(self) -> String {
        self.content.unwrap_or_else(|| DEFAULT_CONTENT.to_string())
    }
}

/// Response of `POST /api/message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedMessage {
    pub id: i32,
    pub content: String,
    pub created_at: Option<String>,
}

impl From<Message> for CreatedMessage {
    fn from(message: Message) -> Self {
        Self {
            created_at: message.timestamp(),
            id: message.id,
            content: message.content,
        }
    }
}

/// Database reachability as reported by `/api/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn message() -> Message {
        Message {
            id: 3,
            content: "hi".to_string(),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 2)
                .and_then(|d| d.and_hms_micro_opt(3, 4, 5, 678_000)),
        }
    }

    #[test]
    fn test_hello_from_latest_message() {
        let hello = HelloResponse::from(Some(message()));
        assert_eq!(hello.message, "hi");
        assert_eq!(hello.timestamp.as_deref(), Some("2025-01-02 03:04:05.678"));
        assert_eq!(hello.source, MESSAGE_SOURCE);
    }

    #[test]
    fn test_hello_without_messages_omits_timestamp() {
        let hello = HelloResponse::from(None);
        let json = serde_json::to_value(&hello).unwrap();

        assert_eq!(json["message"], "No messages found");
        assert_eq!(json["source"], "PostgreSQL Database");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_create_query_defaults_content() {
        assert_eq!(CreateMessageQuery::default().content_or_default(), "New message");
        let query = CreateMessageQuery {
            content: Some("custom".to_string()),
        };
        assert_eq!(query.content_or_default(), "custom");
    }

    #[test]
    fn test_database_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(DatabaseStatus::Disconnected).unwrap(),
            "disconnected"
        );
    }
}
