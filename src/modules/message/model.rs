use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error;
use crate::modules::message::schema::MessageEntity;
use crate::modules::user::schema::UserRole;

#[derive(Debug, Clone)]
pub struct AppendMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: UserRole,
    pub content: Option<String>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Target thread; when absent, `recipient_id` must be set and the
    /// thread is ensured first.
    pub conversation_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMessageResponse {
    pub messages: Vec<MessageEntity>,
    pub cursor: Option<String>,
}

/// Paging position inside a thread: the (created_at, id) of the last seen
/// message. Encoded as "<rfc3339>|<uuid>".
pub type MessageCursor = (chrono::DateTime<chrono::Utc>, Uuid);

pub fn encode_cursor(cursor: &MessageCursor) -> String {
    format!("{}|{}", cursor.0.to_rfc3339(), cursor.1)
}

pub fn parse_cursor(raw: &str) -> Result<MessageCursor, error::SystemError> {
    let (ts, id) = raw
        .split_once('|')
        .ok_or_else(|| error::SystemError::bad_request("Invalid cursor format"))?;

    let created_at = chrono::DateTime::parse_from_rfc3339(ts)
        .map_err(|_| error::SystemError::bad_request("Invalid cursor format"))?
        .with_timezone(&chrono::Utc);

    let id = Uuid::parse_str(id)
        .map_err(|_| error::SystemError::bad_request("Invalid cursor format"))?;

    Ok((created_at, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrip() {
        let cursor = (chrono::Utc::now(), Uuid::now_v7());
        let parsed = parse_cursor(&encode_cursor(&cursor)).unwrap();
        assert_eq!(parsed.0, cursor.0);
        assert_eq!(parsed.1, cursor.1);
    }

    #[test]
    fn malformed_cursor_is_bad_request() {
        assert!(parse_cursor("not-a-cursor").is_err());
        assert!(parse_cursor("2024-01-01T00:00:00Z|not-a-uuid").is_err());
        assert!(parse_cursor("not-a-date|00000000-0000-0000-0000-000000000000").is_err());
    }
}
