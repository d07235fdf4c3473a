use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::modules::user::schema::UserRole;

/// One message in a thread. Ids are uuid v7, so they sort by creation time;
/// (created_at, id) gives the total order within a conversation. Deletion
/// is a tombstone so ordering and surrounding ids never shift.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: UserRole,
    pub content: Option<String>,
    pub attachments: Vec<String>,
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MessageEntity {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Short text used for last-message summaries and notification bodies.
    pub fn preview(&self) -> String {
        match &self.content {
            Some(text) => text.chars().take(120).collect(),
            None => "[attachment]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadSummary {
    pub messages: i64,
    pub notifications: i64,
    pub total: i64,
}
