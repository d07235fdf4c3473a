use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::conversation::schema::{ConversationType, ParticipantEntity};
use crate::modules::user::schema::UserRole;

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub _type: ConversationType,
    pub property_id: Option<Uuid>,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub participants: Vec<NewParticipant>,
}

/// Flat row shape for the list query (nullable last-message columns).
#[derive(FromRow)]
pub struct ConversationRaw {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: ConversationType,
    pub property_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,

    pub last_message_id: Option<Uuid>,
    pub last_sender_id: Option<Uuid>,
    pub last_content: Option<String>,
    pub last_created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Denormalized pointer to the latest message, for list-view rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageRow {
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub conversation_id: Uuid,
    pub _type: ConversationType,
    pub property_id: Option<Uuid>,
    pub last_message: Option<LastMessageRow>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// What the UI gets per thread: participants, latest message and the
/// requesting user's unread count (recomputed, never stored).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub conversation_id: Uuid,
    #[serde(rename = "type")]
    pub _type: ConversationType,
    pub property_id: Option<Uuid>,
    pub participants: Vec<ParticipantEntity>,
    pub last_message: Option<LastMessageRow>,
    pub unread_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnsureThreadRequest {
    pub other_user_id: Uuid,
    pub property_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub message_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessageQueryRequest {
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
    pub cursor: Option<String>,
}
