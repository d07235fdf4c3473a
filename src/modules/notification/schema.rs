use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::modules::user::schema::UserRole;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PropertyUnlocked,
    InspectionBooked,
    InspectionScheduled,
    NewMatch,
    StatusUpdate,
    NewProperty,
    PriceDrop,
    NewAssignment,
    NewMessage,
}

/// One record per recipient; fan-out never shares a row between users, so
/// read state stays per-user. `event_key` is the dedup key for retried
/// dispatches ((user_id, event_key) unique where present).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_role: UserRole,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub _type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    #[serde(skip)]
    pub event_key: Option<String>,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
