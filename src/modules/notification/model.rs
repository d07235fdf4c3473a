use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::notification::schema::{NotificationEntity, NotificationType};
use crate::modules::user::schema::UserRole;

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub user_role: UserRole,
    pub _type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub event_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQueryRequest {
    #[serde(default)]
    pub unread_only: bool,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Exclusive upper bound on created_at for older pages.
    pub before: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationEntity>,
    pub unread_count: i64,
}

// Producer hook payloads. Each carries the producer's event id so retries
// deduplicate.

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUnlockedPayload {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub property_id: Uuid,
    pub buyer_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InspectionPayload {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub property_id: Uuid,
    pub scheduled_for: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyerPropertyPayload {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub property_id: Uuid,
    pub buyer_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub buyer_id: Uuid,
    pub property_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PriceDropPayload {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub property_id: Uuid,
    pub buyer_id: Uuid,
    pub old_price: i64,
    pub new_price: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignmentPayload {
    #[validate(length(min = 1))]
    pub event_id: String,
    pub agent_id: Uuid,
    pub property_id: Option<Uuid>,
}
