use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::modules::user::schema::UserRole;

/// The only two channel shapes that exist. There is deliberately no
/// buyer_seller variant; the type system and the policy engine both refuse
/// that pairing.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "conversation_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    BuyerAgent,
    AgentSeller,
}

/// user_low/user_high are the two participant ids sorted ascending; the
/// store keeps (user_low, user_high, property_id) unique so concurrent
/// get-or-create calls collapse onto one row.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationEntity {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: ConversationType,
    pub property_id: Option<Uuid>,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntity {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip)]
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}
