use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Listing record as seen by this subsystem: enough to address the owning
/// seller and managing agent and to render notification text.
#[derive(Debug, Clone, FromRow)]
pub struct PropertyEntity {
    pub id: Uuid,
    pub title: String,
    pub seller_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
