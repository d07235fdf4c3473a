use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{model::NewNotification, schema::NotificationEntity},
};

/// Notification store. Insertion deduplicates on (user_id, event_key);
/// every mutation is scoped to the owning user, so a foreign id behaves
/// exactly like a missing one.
#[async_trait::async_trait]
pub trait NotificationRepository {
    /// Returns None when (user_id, event_key) already exists.
    async fn insert(
        &self,
        new: &NewNotification,
    ) -> Result<Option<NotificationEntity>, error::SystemError>;

    async fn list(
        &self,
        user_id: &Uuid,
        unread_only: bool,
        limit: i64,
        before: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<NotificationEntity>, error::SystemError>;

    /// Delta feed for the poll fallback; `since` is exclusive.
    async fn list_since(
        &self,
        user_id: &Uuid,
        since: Option<chrono::DateTime<chrono::Utc>>,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, error::SystemError>;

    async fn mark_read(
        &self,
        notification_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn mark_all_read(&self, user_id: &Uuid) -> Result<u64, error::SystemError>;

    async fn delete(
        &self,
        notification_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn unread_count(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;
}
