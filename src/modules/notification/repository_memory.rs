use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{
        model::NewNotification, repository::NotificationRepository, schema::NotificationEntity,
    },
};

/// In-memory notification store for tests.
#[derive(Clone, Default)]
pub struct NotificationRepositoryMemory {
    notifications: Arc<Mutex<Vec<NotificationEntity>>>,
}

impl NotificationRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NotificationRepository for NotificationRepositoryMemory {
    async fn insert(
        &self,
        new: &NewNotification,
    ) -> Result<Option<NotificationEntity>, error::SystemError> {
        let mut notifications = self.notifications.lock().await;

        // Same dedup the partial unique index provides.
        if let Some(event_key) = &new.event_key {
            let duplicate = notifications
                .iter()
                .any(|n| n.user_id == new.user_id && n.event_key.as_ref() == Some(event_key));
            if duplicate {
                return Ok(None);
            }
        }

        let entity = NotificationEntity {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            user_role: new.user_role,
            _type: new._type,
            title: new.title.clone(),
            message: new.message.clone(),
            data: new.data.clone(),
            event_key: new.event_key.clone(),
            read: false,
            created_at: chrono::Utc::now(),
        };

        notifications.push(entity.clone());

        Ok(Some(entity))
    }

    async fn list(
        &self,
        user_id: &Uuid,
        unread_only: bool,
        limit: i64,
        before: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let notifications = self.notifications.lock().await;

        let mut result: Vec<NotificationEntity> = notifications
            .iter()
            .filter(|n| n.user_id == *user_id)
            .filter(|n| !unread_only || !n.read)
            .filter(|n| before.map_or(true, |b| n.created_at < b))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit as usize);

        Ok(result)
    }

    async fn list_since(
        &self,
        user_id: &Uuid,
        since: Option<chrono::DateTime<chrono::Utc>>,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let notifications = self.notifications.lock().await;

        let mut result: Vec<NotificationEntity> = notifications
            .iter()
            .filter(|n| n.user_id == *user_id)
            .filter(|n| since.map_or(true, |s| n.created_at > s))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit as usize);

        Ok(result)
    }

    async fn mark_read(
        &self,
        notification_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut notifications = self.notifications.lock().await;

        let notification = notifications
            .iter_mut()
            .find(|n| n.id == *notification_id && n.user_id == *user_id);

        Ok(match notification {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        })
    }

    async fn mark_all_read(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let mut notifications = self.notifications.lock().await;

        let mut marked = 0;
        for n in notifications.iter_mut().filter(|n| n.user_id == *user_id && !n.read) {
            n.read = true;
            marked += 1;
        }

        Ok(marked)
    }

    async fn delete(
        &self,
        notification_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut notifications = self.notifications.lock().await;

        let before = notifications.len();
        notifications.retain(|n| !(n.id == *notification_id && n.user_id == *user_id));

        Ok(notifications.len() < before)
    }

    async fn unread_count(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let notifications = self.notifications.lock().await;
        Ok(notifications.iter().filter(|n| n.user_id == *user_id && !n.read).count() as i64)
    }
}
