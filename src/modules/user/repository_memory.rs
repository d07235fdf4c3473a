use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        repository::UserRepository,
        schema::{UserEntity, UserRole},
    },
};

/// In-memory user directory for tests.
#[derive(Clone, Default)]
pub struct UserRepositoryMemory {
    users: Arc<Mutex<HashMap<Uuid, UserEntity>>>,
}

impl UserRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, role: UserRole, display_name: &str) -> Uuid {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();
        let user = UserEntity {
            id,
            role,
            display_name: display_name.to_string(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().await.insert(id, user);
        id
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryMemory {
    async fn find_by_id(
        &self,
        user_id: &Uuid,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let users = self.users.lock().await;
        Ok(users.get(user_id).filter(|u| u.deleted_at.is_none()).cloned())
    }
}
