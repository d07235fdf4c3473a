use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    api::error,
    modules::property::{repository::PropertyRepository, schema::PropertyEntity},
};

/// In-memory listing lookup for tests.
#[derive(Clone, Default)]
pub struct PropertyRepositoryMemory {
    properties: Arc<Mutex<HashMap<Uuid, PropertyEntity>>>,
}

impl PropertyRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, title: &str, seller_id: Uuid, agent_id: Option<Uuid>) -> Uuid {
        let id = Uuid::now_v7();
        let property = PropertyEntity {
            id,
            title: title.to_string(),
            seller_id,
            agent_id,
            created_at: chrono::Utc::now(),
        };
        self.properties.lock().await.insert(id, property);
        id
    }
}

#[async_trait::async_trait]
impl PropertyRepository for PropertyRepositoryMemory {
    async fn find_by_id(
        &self,
        property_id: &Uuid,
    ) -> Result<Option<PropertyEntity>, error::SystemError> {
        Ok(self.properties.lock().await.get(property_id).cloned())
    }
}
