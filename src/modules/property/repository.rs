use uuid::Uuid;

use crate::{api::error, modules::property::schema::PropertyEntity};

/// Read-only view of the listing collaborator.
#[async_trait::async_trait]
pub trait PropertyRepository {
    async fn find_by_id(
        &self,
        property_id: &Uuid,
    ) -> Result<Option<PropertyEntity>, error::SystemError>;
}
