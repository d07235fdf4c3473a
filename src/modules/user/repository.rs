use uuid::Uuid;

use crate::{api::error, modules::user::schema::UserEntity};

/// Read-only view of the identity collaborator. Used to resolve a
/// counterpart's role server-side; a client-supplied role is never trusted.
#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: &Uuid)
        -> Result<Option<UserEntity>, error::SystemError>;
}
