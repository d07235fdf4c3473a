use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::{ConversationRow, LastMessageRow, NewConversation},
        schema::{ConversationEntity, ParticipantEntity},
    },
};

/// Thread Store access pattern. Implementations must keep
/// (user_low, user_high, property_id) unique and surface a duplicate insert
/// as `SystemError::Conflict` so the manager can treat a lost race as
/// "fetch the winner".
#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    async fn find_by_participants(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        property_id: Option<&Uuid>,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Atomic insert of the conversation and both participant rows.
    async fn create(
        &self,
        new: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError>;

    async fn find_participants_by_conversation_id(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<ParticipantEntity>, error::SystemError>;

    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn find_last_message(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<LastMessageRow>, error::SystemError>;

    /// Conversations the user participates in, most recently updated first.
    async fn list_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationRow>, error::SystemError>;
}
