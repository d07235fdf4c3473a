use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::{AppendMessage, MessageCursor},
        schema::MessageEntity,
    },
};

/// Message side of the Thread Store. `append` is a single atomic write that
/// also maintains the denormalized last-message row and the conversation's
/// updated_at, so no read-modify-write cycle exists on the hot path. All
/// unread numbers are recomputed from rows, never kept as counters.
#[async_trait::async_trait]
pub trait MessageRepository {
    async fn append(
        &self,
        message: &AppendMessage,
    ) -> Result<MessageEntity, error::SystemError>;

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Ascending (created_at, id) page; `after` is an exclusive lower bound.
    async fn list_page(
        &self,
        conversation_id: &Uuid,
        limit: i64,
        after: Option<MessageCursor>,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    /// Set-based, idempotent: marks the given messages (or every message in
    /// the thread when `message_ids` is None) as read by `user_id`,
    /// skipping the user's own and deleted messages. Returns the number of
    /// newly marked rows.
    async fn mark_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> Result<u64, error::SystemError>;

    async fn edit(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    async fn soft_delete(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn unread_by_thread(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<i64, error::SystemError>;

    async fn unread_by_threads(
        &self,
        user_id: &Uuid,
        conversation_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>, error::SystemError>;

    async fn unread_total(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;
}
