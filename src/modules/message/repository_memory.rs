use std::collections::HashMap;

use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::model::LastMessageRow;
use crate::modules::conversation::repository_memory::SharedThreadStore;
use crate::modules::message::model::{AppendMessage, MessageCursor};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::MessageEntity;

/// In-memory message store sharing state with `ConversationMemoryRepository`,
/// so appends bump the conversation's updated_at exactly like the Postgres
/// transaction does.
#[derive(Clone)]
pub struct MessageRepositoryMemory {
    store: SharedThreadStore,
}

impl MessageRepositoryMemory {
    pub fn new(store: SharedThreadStore) -> Self {
        Self { store }
    }
}

fn is_unread_by(message: &MessageEntity, user_id: &Uuid, reads: &std::collections::HashSet<(Uuid, Uuid)>) -> bool {
    message.sender_id != *user_id
        && message.deleted_at.is_none()
        && !reads.contains(&(message.id, *user_id))
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryMemory {
    async fn append(
        &self,
        message: &AppendMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        let mut state = self.store.lock().await;

        let now = chrono::Utc::now();
        let entity = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender_role: message.sender_role,
            content: message.content.clone(),
            attachments: message.attachments.clone(),
            is_edited: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        state.last_messages.insert(
            entity.conversation_id,
            LastMessageRow {
                message_id: entity.id,
                sender_id: entity.sender_id,
                content: entity.content.clone(),
                created_at: entity.created_at,
            },
        );

        if let Some(conversation) = state.conversations.get_mut(&entity.conversation_id) {
            conversation.updated_at = now;
        }

        state.messages.push(entity.clone());

        Ok(entity)
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state.messages.iter().find(|m| m.id == *message_id).cloned())
    }

    async fn list_page(
        &self,
        conversation_id: &Uuid,
        limit: i64,
        after: Option<MessageCursor>,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        let state = self.store.lock().await;

        let mut messages: Vec<MessageEntity> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id && m.deleted_at.is_none())
            .filter(|m| match &after {
                Some((created_at, id)) => (m.created_at, m.id) > (*created_at, *id),
                None => true,
            })
            .cloned()
            .collect();

        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        messages.truncate(limit as usize);

        Ok(messages)
    }

    async fn mark_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> Result<u64, error::SystemError> {
        let mut state = self.store.lock().await;

        let targets: Vec<Uuid> = state
            .messages
            .iter()
            .filter(|m| {
                m.conversation_id == *conversation_id
                    && m.sender_id != *user_id
                    && m.deleted_at.is_none()
                    && message_ids.map_or(true, |ids| ids.contains(&m.id))
            })
            .map(|m| m.id)
            .collect();

        let mut marked = 0;
        for message_id in targets {
            if state.message_reads.insert((message_id, *user_id)) {
                marked += 1;
            }
        }

        Ok(marked)
    }

    async fn edit(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let mut state = self.store.lock().await;

        let message = state.messages.iter_mut().find(|m| {
            m.id == *message_id && m.sender_id == *sender_id && m.deleted_at.is_none()
        });

        Ok(message.map(|m| {
            m.content = Some(content.to_string());
            m.is_edited = true;
            m.updated_at = chrono::Utc::now();
            m.clone()
        }))
    }

    async fn soft_delete(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut state = self.store.lock().await;

        let message = state.messages.iter_mut().find(|m| {
            m.id == *message_id && m.sender_id == *sender_id && m.deleted_at.is_none()
        });

        Ok(match message {
            Some(m) => {
                let now = chrono::Utc::now();
                m.deleted_at = Some(now);
                m.updated_at = now;
                true
            }
            None => false,
        })
    }

    async fn unread_by_thread(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<i64, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .filter(|m| is_unread_by(m, user_id, &state.message_reads))
            .count() as i64)
    }

    async fn unread_by_threads(
        &self,
        user_id: &Uuid,
        conversation_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>, error::SystemError> {
        let state = self.store.lock().await;

        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for message in &state.messages {
            if conversation_ids.contains(&message.conversation_id)
                && is_unread_by(message, user_id, &state.message_reads)
            {
                *counts.entry(message.conversation_id).or_insert(0) += 1;
            }
        }

        Ok(counts)
    }

    async fn unread_total(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let state = self.store.lock().await;

        let member_of: Vec<Uuid> = state
            .participants
            .iter()
            .filter(|p| p.user_id == *user_id && p.deleted_at.is_none())
            .map(|p| p.conversation_id)
            .collect();

        Ok(state
            .messages
            .iter()
            .filter(|m| member_of.contains(&m.conversation_id))
            .filter(|m| is_unread_by(m, user_id, &state.message_reads))
            .count() as i64)
    }
}
