use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::model::{ConversationRow, LastMessageRow, NewConversation};
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::conversation::schema::{ConversationEntity, ParticipantEntity};
use crate::modules::message::schema::MessageEntity;

/// Backing state for the in-memory Thread Store. One lock guards the whole
/// store, which makes every repository operation atomic the same way a
/// single Postgres transaction is.
#[derive(Default)]
pub struct ThreadStoreState {
    pub conversations: HashMap<Uuid, ConversationEntity>,
    pub participants: Vec<ParticipantEntity>,
    pub messages: Vec<MessageEntity>,
    /// (message_id, user_id) pairs; mirrors the message_reads table.
    pub message_reads: HashSet<(Uuid, Uuid)>,
    pub last_messages: HashMap<Uuid, LastMessageRow>,
}

pub type SharedThreadStore = Arc<Mutex<ThreadStoreState>>;

pub fn shared_thread_store() -> SharedThreadStore {
    Arc::new(Mutex::new(ThreadStoreState::default()))
}

/// In-memory Thread Store, the test-side counterpart of
/// `ConversationPgRepository`. Selected by dependency injection at
/// construction time, never by runtime branching.
#[derive(Clone)]
pub struct ConversationMemoryRepository {
    store: SharedThreadStore,
}

impl ConversationMemoryRepository {
    pub fn new(store: SharedThreadStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationMemoryRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state.conversations.get(conversation_id).cloned())
    }

    async fn find_by_participants(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        property_id: Option<&Uuid>,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state
            .conversations
            .values()
            .find(|c| {
                c.user_low == *user_low
                    && c.user_high == *user_high
                    && c.property_id.as_ref() == property_id
            })
            .cloned())
    }

    async fn create(
        &self,
        new: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut state = self.store.lock().await;

        // Same uniqueness the Postgres index enforces.
        let duplicate = state.conversations.values().any(|c| {
            c.user_low == new.user_low
                && c.user_high == new.user_high
                && c.property_id == new.property_id
        });
        if duplicate {
            return Err(error::SystemError::Conflict(None));
        }

        let now = chrono::Utc::now();
        let conversation = ConversationEntity {
            id: Uuid::now_v7(),
            _type: new._type,
            property_id: new.property_id,
            user_low: new.user_low,
            user_high: new.user_high,
            created_at: now,
            updated_at: now,
        };

        for participant in &new.participants {
            state.participants.push(ParticipantEntity {
                conversation_id: conversation.id,
                user_id: participant.user_id,
                role: participant.role,
                joined_at: now,
                deleted_at: None,
            });
        }

        state.conversations.insert(conversation.id, conversation.clone());

        Ok(conversation)
    }

    async fn find_participants_by_conversation_id(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| conversation_ids.contains(&p.conversation_id) && p.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state.participants.iter().any(|p| {
            p.conversation_id == *conversation_id
                && p.user_id == *user_id
                && p.deleted_at.is_none()
        }))
    }

    async fn find_last_message(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<LastMessageRow>, error::SystemError> {
        let state = self.store.lock().await;
        Ok(state.last_messages.get(conversation_id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationRow>, error::SystemError> {
        let state = self.store.lock().await;

        let conversation_ids: HashSet<Uuid> = state
            .participants
            .iter()
            .filter(|p| p.user_id == *user_id && p.deleted_at.is_none())
            .map(|p| p.conversation_id)
            .collect();

        let mut rows: Vec<ConversationRow> = state
            .conversations
            .values()
            .filter(|c| conversation_ids.contains(&c.id))
            .map(|c| ConversationRow {
                conversation_id: c.id,
                _type: c._type,
                property_id: c.property_id,
                last_message: state.last_messages.get(&c.id).cloned(),
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();

        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(rows)
    }
}
