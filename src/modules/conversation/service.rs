/// Conversation Manager
///
/// Owns thread lifecycle: get-or-create, listing, paging and read state.
/// The policy engine is consulted before anything is written; a lost
/// creation race is resolved by re-reading the winner instead of erroring.
use actix::Addr;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::model::{ConversationDetail, NewConversation, NewParticipant};
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::conversation::schema::{ConversationEntity, ParticipantEntity};
use crate::modules::message::model::{encode_cursor, parse_cursor};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::MessageEntity;
use crate::modules::policy;
use crate::modules::user::repository::UserRepository;
use crate::modules::websocket::events::SendToUsers;
use crate::modules::websocket::message::ServerMessage;
use crate::modules::websocket::server::WebSocketServer;
use crate::utils::{retry, Principal};

#[derive(Clone)]
pub struct ConversationService<C, U, M>
where
    C: ConversationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    conversation_repo: Arc<C>,
    user_repo: Arc<U>,
    message_repo: Arc<M>,
    ws_server: Option<Arc<Addr<WebSocketServer>>>,
}

impl<C, U, M> ConversationService<C, U, M>
where
    C: ConversationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        conversation_repo: Arc<C>,
        user_repo: Arc<U>,
        message_repo: Arc<M>,
        ws_server: Option<Arc<Addr<WebSocketServer>>>,
    ) -> Self {
        ConversationService { conversation_repo, user_repo, message_repo, ws_server }
    }

    /// Idempotent get-or-create for the thread between the caller and
    /// `other_user_id`, optionally scoped to a property. The counterpart's
    /// role is resolved here, server-side; the policy check runs before any
    /// write. Two concurrent calls for the same pair converge on one row:
    /// the loser sees the store's uniqueness conflict and re-reads.
    pub async fn ensure_thread(
        &self,
        principal: Principal,
        other_user_id: Uuid,
        property_id: Option<Uuid>,
    ) -> Result<ConversationDetail, error::SystemError> {
        if principal.user_id == other_user_id {
            return Err(error::SystemError::validation(
                "Cannot open a conversation with yourself",
            ));
        }

        let other = self
            .user_repo
            .find_by_id(&other_user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let _type = policy::conversation_type_for(&principal.role, &other.role)?;
        if !policy::is_valid_conversation_type(&_type) {
            return Err(error::SystemError::policy_violation(policy::BUYER_SELLER_REASON));
        }

        let (user_low, user_high) = if principal.user_id < other_user_id {
            (principal.user_id, other_user_id)
        } else {
            (other_user_id, principal.user_id)
        };

        let existing = retry::with_backoff(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_BASE_DELAY, || {
            self.conversation_repo.find_by_participants(
                &user_low,
                &user_high,
                property_id.as_ref(),
            )
        })
        .await?;

        if let Some(conversation) = existing {
            return self.detail_for(&conversation, &principal.user_id).await;
        }

        let new = NewConversation {
            _type,
            property_id,
            user_low,
            user_high,
            participants: vec![
                NewParticipant { user_id: principal.user_id, role: principal.role },
                NewParticipant { user_id: other.id, role: other.role },
            ],
        };

        let conversation = match self.conversation_repo.create(&new).await {
            Ok(conversation) => conversation,
            // Lost the race: fetch the row the winner created.
            Err(e) if e.is_conflict() => self
                .conversation_repo
                .find_by_participants(&user_low, &user_high, property_id.as_ref())
                .await?
                .ok_or_else(|| {
                    error::SystemError::DatabaseError(
                        "Conversation conflict without a matching row".into(),
                    )
                })?,
            Err(e) => return Err(e),
        };

        self.detail_for(&conversation, &principal.user_id).await
    }

    async fn detail_for(
        &self,
        conversation: &ConversationEntity,
        user_id: &Uuid,
    ) -> Result<ConversationDetail, error::SystemError> {
        let participants = self
            .conversation_repo
            .find_participants_by_conversation_id(&[conversation.id])
            .await?;
        let last_message = self.conversation_repo.find_last_message(&conversation.id).await?;
        let unread_count = self.message_repo.unread_by_thread(&conversation.id, user_id).await?;

        Ok(ConversationDetail {
            conversation_id: conversation.id,
            _type: conversation._type,
            property_id: conversation.property_id,
            participants,
            last_message,
            unread_count,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    /// Participants of a thread, failing with NotFound when the caller is
    /// not one of them. Non-members learn nothing about the thread's
    /// existence.
    pub async fn participants_for_member(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        let participants = self
            .conversation_repo
            .find_participants_by_conversation_id(&[conversation_id])
            .await?;

        if !participants.iter().any(|p| p.user_id == user_id) {
            return Err(error::SystemError::not_found("Conversation not found"));
        }

        Ok(participants)
    }

    /// All threads the user participates in, most recently updated first,
    /// each carrying the caller's recomputed unread count.
    pub async fn list_threads(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationDetail>, error::SystemError> {
        let rows = self.conversation_repo.list_by_user(&user_id).await?;

        let conversation_ids: Vec<Uuid> = rows.iter().map(|r| r.conversation_id).collect();

        let participants = self
            .conversation_repo
            .find_participants_by_conversation_id(&conversation_ids)
            .await?;

        let participant_map = participants.into_iter().fold(
            HashMap::<Uuid, Vec<ParticipantEntity>>::new(),
            |mut acc, participant| {
                acc.entry(participant.conversation_id).or_default().push(participant);
                acc
            },
        );

        let mut unread = self.message_repo.unread_by_threads(&user_id, &conversation_ids).await?;

        let details = rows
            .into_iter()
            .map(|row| ConversationDetail {
                conversation_id: row.conversation_id,
                _type: row._type,
                property_id: row.property_id,
                participants: participant_map.get(&row.conversation_id).cloned().unwrap_or_default(),
                last_message: row.last_message,
                unread_count: unread.remove(&row.conversation_id).unwrap_or(0),
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect();

        Ok(details)
    }

    /// One ascending page of a thread's messages, cursor-paged.
    pub async fn get_messages(
        &self,
        conversation_id: Uuid,
        principal: Principal,
        limit: i64,
        cursor: Option<String>,
    ) -> Result<(Vec<MessageEntity>, Option<String>), error::SystemError> {
        self.participants_for_member(conversation_id, principal.user_id).await?;

        let after = match cursor {
            Some(raw) => Some(parse_cursor(&raw)?),
            None => None,
        };

        let mut messages =
            self.message_repo.list_page(&conversation_id, limit + 1, after).await?;

        let next_cursor = if messages.len() > limit as usize {
            messages.truncate(limit as usize);
            messages.last().map(|m| encode_cursor(&(m.created_at, m.id)))
        } else {
            None
        };

        Ok((messages, next_cursor))
    }

    /// Marks messages in the thread as read by the caller; all of them when
    /// `message_ids` is None. Idempotent, safe against concurrent arrivals:
    /// a message landing mid-call simply stays unread.
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        principal: Principal,
        message_ids: Option<Vec<Uuid>>,
    ) -> Result<(), error::SystemError> {
        let participants =
            self.participants_for_member(conversation_id, principal.user_id).await?;

        retry::with_backoff(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_BASE_DELAY, || {
            self.message_repo.mark_read(
                &conversation_id,
                &principal.user_id,
                message_ids.as_deref(),
            )
        })
        .await?;

        // Read receipt for the counterpart's open clients.
        if let Some(server) = &self.ws_server {
            let others: Vec<Uuid> = participants
                .iter()
                .filter(|p| p.user_id != principal.user_id)
                .map(|p| p.user_id)
                .collect();

            server.do_send(SendToUsers {
                user_ids: others,
                message: ServerMessage::MessagesRead {
                    conversation_id,
                    user_id: principal.user_id,
                },
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversation::repository_memory::{
        shared_thread_store, ConversationMemoryRepository,
    };
    use crate::modules::conversation::schema::ConversationType;
    use crate::modules::message::repository_memory::MessageRepositoryMemory;
    use crate::modules::user::repository_memory::UserRepositoryMemory;
    use crate::modules::user::schema::UserRole;

    type TestSvc = ConversationService<
        ConversationMemoryRepository,
        UserRepositoryMemory,
        MessageRepositoryMemory,
    >;

    struct Fixture {
        svc: TestSvc,
        buyer: Principal,
        seller: Principal,
        agent: Principal,
        other_agent: Principal,
    }

    async fn fixture() -> Fixture {
        let users = UserRepositoryMemory::new();
        let buyer = Principal { user_id: users.seed(UserRole::Buyer, "Mai").await, role: UserRole::Buyer };
        let seller =
            Principal { user_id: users.seed(UserRole::Seller, "Quang").await, role: UserRole::Seller };
        let agent =
            Principal { user_id: users.seed(UserRole::Agent, "Linh").await, role: UserRole::Agent };
        let other_agent =
            Principal { user_id: users.seed(UserRole::Agent, "Tuan").await, role: UserRole::Agent };

        let store = shared_thread_store();
        let svc = ConversationService::with_dependencies(
            Arc::new(ConversationMemoryRepository::new(store.clone())),
            Arc::new(users),
            Arc::new(MessageRepositoryMemory::new(store)),
            None,
        );

        Fixture { svc, buyer, seller, agent, other_agent }
    }

    #[tokio::test]
    async fn buyer_and_agent_get_a_typed_thread() {
        let f = fixture().await;

        let detail = f.svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();

        assert_eq!(detail._type, ConversationType::BuyerAgent);
        assert_eq!(detail.participants.len(), 2);
        assert_eq!(detail.unread_count, 0);
    }

    #[tokio::test]
    async fn agent_and_seller_get_a_typed_thread() {
        let f = fixture().await;

        let detail = f.svc.ensure_thread(f.seller, f.agent.user_id, None).await.unwrap();

        assert_eq!(detail._type, ConversationType::AgentSeller);
    }

    #[tokio::test]
    async fn agent_to_agent_is_allowed() {
        let f = fixture().await;

        let detail = f.svc.ensure_thread(f.agent, f.other_agent.user_id, None).await.unwrap();

        assert_eq!(detail.participants.len(), 2);
    }

    #[tokio::test]
    async fn buyer_seller_is_rejected_and_nothing_is_written() {
        let f = fixture().await;

        let err = f.svc.ensure_thread(f.buyer, f.seller.user_id, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::PolicyViolation(_)));

        let err = f.svc.ensure_thread(f.seller, f.buyer.user_id, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::PolicyViolation(_)));

        assert!(f.svc.list_threads(f.buyer.user_id).await.unwrap().is_empty());
        assert!(f.svc.list_threads(f.seller.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_thread_is_idempotent() {
        let f = fixture().await;

        let first = f.svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();
        let second = f.svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();
        // Order of the pair must not matter either.
        let third = f.svc.ensure_thread(f.agent, f.buyer.user_id, None).await.unwrap();

        assert_eq!(first.conversation_id, second.conversation_id);
        assert_eq!(first.conversation_id, third.conversation_id);
    }

    #[tokio::test]
    async fn concurrent_ensure_thread_creates_one_conversation() {
        let f = fixture().await;

        let svc_a = f.svc.clone();
        let svc_b = f.svc.clone();
        let (buyer, agent_id) = (f.buyer, f.agent.user_id);

        let a = tokio::spawn(async move { svc_a.ensure_thread(buyer, agent_id, None).await });
        let b = tokio::spawn(async move { svc_b.ensure_thread(buyer, agent_id, None).await });

        let id_a = a.await.unwrap().unwrap().conversation_id;
        let id_b = b.await.unwrap().unwrap().conversation_id;

        assert_eq!(id_a, id_b);
        assert_eq!(f.svc.list_threads(f.buyer.user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn property_scope_separates_threads() {
        let f = fixture().await;

        let p1 = Uuid::now_v7();
        let p2 = Uuid::now_v7();

        let with_p1 = f.svc.ensure_thread(f.buyer, f.agent.user_id, Some(p1)).await.unwrap();
        let with_p2 = f.svc.ensure_thread(f.buyer, f.agent.user_id, Some(p2)).await.unwrap();
        let without = f.svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();

        assert_ne!(with_p1.conversation_id, with_p2.conversation_id);
        assert_ne!(with_p1.conversation_id, without.conversation_id);

        let again = f.svc.ensure_thread(f.buyer, f.agent.user_id, Some(p1)).await.unwrap();
        assert_eq!(with_p1.conversation_id, again.conversation_id);
    }

    #[tokio::test]
    async fn self_thread_is_a_validation_error() {
        let f = fixture().await;

        let err = f.svc.ensure_thread(f.buyer, f.buyer.user_id, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_counterpart_is_not_found() {
        let f = fixture().await;

        let err = f.svc.ensure_thread(f.buyer, Uuid::now_v7(), None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_members_cannot_see_or_mark_a_thread() {
        let f = fixture().await;

        let detail = f.svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();

        let err = f
            .svc
            .get_messages(detail.conversation_id, f.other_agent, 50, None)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));

        let err = f
            .svc
            .mark_read(detail.conversation_id, f.other_agent, None)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let f = fixture().await;

        let detail = f.svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();

        f.svc.mark_read(detail.conversation_id, f.buyer, None).await.unwrap();
        f.svc.mark_read(detail.conversation_id, f.buyer, None).await.unwrap();
    }
}
