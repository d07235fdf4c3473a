/// Message Service
///
/// Append-only message flow on top of the Conversation Manager: resolve or
/// ensure the thread, validate, persist, then notify. The notification
/// fan-out happens after the write through the dispatcher actor's mailbox
/// and can never fail the send.
use actix::{Addr, Recipient};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::conversation::schema::ParticipantEntity;
use crate::modules::conversation::service::ConversationService;
use crate::modules::message::model::{AppendMessage, SendMessageRequest};
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::MessageEntity;
use crate::modules::notification::dispatcher::DispatchEvent;
use crate::modules::notification::events::DomainEvent;
use crate::modules::user::repository::UserRepository;
use crate::modules::websocket::events::SendToUsers;
use crate::modules::websocket::message::ServerMessage;
use crate::modules::websocket::server::WebSocketServer;
use crate::utils::{retry, Principal};

#[derive(Clone)]
pub struct MessageService<C, U, M>
where
    C: ConversationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    conversation_service: ConversationService<C, U, M>,
    conversation_repo: Arc<C>,
    message_repo: Arc<M>,
    /// None in tests without an actor system; fan-out is then the caller's
    /// concern.
    dispatcher: Option<Recipient<DispatchEvent>>,
    ws_server: Option<Arc<Addr<WebSocketServer>>>,
}

impl<C, U, M> MessageService<C, U, M>
where
    C: ConversationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        conversation_service: ConversationService<C, U, M>,
        conversation_repo: Arc<C>,
        message_repo: Arc<M>,
        dispatcher: Option<Recipient<DispatchEvent>>,
        ws_server: Option<Arc<Addr<WebSocketServer>>>,
    ) -> Self {
        MessageService {
            conversation_service,
            conversation_repo,
            message_repo,
            dispatcher,
            ws_server,
        }
    }

    /// Appends a message to an existing thread, or ensures the thread first
    /// when only a recipient is given. The policy engine runs inside
    /// ensure_thread, so an illegal pair fails before anything is written.
    pub async fn send_message(
        &self,
        principal: Principal,
        request: SendMessageRequest,
    ) -> Result<MessageEntity, error::SystemError> {
        let content = request.content.trim().to_string();
        if content.is_empty() && request.attachments.is_empty() {
            return Err(error::SystemError::validation(
                "Message text or at least one attachment is required",
            ));
        }

        let (conversation_id, participants) = match request.conversation_id {
            Some(conversation_id) => {
                let participants = self
                    .conversation_service
                    .participants_for_member(conversation_id, principal.user_id)
                    .await?;
                (conversation_id, participants)
            }
            None => {
                let recipient_id = request.recipient_id.ok_or_else(|| {
                    error::SystemError::validation(
                        "recipientId is required when conversationId is absent",
                    )
                })?;

                let detail = self
                    .conversation_service
                    .ensure_thread(principal, recipient_id, request.property_id)
                    .await?;
                (detail.conversation_id, detail.participants)
            }
        };

        let append = AppendMessage {
            conversation_id,
            sender_id: principal.user_id,
            sender_role: principal.role,
            content: (!content.is_empty()).then_some(content),
            attachments: request.attachments,
        };

        let message =
            retry::with_backoff(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_BASE_DELAY, || {
                self.message_repo.append(&append)
            })
            .await?;

        let recipient_ids: Vec<Uuid> = participants
            .iter()
            .filter(|p| p.user_id != principal.user_id)
            .map(|p| p.user_id)
            .collect();

        self.push_to(
            &recipient_ids,
            ServerMessage::NewMessage {
                conversation_id,
                message: serde_json::to_value(&message).unwrap_or_default(),
            },
        );

        // Fire-and-forget: the append has committed; fan-out failures are
        // the dispatcher's problem, never the sender's.
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.do_send(DispatchEvent::new(DomainEvent::NewMessage {
                message_id: message.id,
                conversation_id,
                sender_id: principal.user_id,
                recipient_ids,
                preview: message.preview(),
            }));
        }

        Ok(message)
    }

    /// Only the original sender may edit.
    pub async fn edit_message(
        &self,
        principal: Principal,
        message_id: Uuid,
        new_content: String,
    ) -> Result<MessageEntity, error::SystemError> {
        let new_content = new_content.trim().to_string();
        if new_content.is_empty() {
            return Err(error::SystemError::validation("Message text must not be empty"));
        }

        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .filter(|m| !m.is_deleted())
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if message.sender_id != principal.user_id {
            return Err(error::SystemError::forbidden("You can only edit your own messages"));
        }

        let edited = self
            .message_repo
            .edit(&message_id, &principal.user_id, &new_content)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        let others = self.other_participants(&message).await?;
        self.push_to(
            &others,
            ServerMessage::MessageEdited {
                conversation_id: message.conversation_id,
                message_id,
                new_content,
            },
        );

        Ok(edited)
    }

    /// Soft delete: the row stays as a tombstone so ordering and the ids of
    /// surrounding messages are preserved; unread counting skips it.
    pub async fn delete_message(
        &self,
        principal: Principal,
        message_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if message.sender_id != principal.user_id {
            return Err(error::SystemError::forbidden("You can only delete your own messages"));
        }

        let deleted = self.message_repo.soft_delete(&message_id, &principal.user_id).await?;
        if !deleted {
            return Err(error::SystemError::not_found("Message not found or already deleted"));
        }

        let others = self.other_participants(&message).await?;
        self.push_to(
            &others,
            ServerMessage::MessageDeleted { conversation_id: message.conversation_id, message_id },
        );

        Ok(())
    }

    async fn other_participants(
        &self,
        message: &MessageEntity,
    ) -> Result<Vec<Uuid>, error::SystemError> {
        let participants: Vec<ParticipantEntity> = self
            .conversation_repo
            .find_participants_by_conversation_id(&[message.conversation_id])
            .await?;

        Ok(participants
            .iter()
            .filter(|p| p.user_id != message.sender_id)
            .map(|p| p.user_id)
            .collect())
    }

    fn push_to(&self, user_ids: &[Uuid], message: ServerMessage) {
        if let Some(server) = &self.ws_server {
            server.do_send(SendToUsers { user_ids: user_ids.to_vec(), message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversation::repository_memory::{
        shared_thread_store, ConversationMemoryRepository,
    };
    use crate::modules::message::repository_memory::MessageRepositoryMemory;
    use crate::modules::user::repository_memory::UserRepositoryMemory;
    use crate::modules::user::schema::UserRole;

    type TestConvSvc = ConversationService<
        ConversationMemoryRepository,
        UserRepositoryMemory,
        MessageRepositoryMemory,
    >;
    type TestSvc = MessageService<
        ConversationMemoryRepository,
        UserRepositoryMemory,
        MessageRepositoryMemory,
    >;

    struct Fixture {
        svc: TestSvc,
        conv_svc: TestConvSvc,
        buyer: Principal,
        seller: Principal,
        agent: Principal,
    }

    async fn fixture() -> Fixture {
        let users = UserRepositoryMemory::new();
        let buyer =
            Principal { user_id: users.seed(UserRole::Buyer, "Mai").await, role: UserRole::Buyer };
        let seller = Principal {
            user_id: users.seed(UserRole::Seller, "Quang").await,
            role: UserRole::Seller,
        };
        let agent =
            Principal { user_id: users.seed(UserRole::Agent, "Linh").await, role: UserRole::Agent };

        let store = shared_thread_store();
        let conversation_repo = Arc::new(ConversationMemoryRepository::new(store.clone()));
        let message_repo = Arc::new(MessageRepositoryMemory::new(store));

        let conv_svc = ConversationService::with_dependencies(
            conversation_repo.clone(),
            Arc::new(users),
            message_repo.clone(),
            None,
        );

        let svc = MessageService::with_dependencies(
            conv_svc.clone(),
            conversation_repo,
            message_repo,
            None,
            None,
        );

        Fixture { svc, conv_svc, buyer, seller, agent }
    }

    fn text_message(conversation_id: Option<Uuid>, recipient_id: Option<Uuid>, text: &str) -> SendMessageRequest {
        SendMessageRequest {
            conversation_id,
            recipient_id,
            property_id: None,
            content: text.to_string(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn send_updates_summary_and_ordering() {
        let f = fixture().await;

        let thread = f.conv_svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();

        f.svc
            .send_message(f.buyer, text_message(Some(thread.conversation_id), None, "first"))
            .await
            .unwrap();
        let second = f
            .svc
            .send_message(f.buyer, text_message(Some(thread.conversation_id), None, "second"))
            .await
            .unwrap();

        // Summary and updated_at reflect exactly the latest message.
        let threads = f.conv_svc.list_threads(f.buyer.user_id).await.unwrap();
        let listed = &threads[0];
        let summary = listed.last_message.as_ref().unwrap();
        assert_eq!(summary.message_id, second.id);
        assert_eq!(summary.content.as_deref(), Some("second"));
        assert!(listed.updated_at >= thread.updated_at);

        // And the thread's page ends with it, in ascending order.
        let (messages, _) = f
            .conv_svc
            .get_messages(thread.conversation_id, f.buyer, 50, None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.last().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn send_without_thread_ensures_one() {
        let f = fixture().await;

        let message = f
            .svc
            .send_message(f.buyer, text_message(None, Some(f.agent.user_id), "Interested in P1"))
            .await
            .unwrap();

        let threads = f.conv_svc.list_threads(f.agent.user_id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].conversation_id, message.conversation_id);
        assert_eq!(threads[0].unread_count, 1);
    }

    #[tokio::test]
    async fn buyer_to_seller_send_fails_and_writes_nothing() {
        let f = fixture().await;

        let err = f
            .svc
            .send_message(f.buyer, text_message(None, Some(f.seller.user_id), "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::PolicyViolation(_)));

        assert!(f.conv_svc.list_threads(f.buyer.user_id).await.unwrap().is_empty());
        assert!(f.conv_svc.list_threads(f.seller.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_without_attachments_is_rejected() {
        let f = fixture().await;

        let err = f
            .svc
            .send_message(f.buyer, text_message(None, Some(f.agent.user_id), "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::Validation(_)));
    }

    #[tokio::test]
    async fn attachment_only_message_is_allowed() {
        let f = fixture().await;

        let message = f
            .svc
            .send_message(
                f.buyer,
                SendMessageRequest {
                    conversation_id: None,
                    recipient_id: Some(f.agent.user_id),
                    property_id: None,
                    content: String::new(),
                    attachments: vec!["file://floorplan.pdf".to_string()],
                },
            )
            .await
            .unwrap();

        assert!(message.content.is_none());
        assert_eq!(message.attachments.len(), 1);
    }

    #[tokio::test]
    async fn non_participants_cannot_send_into_a_thread() {
        let f = fixture().await;

        let thread = f.conv_svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();

        let err = f
            .svc
            .send_message(f.seller, text_message(Some(thread.conversation_id), None, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn unread_goes_to_zero_on_mark_read_and_back_up_on_new_message() {
        let f = fixture().await;

        let thread = f.conv_svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();
        let thread_id = thread.conversation_id;

        f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "one")).await.unwrap();
        f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "two")).await.unwrap();

        let agent_view = f.conv_svc.list_threads(f.agent.user_id).await.unwrap();
        assert_eq!(agent_view[0].unread_count, 2);

        f.conv_svc.mark_read(thread_id, f.agent, None).await.unwrap();
        let agent_view = f.conv_svc.list_threads(f.agent.user_id).await.unwrap();
        assert_eq!(agent_view[0].unread_count, 0);

        f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "three")).await.unwrap();
        let agent_view = f.conv_svc.list_threads(f.agent.user_id).await.unwrap();
        assert_eq!(agent_view[0].unread_count, 1);
    }

    #[tokio::test]
    async fn partial_mark_read_only_covers_given_ids() {
        let f = fixture().await;

        let thread = f.conv_svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();
        let thread_id = thread.conversation_id;

        let first =
            f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "one")).await.unwrap();
        f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "two")).await.unwrap();

        f.conv_svc.mark_read(thread_id, f.agent, Some(vec![first.id])).await.unwrap();

        let agent_view = f.conv_svc.list_threads(f.agent.user_id).await.unwrap();
        assert_eq!(agent_view[0].unread_count, 1);
    }

    #[tokio::test]
    async fn only_the_sender_may_edit() {
        let f = fixture().await;

        let message = f
            .svc
            .send_message(f.buyer, text_message(None, Some(f.agent.user_id), "typo"))
            .await
            .unwrap();

        let err = f
            .svc
            .edit_message(f.agent, message.id, "fixed".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let edited = f.svc.edit_message(f.buyer, message.id, "fixed".to_string()).await.unwrap();
        assert_eq!(edited.content.as_deref(), Some("fixed"));
        assert!(edited.is_edited);
    }

    #[tokio::test]
    async fn soft_delete_preserves_ordering_and_drops_unread() {
        let f = fixture().await;

        let thread = f.conv_svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();
        let thread_id = thread.conversation_id;

        let first =
            f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "one")).await.unwrap();
        let second =
            f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "two")).await.unwrap();
        let third =
            f.svc.send_message(f.buyer, text_message(Some(thread_id), None, "three")).await.unwrap();

        // Deleting by someone else is forbidden and changes nothing.
        let err = f.svc.delete_message(f.agent, second.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        f.svc.delete_message(f.buyer, second.id).await.unwrap();

        let (messages, _) =
            f.conv_svc.get_messages(thread_id, f.buyer, 50, None).await.unwrap();
        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first.id, third.id]);

        let agent_view = f.conv_svc.list_threads(f.agent.user_id).await.unwrap();
        assert_eq!(agent_view[0].unread_count, 2);

        // Double delete is NotFound, not a second tombstone.
        let err = f.svc.delete_message(f.buyer, second.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[actix_web::test]
    async fn send_fans_out_a_new_message_notification() {
        use crate::modules::notification::dispatcher::Dispatcher;
        use crate::modules::notification::repository_memory::NotificationRepositoryMemory;
        use crate::modules::notification::schema::NotificationType;
        use crate::modules::notification::service::NotificationService;
        use crate::modules::property::repository_memory::PropertyRepositoryMemory;
        use actix::Actor;

        let users = UserRepositoryMemory::new();
        let buyer =
            Principal { user_id: users.seed(UserRole::Buyer, "Mai").await, role: UserRole::Buyer };
        let agent =
            Principal { user_id: users.seed(UserRole::Agent, "Linh").await, role: UserRole::Agent };

        let store = shared_thread_store();
        let conversation_repo = Arc::new(ConversationMemoryRepository::new(store.clone()));
        let message_repo = Arc::new(MessageRepositoryMemory::new(store));
        let users = Arc::new(users);

        let notification_service = NotificationService::with_dependencies(
            Arc::new(NotificationRepositoryMemory::new()),
            Arc::new(PropertyRepositoryMemory::new()),
            users.clone(),
            None,
        );
        let dispatcher = Dispatcher::new(notification_service.clone()).start().recipient();

        let conv_svc = ConversationService::with_dependencies(
            conversation_repo.clone(),
            users,
            message_repo.clone(),
            None,
        );
        let svc = MessageService::with_dependencies(
            conv_svc.clone(),
            conversation_repo,
            message_repo,
            Some(dispatcher),
            None,
        );

        let thread = conv_svc.ensure_thread(buyer, agent.user_id, None).await.unwrap();
        svc.send_message(
            buyer,
            text_message(Some(thread.conversation_id), None, "Interested in P1"),
        )
        .await
        .unwrap();

        // Fan-out runs behind the dispatcher's mailbox; give it a beat.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let inbox = notification_service.list(&agent.user_id, true, 50, None).await.unwrap();
        assert_eq!(inbox.notifications.len(), 1);
        assert_eq!(inbox.notifications[0]._type, NotificationType::NewMessage);
        assert_eq!(inbox.unread_count, 1);

        // The sender gets nothing.
        let sender_inbox = notification_service.list(&buyer.user_id, true, 50, None).await.unwrap();
        assert!(sender_inbox.notifications.is_empty());

        // The recipient opens the thread and the unread counters drain.
        conv_svc.mark_read(thread.conversation_id, agent, None).await.unwrap();
        let agent_view = conv_svc.list_threads(agent.user_id).await.unwrap();
        assert_eq!(agent_view[0].unread_count, 0);
    }

    #[tokio::test]
    async fn cursor_paging_walks_the_thread_in_order() {
        let f = fixture().await;

        let thread = f.conv_svc.ensure_thread(f.buyer, f.agent.user_id, None).await.unwrap();
        let thread_id = thread.conversation_id;

        let mut sent = Vec::new();
        for i in 0..5 {
            sent.push(
                f.svc
                    .send_message(f.buyer, text_message(Some(thread_id), None, &format!("m{i}")))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let (page1, cursor1) =
            f.conv_svc.get_messages(thread_id, f.buyer, 2, None).await.unwrap();
        assert_eq!(page1.iter().map(|m| m.id).collect::<Vec<_>>(), sent[0..2]);
        let cursor1 = cursor1.expect("more pages expected");

        let (page2, cursor2) =
            f.conv_svc.get_messages(thread_id, f.buyer, 2, Some(cursor1)).await.unwrap();
        assert_eq!(page2.iter().map(|m| m.id).collect::<Vec<_>>(), sent[2..4]);
        let cursor2 = cursor2.expect("more pages expected");

        let (page3, cursor3) =
            f.conv_svc.get_messages(thread_id, f.buyer, 2, Some(cursor2)).await.unwrap();
        assert_eq!(page3.iter().map(|m| m.id).collect::<Vec<_>>(), sent[4..5]);
        assert!(cursor3.is_none());
    }
}
