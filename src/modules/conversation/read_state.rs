/// Read-State Tracker
///
/// The single place unread numbers come from. Counts are recomputed from
/// message_reads and notification read flags on every call; nothing here
/// increments or decrements, so concurrent writers cannot make the numbers
/// drift from the underlying rows.
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::message::repository::MessageRepository;
use crate::modules::message::schema::UnreadSummary;
use crate::modules::notification::repository::NotificationRepository;

#[derive(Clone)]
pub struct ReadStateService<M, N>
where
    M: MessageRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    message_repo: Arc<M>,
    notification_repo: Arc<N>,
}

impl<M, N> ReadStateService<M, N>
where
    M: MessageRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(message_repo: Arc<M>, notification_repo: Arc<N>) -> Self {
        ReadStateService { message_repo, notification_repo }
    }

    pub async fn unread_total(
        &self,
        user_id: &Uuid,
    ) -> Result<UnreadSummary, error::SystemError> {
        let messages = self.message_repo.unread_total(user_id).await?;
        let notifications = self.notification_repo.unread_count(user_id).await?;

        Ok(UnreadSummary { messages, notifications, total: messages + notifications })
    }

    pub async fn unread_by_thread(
        &self,
        user_id: &Uuid,
        conversation_id: &Uuid,
    ) -> Result<i64, error::SystemError> {
        self.message_repo.unread_by_thread(conversation_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversation::model::{NewConversation, NewParticipant};
    use crate::modules::conversation::repository::ConversationRepository;
    use crate::modules::conversation::repository_memory::{
        shared_thread_store, ConversationMemoryRepository,
    };
    use crate::modules::conversation::schema::ConversationType;
    use crate::modules::message::model::AppendMessage;
    use crate::modules::message::repository_memory::MessageRepositoryMemory;
    use crate::modules::notification::model::NewNotification;
    use crate::modules::notification::repository_memory::NotificationRepositoryMemory;
    use crate::modules::notification::schema::NotificationType;
    use crate::modules::user::schema::UserRole;

    #[tokio::test]
    async fn totals_combine_messages_and_notifications() {
        let store = shared_thread_store();
        let conversations = ConversationMemoryRepository::new(store.clone());
        let messages = Arc::new(MessageRepositoryMemory::new(store));
        let notifications = Arc::new(NotificationRepositoryMemory::new());

        let buyer = Uuid::now_v7();
        let agent = Uuid::now_v7();
        let (user_low, user_high) = if buyer < agent { (buyer, agent) } else { (agent, buyer) };

        let conversation = conversations
            .create(&NewConversation {
                _type: ConversationType::BuyerAgent,
                property_id: None,
                user_low,
                user_high,
                participants: vec![
                    NewParticipant { user_id: buyer, role: UserRole::Buyer },
                    NewParticipant { user_id: agent, role: UserRole::Agent },
                ],
            })
            .await
            .unwrap();

        use crate::modules::message::repository::MessageRepository as _;
        for _ in 0..2 {
            messages
                .append(&AppendMessage {
                    conversation_id: conversation.id,
                    sender_id: agent,
                    sender_role: UserRole::Agent,
                    content: Some("hello".to_string()),
                    attachments: vec![],
                })
                .await
                .unwrap();
        }

        use crate::modules::notification::repository::NotificationRepository as _;
        notifications
            .insert(&NewNotification {
                user_id: buyer,
                user_role: UserRole::Buyer,
                _type: NotificationType::StatusUpdate,
                title: "Status update".to_string(),
                message: "Offer accepted".to_string(),
                data: serde_json::json!({}),
                event_key: None,
            })
            .await
            .unwrap();

        let tracker = ReadStateService::with_dependencies(messages.clone(), notifications);

        let summary = tracker.unread_total(&buyer).await.unwrap();
        assert_eq!(summary.messages, 2);
        assert_eq!(summary.notifications, 1);
        assert_eq!(summary.total, 3);

        assert_eq!(tracker.unread_by_thread(&buyer, &conversation.id).await.unwrap(), 2);

        // The sender owes nothing on their own messages.
        assert_eq!(tracker.unread_by_thread(&agent, &conversation.id).await.unwrap(), 0);

        // Recomputation follows the rows: marking read zeroes the count.
        messages.mark_read(&conversation.id, &buyer, None).await.unwrap();
        let summary = tracker.unread_total(&buyer).await.unwrap();
        assert_eq!(summary.messages, 0);
        assert_eq!(summary.total, 1);
    }
}
