/// Notification Dispatcher
///
/// Translates domain events into per-recipient notification records and
/// pushes them to connected sessions. Fan-out never shares a record; dedup
/// rides on the store's (user_id, event_key) uniqueness, so a retried
/// dispatch is a no-op instead of a duplicate.
use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::notification::events::DomainEvent;
use crate::modules::notification::model::{NewNotification, NotificationListResponse};
use crate::modules::notification::repository::NotificationRepository;
use crate::modules::notification::schema::{NotificationEntity, NotificationType};
use crate::modules::property::repository::PropertyRepository;
use crate::modules::property::schema::PropertyEntity;
use crate::modules::user::repository::UserRepository;
use crate::modules::websocket::events::SendToUser;
use crate::modules::websocket::message::ServerMessage;
use crate::modules::websocket::server::WebSocketServer;

pub struct NotificationService<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    notification_repo: Arc<N>,
    property_repo: Arc<P>,
    user_repo: Arc<U>,
    /// None in tests; pushes are skipped and recipients rely on the poll
    /// fallback, which is also the production behavior for offline users.
    ws_server: Option<Arc<Addr<WebSocketServer>>>,
}

// Manual Clone: the fields are all `Arc`, so cloning never requires the type
// parameters themselves to be `Clone` (which `#[derive(Clone)]` would demand).
impl<N, P, U> Clone for NotificationService<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        NotificationService {
            notification_repo: Arc::clone(&self.notification_repo),
            property_repo: Arc::clone(&self.property_repo),
            user_repo: Arc::clone(&self.user_repo),
            ws_server: self.ws_server.clone(),
        }
    }
}

impl<N, P, U> NotificationService<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        notification_repo: Arc<N>,
        property_repo: Arc<P>,
        user_repo: Arc<U>,
        ws_server: Option<Arc<Addr<WebSocketServer>>>,
    ) -> Self {
        NotificationService { notification_repo, property_repo, user_repo, ws_server }
    }

    /// Fan a domain event out into notification records, one per recipient.
    /// Returns only the records created by this call; recipients already
    /// covered by an earlier delivery of the same event are skipped.
    pub async fn dispatch(
        &self,
        event: &DomainEvent,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let planned = self.fanout_plan(event).await?;

        let mut created = Vec::with_capacity(planned.len());
        for new in &planned {
            match self.notification_repo.insert(new).await? {
                Some(notification) => {
                    self.push(&notification);
                    created.push(notification);
                }
                None => {
                    tracing::debug!(
                        "Duplicate dispatch skipped (user {}, key {:?})",
                        new.user_id,
                        new.event_key
                    );
                }
            }
        }

        Ok(created)
    }

    pub async fn list(
        &self,
        user_id: &Uuid,
        unread_only: bool,
        limit: i64,
        before: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<NotificationListResponse, error::SystemError> {
        let notifications =
            self.notification_repo.list(user_id, unread_only, limit, before).await?;
        let unread_count = self.notification_repo.unread_count(user_id).await?;

        Ok(NotificationListResponse { notifications, unread_count })
    }

    pub async fn list_since(
        &self,
        user_id: &Uuid,
        since: Option<chrono::DateTime<chrono::Utc>>,
        limit: i64,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        self.notification_repo.list_since(user_id, since, limit).await
    }

    pub async fn mark_read(
        &self,
        notification_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.notification_repo.mark_read(notification_id, user_id).await? {
            return Err(error::SystemError::not_found("Notification not found"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        self.notification_repo.mark_all_read(user_id).await
    }

    pub async fn delete(
        &self,
        notification_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.notification_repo.delete(notification_id, user_id).await? {
            return Err(error::SystemError::not_found("Notification not found"));
        }
        Ok(())
    }

    pub async fn unread_count(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        self.notification_repo.unread_count(user_id).await
    }

    fn push(&self, notification: &NotificationEntity) {
        let Some(server) = &self.ws_server else {
            return;
        };

        let payload = match serde_json::to_value(notification) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize notification {}: {}", notification.id, e);
                return;
            }
        };

        server.do_send(SendToUser {
            user_id: notification.user_id,
            message: ServerMessage::NewNotification { notification: payload },
        });
    }

    async fn property(&self, property_id: &Uuid) -> Result<PropertyEntity, error::SystemError> {
        self.property_repo
            .find_by_id(property_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Property not found"))
    }

    async fn display_name(&self, user_id: &Uuid) -> String {
        match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => user.display_name,
            _ => "Someone".to_string(),
        }
    }

    /// Builds one NewNotification per recipient. Recipients that no longer
    /// resolve to a user are dropped with a warning rather than failing the
    /// rest of the fan-out.
    async fn fanout_plan(
        &self,
        event: &DomainEvent,
    ) -> Result<Vec<NewNotification>, error::SystemError> {
        let event_key = event.event_key();

        let drafts: Vec<(Uuid, NotificationType, String, String, serde_json::Value)> = match event
        {
            DomainEvent::PropertyUnlocked { property_id, buyer_id, .. } => {
                let property = self.property(property_id).await?;
                let buyer = self.display_name(buyer_id).await;
                vec![(
                    property.seller_id,
                    NotificationType::PropertyUnlocked,
                    "Property unlocked".to_string(),
                    format!("{} unlocked your property \"{}\"", buyer, property.title),
                    serde_json::json!({ "propertyId": property_id, "buyerId": buyer_id }),
                )]
            }

            DomainEvent::InspectionBooked { property_id, scheduled_for, .. }
            | DomainEvent::InspectionScheduled { property_id, scheduled_for, .. } => {
                let property = self.property(property_id).await?;
                let _type = match event {
                    DomainEvent::InspectionBooked { .. } => NotificationType::InspectionBooked,
                    _ => NotificationType::InspectionScheduled,
                };
                let message = format!(
                    "An inspection of \"{}\" is scheduled for {}",
                    property.title,
                    scheduled_for.format("%Y-%m-%d %H:%M")
                );
                let data = serde_json::json!({
                    "propertyId": property_id,
                    "scheduledFor": scheduled_for,
                });

                let mut drafts = vec![(
                    property.seller_id,
                    _type,
                    "Inspection scheduled".to_string(),
                    message.clone(),
                    data.clone(),
                )];
                if let Some(agent_id) = property.agent_id {
                    drafts.push((
                        agent_id,
                        _type,
                        "Inspection scheduled".to_string(),
                        message,
                        data,
                    ));
                }
                drafts
            }

            DomainEvent::NewMatch { property_id, buyer_id, .. } => {
                let property = self.property(property_id).await?;
                vec![(
                    *buyer_id,
                    NotificationType::NewMatch,
                    "New match".to_string(),
                    format!("\"{}\" matches your search", property.title),
                    serde_json::json!({ "propertyId": property_id }),
                )]
            }

            DomainEvent::StatusUpdate { buyer_id, property_id, status, .. } => {
                vec![(
                    *buyer_id,
                    NotificationType::StatusUpdate,
                    "Status update".to_string(),
                    status.clone(),
                    serde_json::json!({ "propertyId": property_id }),
                )]
            }

            DomainEvent::NewProperty { property_id, buyer_id, .. } => {
                let property = self.property(property_id).await?;
                vec![(
                    *buyer_id,
                    NotificationType::NewProperty,
                    "New property".to_string(),
                    format!("New listing: \"{}\"", property.title),
                    serde_json::json!({ "propertyId": property_id }),
                )]
            }

            DomainEvent::PriceDrop { property_id, buyer_id, old_price, new_price, .. } => {
                let property = self.property(property_id).await?;
                vec![(
                    *buyer_id,
                    NotificationType::PriceDrop,
                    "Price drop".to_string(),
                    format!(
                        "\"{}\" dropped from {} to {}",
                        property.title, old_price, new_price
                    ),
                    serde_json::json!({
                        "propertyId": property_id,
                        "oldPrice": old_price,
                        "newPrice": new_price,
                    }),
                )]
            }

            DomainEvent::NewAssignment { agent_id, property_id, .. } => {
                vec![(
                    *agent_id,
                    NotificationType::NewAssignment,
                    "New assignment".to_string(),
                    "You have a new assignment".to_string(),
                    serde_json::json!({ "propertyId": property_id }),
                )]
            }

            DomainEvent::NewMessage {
                conversation_id,
                sender_id,
                recipient_ids,
                preview,
                ..
            } => {
                let sender = self.display_name(sender_id).await;
                recipient_ids
                    .iter()
                    .filter(|id| *id != sender_id)
                    .map(|recipient| {
                        (
                            *recipient,
                            NotificationType::NewMessage,
                            format!("New message from {sender}"),
                            preview.clone(),
                            serde_json::json!({
                                "conversationId": conversation_id,
                                "senderId": sender_id,
                            }),
                        )
                    })
                    .collect()
            }
        };

        let mut planned = Vec::with_capacity(drafts.len());
        for (user_id, _type, title, message, data) in drafts {
            let Some(user) = self.user_repo.find_by_id(&user_id).await? else {
                tracing::warn!("Dropping notification for unknown user {}", user_id);
                continue;
            };

            planned.push(NewNotification {
                user_id,
                user_role: user.role,
                _type,
                title,
                message,
                data,
                event_key: Some(event_key.clone()),
            });
        }

        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::notification::repository_memory::NotificationRepositoryMemory;
    use crate::modules::property::repository_memory::PropertyRepositoryMemory;
    use crate::modules::user::repository_memory::UserRepositoryMemory;
    use crate::modules::user::schema::UserRole;

    type TestSvc = NotificationService<
        NotificationRepositoryMemory,
        PropertyRepositoryMemory,
        UserRepositoryMemory,
    >;

    struct Fixture {
        svc: TestSvc,
        buyer: Uuid,
        seller: Uuid,
        agent: Uuid,
        property: Uuid,
    }

    async fn fixture() -> Fixture {
        let users = UserRepositoryMemory::new();
        let buyer = users.seed(UserRole::Buyer, "Mai").await;
        let seller = users.seed(UserRole::Seller, "Quang").await;
        let agent = users.seed(UserRole::Agent, "Linh").await;

        let properties = PropertyRepositoryMemory::new();
        let property = properties.seed("Riverside Apartment", seller, Some(agent)).await;

        let svc = NotificationService::with_dependencies(
            Arc::new(NotificationRepositoryMemory::new()),
            Arc::new(properties),
            Arc::new(users),
            None,
        );

        Fixture { svc, buyer, seller, agent, property }
    }

    #[tokio::test]
    async fn property_unlocked_targets_the_seller() {
        let f = fixture().await;

        let created = f
            .svc
            .dispatch(&DomainEvent::PropertyUnlocked {
                event_id: "evt-1".to_string(),
                property_id: f.property,
                buyer_id: f.buyer,
            })
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].user_id, f.seller);
        assert_eq!(created[0]._type, NotificationType::PropertyUnlocked);
        assert!(created[0].message.contains("Riverside Apartment"));
    }

    #[tokio::test]
    async fn retried_event_creates_exactly_one_record() {
        let f = fixture().await;

        let event = DomainEvent::PropertyUnlocked {
            event_id: "evt-retry".to_string(),
            property_id: f.property,
            buyer_id: f.buyer,
        };

        let first = f.svc.dispatch(&event).await.unwrap();
        let second = f.svc.dispatch(&event).await.unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());

        let listed = f.svc.list(&f.seller, false, 50, None).await.unwrap();
        assert_eq!(listed.notifications.len(), 1);
    }

    #[tokio::test]
    async fn inspection_booked_notifies_seller_and_agent() {
        let f = fixture().await;

        let created = f
            .svc
            .dispatch(&DomainEvent::InspectionBooked {
                event_id: "evt-2".to_string(),
                property_id: f.property,
                scheduled_for: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let recipients: Vec<Uuid> = created.iter().map(|n| n.user_id).collect();
        assert_eq!(created.len(), 2);
        assert!(recipients.contains(&f.seller));
        assert!(recipients.contains(&f.agent));
    }

    #[tokio::test]
    async fn new_message_fans_out_to_recipients_but_not_sender() {
        let f = fixture().await;

        let created = f
            .svc
            .dispatch(&DomainEvent::NewMessage {
                message_id: Uuid::now_v7(),
                conversation_id: Uuid::now_v7(),
                sender_id: f.buyer,
                recipient_ids: vec![f.agent, f.buyer],
                preview: "Interested in the riverside apartment".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].user_id, f.agent);
        assert_eq!(created[0]._type, NotificationType::NewMessage);
        assert!(created[0].title.contains("Mai"));
    }

    #[tokio::test]
    async fn new_assignment_targets_the_agent() {
        let f = fixture().await;

        let created = f
            .svc
            .dispatch(&DomainEvent::NewAssignment {
                event_id: "evt-3".to_string(),
                agent_id: f.agent,
                property_id: Some(f.property),
            })
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].user_id, f.agent);
        assert_eq!(created[0].user_role, UserRole::Agent);
    }

    #[tokio::test]
    async fn mark_all_read_resets_unread_count() {
        let f = fixture().await;

        for i in 0..3 {
            f.svc
                .dispatch(&DomainEvent::StatusUpdate {
                    event_id: format!("evt-status-{i}"),
                    buyer_id: f.buyer,
                    property_id: None,
                    status: "Offer accepted".to_string(),
                })
                .await
                .unwrap();
        }

        assert_eq!(f.svc.unread_count(&f.buyer).await.unwrap(), 3);

        f.svc.mark_all_read(&f.buyer).await.unwrap();
        assert_eq!(f.svc.unread_count(&f.buyer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn foreign_notification_ids_behave_like_missing_ones() {
        let f = fixture().await;

        let created = f
            .svc
            .dispatch(&DomainEvent::StatusUpdate {
                event_id: "evt-4".to_string(),
                buyer_id: f.buyer,
                property_id: None,
                status: "Viewing confirmed".to_string(),
            })
            .await
            .unwrap();

        // The seller cannot read or delete the buyer's record.
        let err = f.svc.mark_read(&created[0].id, &f.seller).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));

        let err = f.svc.delete(&created[0].id, &f.seller).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn unread_only_filter_hides_read_records() {
        let f = fixture().await;

        let created = f
            .svc
            .dispatch(&DomainEvent::StatusUpdate {
                event_id: "evt-5".to_string(),
                buyer_id: f.buyer,
                property_id: None,
                status: "Documents ready".to_string(),
            })
            .await
            .unwrap();

        f.svc.mark_read(&created[0].id, &f.buyer).await.unwrap();

        let listed = f.svc.list(&f.buyer, true, 50, None).await.unwrap();
        assert!(listed.notifications.is_empty());
        assert_eq!(listed.unread_count, 0);

        let all = f.svc.list(&f.buyer, false, 50, None).await.unwrap();
        assert_eq!(all.notifications.len(), 1);
    }
}
