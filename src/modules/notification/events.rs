/// Domain events that fan out into notifications.
///
/// Every producer-facing event carries the producer's event id; retried
/// deliveries of the same event reuse it, and the store's
/// (user_id, event_key) uniqueness swallows the duplicate. `NewMessage`
/// uses the message id itself, which is already unique per send.
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum DomainEvent {
    PropertyUnlocked {
        event_id: String,
        property_id: Uuid,
        buyer_id: Uuid,
    },
    InspectionBooked {
        event_id: String,
        property_id: Uuid,
        scheduled_for: chrono::DateTime<chrono::Utc>,
    },
    InspectionScheduled {
        event_id: String,
        property_id: Uuid,
        scheduled_for: chrono::DateTime<chrono::Utc>,
    },
    NewMatch {
        event_id: String,
        property_id: Uuid,
        buyer_id: Uuid,
    },
    StatusUpdate {
        event_id: String,
        buyer_id: Uuid,
        property_id: Option<Uuid>,
        status: String,
    },
    NewProperty {
        event_id: String,
        property_id: Uuid,
        buyer_id: Uuid,
    },
    PriceDrop {
        event_id: String,
        property_id: Uuid,
        buyer_id: Uuid,
        old_price: i64,
        new_price: i64,
    },
    NewAssignment {
        event_id: String,
        agent_id: Uuid,
        property_id: Option<Uuid>,
    },
    NewMessage {
        message_id: Uuid,
        conversation_id: Uuid,
        sender_id: Uuid,
        recipient_ids: Vec<Uuid>,
        preview: String,
    },
}

impl DomainEvent {
    /// Idempotency key shared by every retry of the same source event.
    pub fn event_key(&self) -> String {
        match self {
            DomainEvent::PropertyUnlocked { event_id, .. }
            | DomainEvent::InspectionBooked { event_id, .. }
            | DomainEvent::InspectionScheduled { event_id, .. }
            | DomainEvent::NewMatch { event_id, .. }
            | DomainEvent::StatusUpdate { event_id, .. }
            | DomainEvent::NewProperty { event_id, .. }
            | DomainEvent::PriceDrop { event_id, .. }
            | DomainEvent::NewAssignment { event_id, .. } => event_id.clone(),
            DomainEvent::NewMessage { message_id, .. } => format!("message:{message_id}"),
        }
    }
}
