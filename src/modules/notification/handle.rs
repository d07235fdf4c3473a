use actix::Recipient;
use actix_web::{delete, get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        notification::{
            dispatcher::DispatchEvent,
            events::DomainEvent,
            model::{
                BuyerPropertyPayload, InspectionPayload, NewAssignmentPayload,
                NotificationListResponse, NotificationQueryRequest, PriceDropPayload,
                PropertyUnlockedPayload, StatusUpdatePayload,
            },
            repository_pg::NotificationRepositoryPg,
            service::NotificationService,
        },
        property::repository_pg::PropertyRepositoryPg,
        user::repository_pg::UserRepositoryPg,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

type NotificationSvc =
    NotificationService<NotificationRepositoryPg, PropertyRepositoryPg, UserRepositoryPg>;

// --- Notification inbox ---

#[get("/")]
pub async fn list_notifications(
    notification_svc: web::Data<NotificationSvc>,
    query: ValidatedQuery<NotificationQueryRequest>,
    req: HttpRequest,
) -> Result<success::Success<NotificationListResponse>, error::Error> {
    let principal = get_principal(&req)?;

    let response = notification_svc
        .list(&principal.user_id, query.0.unread_only, query.0.limit, query.0.before)
        .await?;

    Ok(success::Success::ok(Some(response)).message("Successfully retrieved notifications"))
}

#[patch("/{notification_id}/read")]
pub async fn mark_notification_read(
    notification_svc: web::Data<NotificationSvc>,
    notification_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;

    notification_svc.mark_read(&notification_id, &principal.user_id).await?;

    Ok(success::Success::no_content())
}

#[post("/read-all")]
pub async fn mark_all_notifications_read(
    notification_svc: web::Data<NotificationSvc>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;

    notification_svc.mark_all_read(&principal.user_id).await?;

    Ok(success::Success::no_content())
}

#[delete("/{notification_id}")]
pub async fn delete_notification(
    notification_svc: web::Data<NotificationSvc>,
    notification_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;

    notification_svc.delete(&notification_id, &principal.user_id).await?;

    Ok(success::Success::no_content())
}

// --- Producer event hooks ---
//
// Each hook hands the typed payload to the dispatcher actor and returns 202
// immediately; fan-out, retry and push all happen off the request path.

fn enqueue(
    dispatcher: &web::Data<Recipient<DispatchEvent>>,
    event: DomainEvent,
) -> success::Success<()> {
    dispatcher.do_send(DispatchEvent::new(event));
    success::Success::accepted(None).message("Event accepted")
}

#[post("/property-unlocked")]
pub async fn on_property_unlocked(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<PropertyUnlockedPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::PropertyUnlocked {
            event_id: payload.event_id,
            property_id: payload.property_id,
            buyer_id: payload.buyer_id,
        },
    ))
}

#[post("/inspection-booked")]
pub async fn on_inspection_booked(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<InspectionPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::InspectionBooked {
            event_id: payload.event_id,
            property_id: payload.property_id,
            scheduled_for: payload.scheduled_for,
        },
    ))
}

#[post("/inspection-scheduled")]
pub async fn on_inspection_scheduled(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<InspectionPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::InspectionScheduled {
            event_id: payload.event_id,
            property_id: payload.property_id,
            scheduled_for: payload.scheduled_for,
        },
    ))
}

#[post("/new-match")]
pub async fn on_new_match(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<BuyerPropertyPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::NewMatch {
            event_id: payload.event_id,
            property_id: payload.property_id,
            buyer_id: payload.buyer_id,
        },
    ))
}

#[post("/status-update")]
pub async fn on_status_update(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<StatusUpdatePayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::StatusUpdate {
            event_id: payload.event_id,
            buyer_id: payload.buyer_id,
            property_id: payload.property_id,
            status: payload.status,
        },
    ))
}

#[post("/new-property")]
pub async fn on_new_property(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<BuyerPropertyPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::NewProperty {
            event_id: payload.event_id,
            property_id: payload.property_id,
            buyer_id: payload.buyer_id,
        },
    ))
}

#[post("/price-drop")]
pub async fn on_price_drop(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<PriceDropPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::PriceDrop {
            event_id: payload.event_id,
            property_id: payload.property_id,
            buyer_id: payload.buyer_id,
            old_price: payload.old_price,
            new_price: payload.new_price,
        },
    ))
}

#[post("/new-assignment")]
pub async fn on_new_assignment(
    dispatcher: web::Data<Recipient<DispatchEvent>>,
    body: ValidatedJson<NewAssignmentPayload>,
) -> Result<success::Success<()>, error::Error> {
    let payload = body.0;
    Ok(enqueue(
        &dispatcher,
        DomainEvent::NewAssignment {
            event_id: payload.event_id,
            agent_id: payload.agent_id,
            property_id: payload.property_id,
        },
    ))
}
