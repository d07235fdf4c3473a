use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        conversation::{
            model::{
                ConversationDetail, EnsureThreadRequest, MarkReadRequest, MessageQueryRequest,
            },
            repository_pg::ConversationPgRepository,
            service::ConversationService,
        },
        message::{model::GetMessageResponse, repository_pg::MessageRepositoryPg},
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedQuery,
};

type ConversationSvc =
    ConversationService<ConversationPgRepository, UserRepositoryPg, MessageRepositoryPg>;

#[get("/")]
pub async fn get_conversations(
    conversation_svc: web::Data<ConversationSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ConversationDetail>>, error::Error> {
    let principal = get_principal(&req)?;

    let conversations = conversation_svc.list_threads(principal.user_id).await?;

    Ok(success::Success::ok(Some(conversations)).message("Successfully retrieved conversations"))
}

#[post("/")]
pub async fn ensure_thread(
    conversation_svc: web::Data<ConversationSvc>,
    body: web::Json<EnsureThreadRequest>,
    req: HttpRequest,
) -> Result<success::Success<ConversationDetail>, error::Error> {
    let principal = get_principal(&req)?;

    let body = body.into_inner();

    let conversation = conversation_svc
        .ensure_thread(principal, body.other_user_id, body.property_id)
        .await?;

    Ok(success::Success::ok(Some(conversation)).message("Successfully ensured conversation"))
}

#[get("/{conversation_id}/messages")]
pub async fn get_messages(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    query: ValidatedQuery<MessageQueryRequest>,
    req: HttpRequest,
) -> Result<success::Success<GetMessageResponse>, error::Error> {
    let principal = get_principal(&req)?;

    let (messages, cursor) = conversation_svc
        .get_messages(*conversation_id, principal, query.0.limit, query.0.cursor)
        .await?;

    Ok(success::Success::ok(Some(GetMessageResponse { messages, cursor }))
        .message("Successfully retrieved messages"))
}

#[post("/{conversation_id}/read")]
pub async fn mark_read(
    conversation_svc: web::Data<ConversationSvc>,
    conversation_id: web::Path<Uuid>,
    body: web::Json<MarkReadRequest>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;

    conversation_svc
        .mark_read(*conversation_id, principal, body.into_inner().message_ids)
        .await?;

    Ok(success::Success::no_content())
}
