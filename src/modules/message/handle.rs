use actix_web::{delete, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        conversation::repository_pg::ConversationPgRepository,
        message::{
            model::{EditMessageRequest, SendMessageRequest},
            repository_pg::MessageRepositoryPg,
            schema::MessageEntity,
            service::MessageService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedJson,
};

type MessageSvc =
    MessageService<ConversationPgRepository, UserRepositoryPg, MessageRepositoryPg>;

#[post("/")]
pub async fn send_message(
    message_service: web::Data<MessageSvc>,
    body: web::Json<SendMessageRequest>,
    req: HttpRequest,
) -> Result<success::Success<MessageEntity>, error::Error> {
    let principal = get_principal(&req)?;

    let message = message_service.send_message(principal, body.into_inner()).await?;

    Ok(success::Success::created(Some(message)).message("Send message successfully"))
}

#[patch("/{message_id}")]
pub async fn edit_message(
    message_service: web::Data<MessageSvc>,
    message_id: web::Path<Uuid>,
    body: ValidatedJson<EditMessageRequest>,
    req: HttpRequest,
) -> Result<success::Success<MessageEntity>, error::Error> {
    let principal = get_principal(&req)?;

    let message =
        message_service.edit_message(principal, *message_id, body.0.content).await?;

    Ok(success::Success::ok(Some(message)).message("Edit message successfully"))
}

#[delete("/{message_id}")]
pub async fn delete_message(
    message_service: web::Data<MessageSvc>,
    message_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let principal = get_principal(&req)?;

    message_service.delete_message(principal, *message_id).await?;

    Ok(success::Success::no_content())
}
