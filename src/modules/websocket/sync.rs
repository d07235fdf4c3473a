/// Poll fallback and reconciliation.
///
/// Clients without a live push channel call this on a fixed interval with
/// their last successful pull time; reconnecting clients call it once with
/// no `since` to get the full current state before trusting push again.
/// The server keeps no per-client cursor.
use actix_web::{get, web, HttpRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{error, success},
    middlewares::get_principal,
    modules::{
        conversation::read_state::ReadStateService,
        message::{repository_pg::MessageRepositoryPg, schema::UnreadSummary},
        notification::{
            repository_pg::NotificationRepositoryPg, schema::NotificationEntity,
            service::NotificationService,
        },
        property::repository_pg::PropertyRepositoryPg,
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedQuery,
    ENV,
};

type ReadStateSvc = ReadStateService<MessageRepositoryPg, NotificationRepositoryPg>;
type NotificationSvc =
    NotificationService<NotificationRepositoryPg, PropertyRepositoryPg, UserRepositoryPg>;

const SYNC_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncQuery {
    /// Last successful pull; omitted on reconciliation.
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub unread: UnreadSummary,
    pub notifications: Vec<NotificationEntity>,
    pub server_time: chrono::DateTime<chrono::Utc>,
    /// Suggested interval for the next pull while push is down.
    pub poll_interval_secs: u64,
}

#[get("/sync")]
pub async fn sync(
    read_state: web::Data<ReadStateSvc>,
    notification_svc: web::Data<NotificationSvc>,
    query: ValidatedQuery<SyncQuery>,
    req: HttpRequest,
) -> Result<success::Success<SyncResponse>, error::Error> {
    let principal = get_principal(&req)?;

    let unread = read_state.unread_total(&principal.user_id).await?;
    let notifications = notification_svc
        .list_since(&principal.user_id, query.0.since, SYNC_PAGE_LIMIT)
        .await?;

    Ok(success::Success::ok(Some(SyncResponse {
        unread,
        notifications,
        server_time: chrono::Utc::now(),
        poll_interval_secs: ENV.poll_interval_secs,
    }))
    .message("Successfully synchronized"))
}

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(sync);
}
