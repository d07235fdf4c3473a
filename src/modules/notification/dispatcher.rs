/// Dispatcher Actor
///
/// Decouples notification fan-out from the operation that triggered it.
/// Senders `do_send` a DispatchEvent and move on; the triggering write has
/// already committed, and a dispatch failure must never roll it back or
/// surface to the caller. The actor retries with backoff and, for transient
/// store trouble, requeues the event a bounded number of rounds before
/// giving up with an error log. Missed pushes are still recovered by the
/// client's next poll.
use actix::prelude::*;
use std::time::Duration;

use crate::modules::notification::events::DomainEvent;
use crate::modules::notification::repository::NotificationRepository;
use crate::modules::notification::service::NotificationService;
use crate::modules::property::repository::PropertyRepository;
use crate::modules::user::repository::UserRepository;
use crate::utils::retry;

const MAX_REQUEUE_ROUNDS: u32 = 3;
const REQUEUE_DELAY: Duration = Duration::from_secs(30);

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct DispatchEvent {
    pub event: DomainEvent,
    pub round: u32,
}

impl DispatchEvent {
    pub fn new(event: DomainEvent) -> Self {
        Self { event, round: 0 }
    }
}

pub struct Dispatcher<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    service: NotificationService<N, P, U>,
}

impl<N, P, U> Dispatcher<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(service: NotificationService<N, P, U>) -> Self {
        Self { service }
    }
}

impl<N, P, U> Actor for Dispatcher<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Notification dispatcher started");
    }
}

impl<N, P, U> Handler<DispatchEvent> for Dispatcher<N, P, U>
where
    N: NotificationRepository + Send + Sync + 'static,
    P: PropertyRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    type Result = ();

    fn handle(&mut self, msg: DispatchEvent, ctx: &mut Context<Self>) {
        let service = self.service.clone();
        let event = msg.event.clone();
        let round = msg.round;

        let fut = async move {
            retry::with_backoff(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_BASE_DELAY, || {
                service.dispatch(&event)
            })
            .await
        };

        ctx.spawn(fut.into_actor(self).map(move |result, _act, ctx| match result {
            Ok(created) => {
                if !created.is_empty() {
                    tracing::info!("Dispatched {} notification(s)", created.len());
                }
            }
            Err(err) if err.is_transient() && round < MAX_REQUEUE_ROUNDS => {
                tracing::warn!(
                    "Dispatch failed transiently (round {}), requeueing: {}",
                    round,
                    err
                );
                ctx.notify_later(
                    DispatchEvent { event: msg.event, round: round + 1 },
                    REQUEUE_DELAY,
                );
            }
            Err(err) => {
                tracing::error!("Dispatch failed permanently: {}", err);
            }
        }));
    }
}
