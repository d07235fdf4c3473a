use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::connect_database,
    middlewares::{authentication, authorization},
    modules::{
        conversation::{
            read_state::ReadStateService, repository_pg::ConversationPgRepository,
            service::ConversationService,
        },
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        notification::{
            dispatcher::Dispatcher, repository_pg::NotificationRepositoryPg,
            service::NotificationService,
        },
        property::repository_pg::PropertyRepositoryPg,
        user::{repository_pg::UserRepositoryPg, schema::UserRole},
        websocket::{handler::websocket_handler, server::WebSocketServer},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .map_err(|_| std::io::Error::other("Database migration error"))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let property_repo = Arc::new(PropertyRepositoryPg::new(db_pool.clone()));
    let conversation_repo = Arc::new(ConversationPgRepository::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));
    let notification_repo = Arc::new(NotificationRepositoryPg::new(db_pool.clone()));

    let ws_server = Arc::new(WebSocketServer::new().start());

    let notification_service = NotificationService::with_dependencies(
        notification_repo.clone(),
        property_repo,
        user_repo.clone(),
        Some(ws_server.clone()),
    );

    // Fan-out runs behind this actor's mailbox so a slow or failing
    // dispatch never holds up the operation that triggered it.
    let dispatcher = Dispatcher::new(notification_service.clone()).start().recipient();

    let conversation_service = ConversationService::with_dependencies(
        conversation_repo.clone(),
        user_repo.clone(),
        message_repo.clone(),
        Some(ws_server.clone()),
    );

    let message_service = MessageService::with_dependencies(
        conversation_service.clone(),
        conversation_repo,
        message_repo.clone(),
        Some(dispatcher.clone()),
        Some(ws_server.clone()),
    );

    let read_state_service =
        ReadStateService::with_dependencies(message_repo, notification_repo);

    println!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(read_state_service.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(ws_server.as_ref().clone()))
            .service(health_check)
            .route("/ws", web::get().to(websocket_handler))
            .service(
                web::scope("/api")
                    .wrap(from_fn(authorization(vec![
                        UserRole::Buyer,
                        UserRole::Seller,
                        UserRole::Agent,
                    ])))
                    .wrap(from_fn(authentication))
                    .configure(modules::conversation::route::configure)
                    .configure(modules::message::route::configure)
                    .configure(modules::notification::route::configure)
                    .configure(modules::notification::route::events_configure)
                    .configure(modules::websocket::sync::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
