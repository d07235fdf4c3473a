/// WebSocket Session Actor
///
/// One actor per connection. Tracks the connection's lifecycle: it starts
/// unauthenticated, becomes addressable for push once a valid access token
/// arrives, and deregisters itself on stop. Outbound JSON reaches the
/// client through the mpsc channel bridged in handler.rs.
use actix::prelude::*;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::utils::{Claims, TypeClaims};
use crate::ENV;

use super::events::*;
use super::message::{ClientMessage, ServerMessage};
use super::server::WebSocketServer;

pub struct WebSocketSession {
    /// Unique session ID
    pub id: Uuid,

    /// User ID once authenticated (None until then)
    pub user_id: Option<Uuid>,

    /// Address of the WebSocket server actor
    pub server: Addr<WebSocketServer>,

    /// Channel carrying serialized JSON to the client (bridge in handler.rs)
    pub tx: mpsc::UnboundedSender<String>,
}

impl WebSocketSession {
    pub fn new(server: Addr<WebSocketServer>, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id: Uuid::now_v7(), user_id: None, server, tx }
    }

    fn send_to_client(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = self.tx.send(json) {
                    tracing::error!("Failed to send message to client (session {}): {}", self.id, e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize ServerMessage (session {}): {}", self.id, e);
            }
        }
    }

    fn handle_client_message(&mut self, msg: &ClientMessage) {
        match msg {
            ClientMessage::Auth { token } => {
                self.handle_auth(token);
            }

            ClientMessage::Ping => {
                self.send_to_client(&ServerMessage::Pong);
            }
        }
    }

    /// Verify the access token and bind this session to the user.
    fn handle_auth(&mut self, token: &str) {
        if self.user_id.is_some() {
            self.send_to_client(&ServerMessage::Error {
                message: "Session already authenticated".to_string(),
            });
            return;
        }

        let claims = match Claims::decode(token, ENV.jwt_secret.as_ref()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("JWT verification failed (session {}): {}", self.id, e);
                self.send_to_client(&ServerMessage::AuthFailed {
                    reason: "Token invalid or expired".to_string(),
                });
                return;
            }
        };

        if claims._type.as_ref() != Some(&TypeClaims::AccessToken) {
            self.send_to_client(&ServerMessage::AuthFailed {
                reason: "Only access tokens are accepted".to_string(),
            });
            return;
        }

        let user_id = claims.sub;

        self.user_id = Some(user_id);

        self.server.do_send(Authenticate { session_id: self.id, user_id });

        self.send_to_client(&ServerMessage::AuthSuccess { user_id });

        tracing::info!("User {} authenticated on session {}", user_id, self.id);
    }
}

impl Actor for WebSocketSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session started: {}", self.id);

        self.server.do_send(Connect { id: self.id, addr: ctx.address() });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("WebSocket session stopped: {}", self.id);

        self.server.do_send(Disconnect { id: self.id });
    }
}

/// Implement Message trait for ClientMessage so the bridge can forward it.
impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, _ctx: &mut Context<Self>) {
        self.handle_client_message(&msg);
    }
}

/// Push path: ServerMessage from the server actor goes out to the client.
impl Handler<ServerMessage> for WebSocketSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.send_to_client(&msg);
    }
}
