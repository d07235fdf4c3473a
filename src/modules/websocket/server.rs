/// WebSocket Server Actor
///
/// Owns every active session and the user -> sessions index. Push targets a
/// user id; delivery fans out to all of that user's sessions (multi-device).
/// Users who are not connected simply miss the push and recover through the
/// poll fallback, so there is no queueing here.
use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::events::*;
use super::message::ServerMessage;
use super::session::WebSocketSession;

pub struct WebSocketServer {
    /// Map: session_id -> session actor address
    sessions: HashMap<Uuid, Addr<WebSocketSession>>,

    /// Map: user_id -> set of session_ids (a user may have several devices)
    users: HashMap<Uuid, HashSet<Uuid>>,
}

impl WebSocketServer {
    pub fn new() -> Self {
        Self { sessions: HashMap::new(), users: HashMap::new() }
    }

    fn send_to_session(&self, session_id: &Uuid, message: ServerMessage) {
        if let Some(session_addr) = self.sessions.get(session_id) {
            session_addr.do_send(message);
        }
    }

    fn send_to_user(&self, user_id: &Uuid, message: ServerMessage) -> usize {
        match self.users.get(user_id) {
            Some(session_ids) => {
                for session_id in session_ids {
                    self.send_to_session(session_id, message.clone());
                }
                session_ids.len()
            }
            None => 0,
        }
    }
}

impl Actor for WebSocketServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("WebSocket server stopped");
    }
}

impl Handler<Connect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        tracing::debug!("New WebSocket session connected: {}", msg.id);

        self.sessions.insert(msg.id, msg.addr);
    }
}

impl Handler<Disconnect> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        tracing::debug!("WebSocket session disconnected: {}", msg.id);

        self.sessions.remove(&msg.id);

        // Drop the session from its user's set; forget the user once no
        // session remains.
        let mut user_to_remove: Option<Uuid> = None;
        for (&user_id, sessions) in self.users.iter_mut() {
            if sessions.remove(&msg.id) {
                if sessions.is_empty() {
                    user_to_remove = Some(user_id);
                }
                break;
            }
        }

        if let Some(user_id) = user_to_remove {
            self.users.remove(&user_id);
            tracing::info!("User {} fully disconnected (no more sessions)", user_id);
        }
    }
}

impl Handler<Authenticate> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: Authenticate, _: &mut Context<Self>) {
        let sessions = self.users.entry(msg.user_id).or_default();
        sessions.insert(msg.session_id);

        tracing::info!("User {} now has {} active session(s)", msg.user_id, sessions.len());
    }
}

impl Handler<SendToUser> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUser, _: &mut Context<Self>) {
        let sent = self.send_to_user(&msg.user_id, msg.message);
        if sent > 0 {
            tracing::debug!("Sent message to user {} ({} sessions)", msg.user_id, sent);
        } else {
            tracing::debug!("User {} not online, push skipped", msg.user_id);
        }
    }
}

impl Handler<SendToUsers> for WebSocketServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUsers, _: &mut Context<Self>) {
        let mut sent_count = 0;

        for user_id in &msg.user_ids {
            sent_count += self.send_to_user(user_id, msg.message.clone());
        }

        tracing::debug!(
            "Sent message to {} users ({} total sessions)",
            msg.user_ids.len(),
            sent_count
        );
    }
}

/// Implement Message trait for ServerMessage so it can be sent to sessions.
impl Message for ServerMessage {
    type Result = ();
}

impl Default for WebSocketServer {
    fn default() -> Self {
        Self::new()
    }
}
