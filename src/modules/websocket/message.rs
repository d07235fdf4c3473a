/// WebSocket push protocol.
///
/// The channel is push-only for domain data: clients authenticate and keep
/// the connection alive; conversations and notifications are written over
/// the HTTP API. Delivery is at-least-once, so every pushed record carries
/// its id and clients deduplicate on it.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Authenticate the connection with a JWT access token.
    #[serde(rename_all = "camelCase")]
    Auth { token: String },

    /// Keep-alive.
    Ping,
}

/// Messages pushed from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AuthSuccess { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    AuthFailed { reason: String },

    /// New message in one of the user's threads.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        conversation_id: Uuid,
        message: serde_json::Value, // Full message object
    },

    #[serde(rename_all = "camelCase")]
    MessageEdited { conversation_id: Uuid, message_id: Uuid, new_content: String },

    #[serde(rename_all = "camelCase")]
    MessageDeleted { conversation_id: Uuid, message_id: Uuid },

    /// Read receipt: `user_id` has read the thread up to now.
    #[serde(rename_all = "camelCase")]
    MessagesRead { conversation_id: Uuid, user_id: Uuid },

    /// Newly created notification record for this user.
    #[serde(rename_all = "camelCase")]
    NewNotification {
        notification: serde_json::Value, // Full notification object
    },

    /// Pong response for Ping.
    Pong,

    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // === ClientMessage deserialization ===

    #[test]
    fn test_client_auth_deserialize() {
        let json = r#"{"type":"auth","token":"my-jwt-token"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Auth { token } if token == "my-jwt-token"));
    }

    #[test]
    fn test_client_ping_deserialize() {
        let json = r#"{"type":"ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_invalid_type_returns_error() {
        let json = r#"{"type":"unknownType"}"#;
        let result = serde_json::from_str::<ClientMessage>(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_field_returns_error() {
        // auth without token
        let json = r#"{"type":"auth"}"#;
        let result = serde_json::from_str::<ClientMessage>(json);
        assert!(result.is_err());
    }

    // === ServerMessage serialization ===

    #[test]
    fn test_server_auth_success_serialize() {
        let uid = Uuid::now_v7();
        let msg = ServerMessage::AuthSuccess { user_id: uid };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"authSuccess\""));
        assert!(json.contains(&uid.to_string()));
    }

    #[test]
    fn test_server_new_message_serialize() {
        let conv_id = Uuid::now_v7();
        let msg = ServerMessage::NewMessage {
            conversation_id: conv_id,
            message: serde_json::json!({"content": "Hello"}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"newMessage\""));
        assert!(json.contains("\"content\":\"Hello\""));
    }

    #[test]
    fn test_server_new_notification_serialize() {
        let msg = ServerMessage::NewNotification {
            notification: serde_json::json!({"title": "Property unlocked"}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"newNotification\""));
        assert!(json.contains("Property unlocked"));
    }

    #[test]
    fn test_server_messages_read_serialize() {
        let conv_id = Uuid::now_v7();
        let uid = Uuid::now_v7();
        let msg = ServerMessage::MessagesRead { conversation_id: conv_id, user_id: uid };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"messagesRead\""));
        assert!(json.contains("\"conversationId\""));
    }

    #[test]
    fn test_server_pong_serialize() {
        let msg = ServerMessage::Pong;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    // === Roundtrip ===

    #[test]
    fn test_server_message_roundtrip() {
        let uid = Uuid::now_v7();
        let original = ServerMessage::AuthSuccess { user_id: uid };
        let json = serde_json::to_string(&original).unwrap();
        let deserialized: ServerMessage = serde_json::from_str(&json).unwrap();

        match deserialized {
            ServerMessage::AuthSuccess { user_id } => assert_eq!(user_id, uid),
            _ => panic!("Roundtrip failed"),
        }
    }
}
