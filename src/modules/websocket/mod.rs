/// Delivery Channel
///
/// Near-real-time push of new messages and notifications to connected
/// clients, with an HTTP poll fallback for everyone else:
///
/// - Push protocol (ClientMessage & ServerMessage)
/// - WebSocket Server actor (session registry, per-user fan-out)
/// - WebSocket Session actor (auth + lifecycle per connection)
/// - HTTP handler (upgrade + bidirectional bridge)
/// - Sync endpoint (periodic pull and post-reconnect reconciliation)
pub mod events;
pub mod handler;
pub mod message;
pub mod server;
pub mod session;
pub mod sync;
