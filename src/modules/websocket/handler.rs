/// WebSocket HTTP Handler
///
/// Upgrades the HTTP request and runs the bidirectional bridge:
/// - Inbound:  Client -> WebSocket -> parse ClientMessage -> Session Actor
/// - Outbound: Server Actor -> Session Actor -> mpsc channel -> WebSocket -> Client
use actix::Addr;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use tokio::sync::mpsc;

use super::message::ClientMessage;
use super::server::WebSocketServer;
use super::session::WebSocketSession;

/// Endpoint: GET /ws
///
/// The connection starts unauthenticated; the client's first frame should
/// be an `auth` message carrying its access token. After a network loss the
/// client reconnects here and is expected to run one reconciliation pull
/// (`GET /api/sync`) before trusting push again.
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<WebSocketServer>>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket upgrade request from {:?}", req.peer_addr());

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    // mpsc channel: session actor sends JSON -> spawned task -> WebSocket -> client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let ws_actor = WebSocketSession::new(server.get_ref().clone(), tx);

    use actix::Actor;
    let addr = ws_actor.start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                // === INBOUND: Client -> Server ===
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let text_str = text.to_string();

                            match serde_json::from_str::<ClientMessage>(&text_str) {
                                Ok(client_msg) => {
                                    addr.do_send(client_msg);
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client message: {} - raw: {}",
                                        e,
                                        &text_str[..100.min(text_str.len())]
                                    );
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            // Transport-level ping is answered here directly
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {
                            // Heartbeat response - nothing to do
                        }

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary messages are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        // Stream ended (client disconnect)
                        None => break,
                    }
                }

                // === OUTBOUND: Server -> Client ===
                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to push message to WebSocket client");
                        break;
                    }
                }
            }
        }

        // Cleanup: close the WebSocket session
        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop finished");
    });

    tracing::info!("WebSocket connection established");
    Ok(response)
}
