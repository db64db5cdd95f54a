use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sahyog_types::events::{GatewayCommand, GatewayEvent};
use sahyog_types::token::Claims;

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a fresh socket may stay unauthenticated.
const AUTH_TIMEOUT: Duration = Duration::from_secs(30);

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

/// An authenticated socket's slot in the dispatcher.
struct Session {
    user_id: i64,
    conn_id: Uuid,
    events: mpsc::UnboundedReceiver<GatewayEvent>,
}

/// Handle a single `/ws` connection: `auth` handshake, then relay pushes
/// until either side goes away.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for a valid auth frame. Unauthenticated sockets are not
    // registered and cannot be addressed.
    let session = match tokio::time::timeout(
        AUTH_TIMEOUT,
        wait_for_auth(&mut sender, &mut receiver, &dispatcher, &jwt_secret),
    )
    .await
    {
        Ok(Some(session)) => session,
        Ok(None) => return,
        Err(_) => {
            warn!("WebSocket client failed to authenticate in {:?}, closing", AUTH_TIMEOUT);
            return;
        }
    };

    // Step 2: Relay loop
    let (user_id, conn_id) = run_connection_loop(sender, receiver, &dispatcher, &jwt_secret, session).await;

    dispatcher.unregister(user_id, conn_id).await;
    info!("user {} disconnected from gateway", user_id);
}

/// Reads frames until one authenticates. Bad tokens and stray frames get an
/// `auth_error` and the client may try again. `None` when the socket closes.
async fn wait_for_auth(
    sender: &mut WsSender,
    receiver: &mut WsReceiver,
    dispatcher: &Dispatcher,
    jwt_secret: &str,
) -> Option<Session> {
    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => return None,
            _ => continue,
        };

        let Some(user_id) = authenticate(&text, jwt_secret) else {
            send_event(sender, &GatewayEvent::AuthError).await.ok()?;
            continue;
        };

        let (conn_id, events) = dispatcher.register(user_id).await;
        info!("user {} connected to gateway", user_id);

        let session = Session { user_id, conn_id, events };
        if send_event(sender, &GatewayEvent::AuthSuccess).await.is_err() {
            dispatcher.unregister(session.user_id, session.conn_id).await;
            return None;
        }
        return Some(session);
    }
    None
}

/// Parses an `auth` command and verifies its token.
fn authenticate(text: &str, jwt_secret: &str) -> Option<i64> {
    match serde_json::from_str::<GatewayCommand>(text) {
        Ok(GatewayCommand::Auth { token }) => match Claims::decode(&token, jwt_secret) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                debug!("socket auth rejected: {}", e);
                None
            }
        },
        Err(e) => {
            let preview: String = text.chars().take(200).collect();
            warn!("bad socket command: {} -- raw: {}", e, preview);
            None
        }
    }
}

/// Returns the identity that owned the socket last, for cleanup.
async fn run_connection_loop(
    mut sender: WsSender,
    mut receiver: WsReceiver,
    dispatcher: &Dispatcher,
    jwt_secret: &str,
    mut session: Session,
) -> (i64, Uuid) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    _ => break,
                };

                match msg {
                    Message::Text(text) => {
                        // A later auth frame re-binds the socket, possibly to another user.
                        match authenticate(&text, jwt_secret) {
                            Some(user_id) => {
                                if user_id != session.user_id {
                                    dispatcher.unregister(session.user_id, session.conn_id).await;
                                }
                                let (conn_id, events) = dispatcher.register(user_id).await;
                                session = Session { user_id, conn_id, events };
                                if send_event(&mut sender, &GatewayEvent::AuthSuccess).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                if send_event(&mut sender, &GatewayEvent::AuthError).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Message::Pong(_) => pong_received = true,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            event = session.events.recv() => {
                let Some(event) = event else {
                    info!("user {} connection superseded by a newer one", session.user_id);
                    break;
                };
                if send_event(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    (session.user_id, session.conn_id)
}

async fn send_event(sender: &mut WsSender, event: &GatewayEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(text) => sender.send(Message::Text(text.into())).await,
        Err(e) => {
            warn!("failed to encode gateway event: {}", e);
            Ok(())
        }
    }
}
