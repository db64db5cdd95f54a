use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use sahyog_types::events::GatewayEvent;

/// Outcome of a push. Neither case is an error for the caller: the message
/// is already persisted, the socket is only a notification path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped,
}

/// Registry of authenticated sockets, at most one per user.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<i64, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`, replacing any earlier one. The
    /// replaced connection sees its receiver close and shuts down.
    pub async fn register(&self, user_id: i64) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Remove the registration, but only if `conn_id` still owns it.
    pub async fn unregister(&self, user_id: i64, conn_id: Uuid) -> bool {
        let mut channels = self.inner.user_channels.write().await;
        match channels.get(&user_id) {
            Some((current, _)) if *current == conn_id => {
                channels.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    /// Deliver-or-drop: hand the event to the user's live connection if there
    /// is one and it is still open.
    pub async fn deliver(&self, user_id: i64, event: GatewayEvent) -> Delivery {
        let channels = self.inner.user_channels.read().await;
        let Some((_, tx)) = channels.get(&user_id) else {
            return Delivery::Dropped;
        };
        match tx.send(event) {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Dropped,
        }
    }

    pub async fn is_connected(&self, user_id: i64) -> bool {
        self.inner
            .user_channels
            .read()
            .await
            .get(&user_id)
            .is_some_and(|(_, tx)| !tx.is_closed())
    }

    pub async fn connected_count(&self) -> usize {
        self.inner.user_channels.read().await.len()
    }
}
