//! Realtime presence channel
//!
//! One process-local counter of connected WebSocket sessions. Every
//! connect/disconnect recomputes the count and fans the new value out
//! to all connected clients, including the one that just joined or
//! left. Nothing is persisted; the count resets with the process.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::AppState;

/// Tracks the live session count and pushes updates to all sessions.
pub struct PresenceBroadcaster {
    /// Mutations and the matching broadcast happen under this lock so
    /// concurrent connect/disconnect bursts cannot lose updates.
    connected: Mutex<usize>,
    tx: broadcast::Sender<usize>,
}

impl PresenceBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            connected: Mutex::new(0),
            tx,
        }
    }

    /// Subscribe before calling `connect` so the joining session also
    /// receives its own count update.
    pub fn subscribe(&self) -> broadcast::Receiver<usize> {
        self.tx.subscribe()
    }

    pub fn connect(&self) -> usize {
        let mut connected = self.connected.lock();
        *connected += 1;
        let _ = self.tx.send(*connected);
        *connected
    }

    pub fn disconnect(&self) -> usize {
        let mut connected = self.connected.lock();
        *connected = connected.saturating_sub(1);
        let _ = self.tx.send(*connected);
        *connected
    }

    pub fn count(&self) -> usize {
        *self.connected.lock()
    }
}

impl Default for PresenceBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /ws
pub async fn ws_presence(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let presence = state.presence.clone();

    // Subscribe first: the connect broadcast below must reach this
    // session too.
    let mut rx = presence.subscribe();
    let count = presence.connect();
    info!("[Presence] Client connected ({count} active)");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(count) => {
                    let payload = serde_json::json!({
                        "event": "active_connections",
                        "count": count,
                    });
                    if sender
                        .send(Message::Text(payload.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                // The presence channel carries no inbound events
                Some(Ok(_)) => continue,
                _ => break,
            },
        }
    }

    let count = presence.disconnect();
    info!("[Presence] Client disconnected ({count} active)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn three_connects_one_disconnect_leaves_two() {
        let presence = PresenceBroadcaster::new();

        let mut receivers = Vec::new();
        for _ in 0..3 {
            receivers.push(presence.subscribe());
            presence.connect();
        }
        presence.disconnect();

        assert_eq!(presence.count(), 2);

        // Every connected client's last received count must be 2
        for rx in &mut receivers {
            let mut last = None;
            while let Ok(count) = rx.try_recv() {
                last = Some(count);
            }
            assert_eq!(last, Some(2));
        }
    }

    #[tokio::test]
    async fn joining_session_sees_its_own_count() {
        let presence = PresenceBroadcaster::new();

        let mut rx = presence.subscribe();
        presence.connect();

        assert_eq!(rx.try_recv().ok(), Some(1));
    }

    #[tokio::test]
    async fn count_never_goes_negative() {
        let presence = PresenceBroadcaster::new();
        presence.disconnect();
        assert_eq!(presence.count(), 0);
    }
}
