//! Notification fan-out
//!
//! The [`NotificationHub`] keeps one bounded queue per open connection and
//! pushes JSON messages into them. Delivery is best effort: a full queue drops
//! the message for that connection only, and connections whose receiver is
//! gone are pruned after the broadcast pass.
//!
//! Every message is a JSON object tagged by `type`:
//!
//! ```text
//! {"type":"info","message":"Connected to bank ledger notifications"}
//! {"type":"echo","message":"<what the client sent>"}
//! {"type":"notification","event":"transfer","reference":"TRF-...",...}
//! ```

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionId = u64;

const WELCOME: &str = "Connected to bank ledger notifications";

/// Ledger event pushed to every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Operation that produced the event (transfer, bill_payment, ...)
    pub event: String,
    pub reference: String,
    pub user_id: u32,
    pub amount: Decimal,
    pub currency: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        event: &str,
        reference: &str,
        user_id: u32,
        amount: Decimal,
        currency: &str,
    ) -> Self {
        Notification {
            event: event.to_string(),
            reference: reference.to_string(),
            user_id,
            amount,
            currency: currency.to_string(),
            message: format!("{} of {} {} completed", event, amount, currency),
            timestamp: Utc::now(),
        }
    }
}

/// Wire shape of everything the hub sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    Info { message: String },
    Echo { message: String },
    Notification(Notification),
}

/// Receiving end handed to a new connection
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub receiver: mpsc::Receiver<String>,
}

#[derive(Debug)]
pub struct NotificationHub {
    connections: DashMap<ConnectionId, mpsc::Sender<String>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl NotificationHub {
    /// Hub whose per-connection queues hold `buffer` messages
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Open a connection; a welcome `info` message is already queued on it
    pub fn connect(&self) -> Connection {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(self.buffer);

        if let Some(text) = encode(&HubMessage::Info {
            message: WELCOME.to_string(),
        }) {
            // Fresh queue, cannot be full
            let _ = sender.try_send(text);
        }

        self.connections.insert(id, sender);
        tracing::debug!(connection = id, "notification connection opened");
        Connection { id, receiver }
    }

    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            tracing::debug!(connection = id, "notification connection closed");
        }
        removed
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Handle a text frame from a client by echoing it back
    pub fn receive(&self, id: ConnectionId, text: &str) -> bool {
        let Some(sender) = self.connections.get(&id).map(|entry| entry.value().clone()) else {
            return false;
        };
        let Some(encoded) = encode(&HubMessage::Echo {
            message: text.to_string(),
        }) else {
            return false;
        };
        match sender.try_send(encoded) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => {
                self.disconnect(id);
                false
            }
        }
    }

    /// Push a notification to every open connection
    ///
    /// Never blocks. Returns the number of connections the message was queued
    /// on.
    pub fn broadcast(&self, notification: &Notification) -> usize {
        let Some(text) = encode(&HubMessage::Notification(notification.clone())) else {
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.connections.iter() {
            match entry.value().try_send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection = *entry.key(),
                        "notification queue full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Iteration holds shard read locks; prune afterwards
        for id in closed {
            self.disconnect(id);
        }

        tracing::debug!(
            event = %notification.event,
            reference = %notification.reference,
            delivered,
            "notification broadcast"
        );
        delivered
    }
}

fn encode(message: &HubMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(error) => {
            tracing::error!(%error, "failed to serialize notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> HubMessage {
        serde_json::from_str(text).unwrap()
    }

    fn sample() -> Notification {
        Notification::new("transfer", "TRF-1", 1, Decimal::new(4000, 2), "USD")
    }

    #[tokio::test]
    async fn test_connect_queues_welcome() {
        let hub = NotificationHub::new(4);
        let mut conn = hub.connect();

        let text = conn.receiver.recv().await.unwrap();
        assert!(text.starts_with(r#"{"type":"info""#));
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let hub = NotificationHub::new(4);
        let mut a = hub.connect();
        let mut b = hub.connect();
        a.receiver.recv().await.unwrap();
        b.receiver.recv().await.unwrap();

        assert_eq!(hub.broadcast(&sample()), 2);

        for conn in [&mut a, &mut b] {
            match decode(&conn.receiver.recv().await.unwrap()) {
                HubMessage::Notification(n) => assert_eq!(n.reference, "TRF-1"),
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_closed_connection_is_pruned() {
        let hub = NotificationHub::new(4);
        let gone = hub.connect();
        let mut alive = hub.connect();
        drop(gone);

        assert_eq!(hub.broadcast(&sample()), 1);
        assert_eq!(hub.connection_count(), 1);

        alive.receiver.recv().await.unwrap();
        assert!(alive.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_queue_skips_without_blocking() {
        let hub = NotificationHub::new(1);
        let _slow = hub.connect(); // queue already holds the welcome message
        let mut fast = hub.connect();
        fast.receiver.recv().await.unwrap();

        assert_eq!(hub.broadcast(&sample()), 1);
        assert_eq!(hub.connection_count(), 2);
    }

    #[tokio::test]
    async fn test_receive_echoes_text() {
        let hub = NotificationHub::new(4);
        let mut conn = hub.connect();
        conn.receiver.recv().await.unwrap();

        assert!(hub.receive(conn.id, "ping"));
        assert_eq!(
            decode(&conn.receiver.recv().await.unwrap()),
            HubMessage::Echo {
                message: "ping".to_string()
            }
        );
        assert!(!hub.receive(999, "ping"));
    }
}
