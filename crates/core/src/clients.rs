//! Registry of connected UI clients.
//!
//! Each open UI (one per window or tab) holds a [`ClientHandle`]; dropping
//! the handle unregisters it. Activation claims every registered client and
//! posts a single `SW_ACTIVATED` message to each.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Notification posted to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "SW_ACTIVATED")]
    Activated { version: String },
}

struct Slot {
    tx: mpsc::UnboundedSender<ClientMessage>,
    controlled: bool,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    slots: HashMap<u64, Slot>,
}

/// Shared client registry. Clones refer to the same set of clients.
#[derive(Clone, Default)]
pub struct Clients {
    inner: Arc<Mutex<Registry>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new client and return its handle.
    pub fn register(&self) -> ClientHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.slots.insert(id, Slot { tx, controlled: false });
        tracing::debug!(client = id, "client registered");
        ClientHandle { id, rx, clients: self.clone() }
    }

    fn unregister(&self, id: u64) {
        if self.registry().slots.remove(&id).is_some() {
            tracing::debug!(client = id, "client unregistered");
        }
    }

    /// Number of currently registered clients.
    pub fn len(&self) -> usize {
        self.registry().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take control of every registered client. Returns how many were claimed.
    pub fn claim(&self) -> usize {
        let mut registry = self.registry();
        for slot in registry.slots.values_mut() {
            slot.controlled = true;
        }
        registry.slots.len()
    }

    pub fn is_controlled(&self, id: u64) -> bool {
        self.registry().slots.get(&id).is_some_and(|slot| slot.controlled)
    }

    /// Send `message` once to every registered client.
    ///
    /// Clients whose receiving side is gone are dropped from the registry.
    /// Returns the number of clients the message was delivered to.
    pub fn broadcast(&self, message: &ClientMessage) -> usize {
        let mut registry = self.registry();
        let mut delivered = 0;
        registry.slots.retain(|_, slot| {
            let ok = slot.tx.send(message.clone()).is_ok();
            delivered += usize::from(ok);
            ok
        });
        delivered
    }
}

/// A registered client's end of the registry.
pub struct ClientHandle {
    id: u64,
    rx: mpsc::UnboundedReceiver<ClientMessage>,
    clients: Clients,
}

impl ClientHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next message addressed to this client.
    pub async fn recv(&mut self) -> Option<ClientMessage> {
        self.rx.recv().await
    }

    /// Next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<ClientMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.clients.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg = ClientMessage::Activated { version: "v3".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "SW_ACTIVATED", "version": "v3" }));
    }

    #[test]
    fn test_register_and_drop() {
        let clients = Clients::new();
        let a = clients.register();
        let b = clients.register();
        assert_ne!(a.id(), b.id());
        assert_eq!(clients.len(), 2);

        drop(a);
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_broadcast_once_per_client() {
        let clients = Clients::new();
        let mut a = clients.register();
        let mut b = clients.register();
        let msg = ClientMessage::Activated { version: "v1".into() };

        assert_eq!(clients.broadcast(&msg), 2);

        assert_eq!(a.try_recv(), Some(msg.clone()));
        assert_eq!(a.try_recv(), None);
        assert_eq!(b.try_recv(), Some(msg));
        assert_eq!(b.try_recv(), None);
    }

    #[test]
    fn test_claim_marks_clients() {
        let clients = Clients::new();
        let a = clients.register();
        assert!(!clients.is_controlled(a.id()));

        assert_eq!(clients.claim(), 1);
        assert!(clients.is_controlled(a.id()));
    }
}
