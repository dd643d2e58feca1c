//! Fan-out of unsolicited server events (id = 0) by endpoint topic.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;
use wsrpc_wire::Packet;

/// Topic-keyed subscriber table. Subscribers that dropped their receiver are
/// pruned on the next publish to that topic.
#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Packet>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one endpoint topic.
    pub fn subscribe(&self, topic: &str) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        EventReceiver { rx }
    }

    /// Deliver an event packet to every live subscriber of its topic.
    pub(crate) fn publish(&self, topic: &str, packet: Packet) {
        let mut topics = self.topics.lock();
        let Some(subscribers) = topics.get_mut(topic) else {
            trace!(topic, "event with no subscribers dropped");
            return;
        };
        subscribers.retain(|tx| tx.send(packet.clone()).is_ok());
        if subscribers.is_empty() {
            topics.remove(topic);
        }
    }

    /// Live subscriber count for a topic, after pruning nothing.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

/// Receiving end of one subscription.
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Packet>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<Packet> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Packet> {
        self.rx.try_recv().ok()
    }
}
