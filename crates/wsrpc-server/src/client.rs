use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::Message;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};
use wsrpc_wire::{codec, Packet};

use crate::stream::StreamShared;

/// One accepted connection, as the server sees it.
///
/// Owns the outbound packet queue and the table of open bidirectional
/// streams. Dropped whole when the socket closes; open stream contexts are
/// discarded with it, not closed.
pub struct Client {
    id: u64,
    outgoing: mpsc::UnboundedSender<Message>,
    connected_at: Instant,
    streams: Mutex<HashMap<u32, StreamEntry>>,
}

pub(crate) struct StreamEntry {
    pub(crate) endpoint: String,
    pub(crate) shared: Arc<StreamShared>,
}

impl Client {
    pub(crate) fn new(id: u64, outgoing: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            outgoing,
            connected_at: Instant::now(),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Server-assigned connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// When the upgrade was accepted.
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Encode and queue a packet for this client.
    ///
    /// Fire-and-forget: a closed or congested socket drops the packet, which
    /// mirrors broadcast semantics for disconnecting peers.
    pub fn send(&self, packet: Packet) {
        let buf = match codec::encode(&packet) {
            Ok(buf) => buf,
            Err(err) => {
                warn!(client = self.id, "failed to encode outbound packet: {err}");
                return;
            }
        };
        if self.outgoing.send(Message::Binary(buf.into())).is_err() {
            trace!(client = self.id, "outbound queue closed, packet dropped");
        }
    }

    /// Queue a close frame; the writer shuts the socket after sending it.
    pub(crate) fn send_close(&self, code: u16, reason: &str) {
        let frame = axum::extract::ws::CloseFrame {
            code,
            reason: reason.into(),
        };
        if self.outgoing.send(Message::Close(Some(frame))).is_err() {
            trace!(client = self.id, "outbound queue closed, close frame dropped");
        }
    }

    /// Number of open bidirectional streams.
    pub fn open_streams(&self) -> usize {
        self.streams.lock().len()
    }

    pub(crate) fn insert_stream(&self, id: u32, endpoint: String, shared: Arc<StreamShared>) {
        self.streams
            .lock()
            .insert(id, StreamEntry { endpoint, shared });
    }

    pub(crate) fn stream(&self, id: u32) -> Option<(String, Arc<StreamShared>)> {
        self.streams
            .lock()
            .get(&id)
            .map(|entry| (entry.endpoint.clone(), Arc::clone(&entry.shared)))
    }

    pub(crate) fn take_stream(&self, id: u32) -> Option<(String, Arc<StreamShared>)> {
        self.streams
            .lock()
            .remove(&id)
            .map(|entry| (entry.endpoint, entry.shared))
    }

    pub(crate) fn remove_stream(&self, id: u32) {
        self.streams.lock().remove(&id);
    }

    pub(crate) fn clear_streams(&self) {
        self.streams.lock().clear();
    }
}
