//! Correlation-id demultiplexing.
//!
//! Every logical exchange is one ordered, lazily-consumed sequence of the
//! inbound packets sharing its id, ending inclusively on the first COMPLETE.
//! Single-result calls, streaming calls and open-ended bidirectional
//! exchanges are all derived from this one mechanism.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_core::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;
use wsrpc_wire::{Code, Packet};

use crate::events::EventBus;

pub(crate) struct MuxShared {
    pending: Mutex<HashMap<u32, mpsc::UnboundedSender<Packet>>>,
    events: Arc<EventBus>,
    closed: AtomicBool,
}

impl MuxShared {
    pub(crate) fn new(events: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            events,
            closed: AtomicBool::new(false),
        })
    }

    /// Register interest in one correlation id.
    ///
    /// Must happen before the request packet is written so no response can
    /// slip past. A collision on the id replaces the stale registration.
    pub(crate) fn register(self: &Arc<Self>, id: u32) -> ResponseStream {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.pending.lock().insert(id, tx).is_some() {
            trace!(id, "replaced stale registration for correlation id");
        }
        ResponseStream {
            id,
            rx,
            done: false,
            mux: Arc::downgrade(self),
        }
    }

    /// Route one inbound packet: events to the bus, everything else to the
    /// sequence registered for its id, in physical arrival order.
    pub(crate) fn route(&self, packet: Packet) {
        if packet.is_event() {
            let topic = packet.endpoint.clone();
            self.events.publish(&topic, packet);
            return;
        }

        let id = packet.id;
        let terminal = packet.code == Code::Complete;
        let sender = self.pending.lock().get(&id).cloned();
        match sender {
            Some(tx) => {
                // A locally-cancelled exchange has dropped its receiver;
                // late packets for it fall on the floor by design.
                let _ = tx.send(packet);
                if terminal {
                    self.pending.lock().remove(&id);
                }
            }
            None => trace!(id, code = packet.code.tag(), "packet for unknown exchange dropped"),
        }
    }

    /// Tear down after the socket is gone. Every open sequence ends.
    pub(crate) fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.lock().clear();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Ordered sequence of the inbound packets for one correlation id,
/// terminating (inclusive) on the first COMPLETE.
///
/// Dropping the stream unregisters locally; for flows 1 and 2 the server is
/// not told and keeps working. Flow 3 offers `EXEC3_CLOSE` for cooperative
/// teardown instead.
pub struct ResponseStream {
    id: u32,
    rx: mpsc::UnboundedReceiver<Packet>,
    done: bool,
    mux: Weak<MuxShared>,
}

impl ResponseStream {
    /// Correlation id this sequence is bound to.
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Stream for ResponseStream {
    type Item = Packet;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Packet>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(packet)) => {
                if packet.code == Code::Complete {
                    this.done = true;
                }
                Poll::Ready(Some(packet))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        if let Some(mux) = self.mux.upgrade() {
            mux.pending.lock().remove(&self.id);
        }
    }
}
