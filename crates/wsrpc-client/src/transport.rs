//! Ownership of the single physical WebSocket connection.
//!
//! One writer task drains the outbound queue; one reader task decodes
//! inbound binary frames and hands them to the multiplexer. Connection
//! status changes flow on their own channel, independent of any request's
//! sequence, so the lifecycle machine can react without being a request.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use wsrpc_wire::{codec, Packet};

use crate::error::{ClientError, ConnectError, Result};
use crate::events::EventBus;
use crate::mux::{MuxShared, ResponseStream};

/// Transport-level notifications consumed by the lifecycle machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    Connected,
    Closed { code: Option<u16>, reason: String },
    Errored { message: String },
}

/// Handle to one open connection. Cloneable; all clones share the socket.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    outgoing: Mutex<Option<mpsc::UnboundedSender<Packet>>>,
    mux: Arc<MuxShared>,
}

impl Transport {
    /// Dial `url`, optionally presenting a session cookie on the upgrade
    /// request. Events (id = 0) are routed into `events`; status changes are
    /// reported on `status`.
    pub async fn connect(
        url: &str,
        cookie: Option<&str>,
        events: Arc<EventBus>,
        status: mpsc::UnboundedSender<TransportStatus>,
    ) -> Result<Self> {
        let mut request = url.into_client_request()?;
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie).map_err(|_| {
                ClientError::Connect(ConnectError::ConnectionFailed(
                    "session cookie is not a valid header value".to_string(),
                ))
            })?;
            request.headers_mut().insert(header::COOKIE, value);
        }

        let (socket, _response) = connect_async(request).await?;
        debug!(url, "websocket open");
        let (mut sink, mut incoming) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Packet>();
        let mux = MuxShared::new(events);

        tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                match codec::encode(&packet) {
                    Ok(buf) => {
                        if sink.send(Message::Binary(buf.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("failed to encode outbound packet: {err}"),
                }
            }
            let _ = sink.close().await;
        });

        let reader_mux = Arc::clone(&mux);
        tokio::spawn(async move {
            let mut close: Option<(Option<u16>, String)> = None;
            while let Some(frame) = incoming.next().await {
                match frame {
                    Ok(Message::Binary(data)) => match codec::decode(&data) {
                        Ok(packet) => reader_mux.route(packet),
                        Err(err) => warn!("dropping undecodable frame: {err}"),
                    },
                    Ok(Message::Close(frame)) => {
                        close = Some(match frame {
                            Some(frame) => {
                                (Some(u16::from(frame.code)), frame.reason.as_str().to_owned())
                            }
                            None => (None, String::new()),
                        });
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let _ = status.send(TransportStatus::Errored {
                            message: err.to_string(),
                        });
                        break;
                    }
                }
            }
            reader_mux.shutdown();
            let (code, reason) = close.unwrap_or((None, "connection lost".to_string()));
            let _ = status.send(TransportStatus::Closed { code, reason });
        });

        Ok(Self {
            inner: Arc::new(TransportInner {
                outgoing: Mutex::new(Some(tx)),
                mux,
            }),
        })
    }

    /// Write one packet, fire-and-forget. Used for pushes and closes on
    /// streams that are already open.
    pub fn send(&self, packet: Packet) -> Result<()> {
        let sender = self
            .inner
            .outgoing
            .lock()
            .clone()
            .ok_or(ClientError::NotConnected)?;
        sender.send(packet).map_err(|_| ClientError::NotConnected)
    }

    /// Open a logical exchange: register the correlation id, then write the
    /// request. The returned sequence yields every inbound packet with that
    /// id in arrival order, ending inclusively on COMPLETE.
    pub fn request_stream(&self, packet: Packet) -> Result<ResponseStream> {
        if self.inner.mux.is_closed() {
            return Err(ClientError::NotConnected);
        }
        let stream = self.inner.mux.register(packet.id);
        self.send(packet)?;
        Ok(stream)
    }

    /// Close the connection. In-flight sequences end when the socket does.
    pub fn close(&self) {
        self.inner.outgoing.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.mux.is_closed() || self.inner.outgoing.lock().is_none()
    }
}
