use wsrpc_wire::Reply;

/// Errors surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Packet-level encode/decode error.
    #[error("wire error: {0}")]
    Wire(#[from] wsrpc_wire::WireError),

    /// An execute-family call was made before the lifecycle reached READY.
    /// Rejected locally; nothing touches the wire.
    #[error("not connected")]
    NotConnected,

    /// The connect cycle ended in a terminal failure state.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Out-of-band credential exchange failed at the HTTP layer.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket-level failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection went away mid-exchange.
    #[error("transport closed: {reason}")]
    TransportClosed { code: Option<u16>, reason: String },

    /// A streaming or bidirectional exchange failed server-side.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Terminal outcome of a failed connect cycle, cloneable so every queued
/// `connect()` caller receives the same rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("disconnected: {0}")]
    Disconnected(String),
}

/// Typed failure raised by streaming and bidirectional exchanges, carrying
/// the endpoint and the server's original failure payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("exchange failed on {endpoint}: {}", reply.result)]
pub struct ExchangeError {
    pub endpoint: String,
    pub reply: Reply,
}

impl ExchangeError {
    pub fn new(endpoint: impl Into<String>, reply: Reply) -> Self {
        Self {
            endpoint: endpoint.into(),
            reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_error_displays_endpoint_and_cause() {
        let err = ExchangeError::new("/sys/feed", Reply::nok("backend down", vec![]));
        let text = err.to_string();
        assert!(text.contains("/sys/feed"));
        assert!(text.contains("backend down"));
    }

    #[test]
    fn connect_error_is_cloneable() {
        let err = ConnectError::AuthenticationFailed("bad password".into());
        assert_eq!(err.clone(), err);
    }
}
