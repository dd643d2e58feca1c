//! Server assembly: configuration, builder, HTTP surface, broadcast.
//!
//! The HTTP app exposes exactly two routes: the cookie endpoint and the
//! upgrade path. Anything else is refused at the HTTP layer before upgrade.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use wsrpc_wire::{close_code, codec, Packet};

use crate::auth::{self, SessionMetadata, SessionStore};
use crate::client::Client;
use crate::dispatch;
use crate::error::{Result, ServerError};
use crate::registry::EndpointRegistry;

/// Predicate deciding whether posted credentials earn a session cookie.
pub type CredentialCheck = Arc<dyn Fn(&SessionMetadata) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path on which WebSocket upgrades are accepted.
    pub ws_path: String,
    /// Path of the HTTP cookie exchange.
    pub cookie_path: String,
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Gate upgrades on a valid session cookie.
    pub require_auth: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_path: "/socket".to_string(),
            cookie_path: "/cookie".to_string(),
            cookie_name: "wsrpc_session".to_string(),
            require_auth: true,
        }
    }
}

pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) registry: EndpointRegistry,
    pub(crate) clients: Mutex<HashMap<u64, Arc<Client>>>,
    pub(crate) sessions: SessionStore,
    pub(crate) next_client_id: AtomicU64,
    pub(crate) credential_check: CredentialCheck,
}

/// Builder collecting configuration and endpoint registrations.
///
/// The registry freezes at [`WsServerBuilder::build`]; registration is not
/// meant to be concurrent and dispatch only ever reads it.
pub struct WsServerBuilder {
    config: ServerConfig,
    registry: EndpointRegistry,
    credential_check: CredentialCheck,
}

impl WsServerBuilder {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn credential_check(
        mut self,
        check: impl Fn(&SessionMetadata) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.credential_check = Arc::new(check);
        self
    }

    /// Register a one-shot endpoint, overwriting any previous handler.
    pub fn register_call<F, Fut>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<wsrpc_wire::Reply, crate::HandlerError>>
            + Send
            + 'static,
    {
        self.registry.register_call(path, handler);
        self
    }

    /// Register a server-streaming endpoint, overwriting any previous handler.
    pub fn register_stream<F, Fut>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>, crate::Emitter) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = std::result::Result<crate::StreamBody, crate::HandlerError>>
            + Send
            + 'static,
    {
        self.registry.register_stream(path, handler);
        self
    }

    /// Register a bidirectional endpoint, overwriting any previous handler.
    pub fn register_duplex<F, Fut>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>, crate::StreamHandle) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = std::result::Result<(), crate::HandlerError>> + Send + 'static,
    {
        self.registry.register_duplex(path, handler);
        self
    }

    pub fn build(self) -> WsServer {
        WsServer {
            state: Arc::new(ServerState {
                config: self.config,
                registry: self.registry,
                clients: Mutex::new(HashMap::new()),
                sessions: SessionStore::new(),
                next_client_id: AtomicU64::new(1),
                credential_check: self.credential_check,
            }),
        }
    }
}

/// The protocol server: one upgrade path, one cookie path, many clients.
#[derive(Clone)]
pub struct WsServer {
    state: Arc<ServerState>,
}

impl WsServer {
    pub fn builder() -> WsServerBuilder {
        WsServerBuilder {
            config: ServerConfig::default(),
            registry: EndpointRegistry::new(),
            credential_check: Arc::new(auth::default_credential_check),
        }
    }

    pub(crate) fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// The HTTP application. Exposed so hosts can mount extra routes beside
    /// the protocol surface.
    pub fn router(&self) -> Result<Router> {
        for path in [&self.state.config.ws_path, &self.state.config.cookie_path] {
            if !path.starts_with('/') {
                return Err(ServerError::InvalidPath(path.clone()));
            }
        }
        Ok(Router::new()
            .route(&self.state.config.cookie_path, post(auth::issue_cookie))
            .route(&self.state.config.ws_path, get(upgrade))
            .with_state(Arc::clone(&self.state)))
    }

    /// Serve until the listener fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = self.router()?;
        info!(addr = %listener.local_addr()?, ws_path = %self.state.config.ws_path, "listening");
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Serve until `shutdown` resolves, then close every client with 1001
    /// and drain.
    pub async fn serve_with_shutdown(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let app = self.router()?;
        info!(addr = %listener.local_addr()?, ws_path = %self.state.config.ws_path, "listening");

        let state = Arc::clone(&self.state);
        let signal = async move {
            shutdown.await;
            let clients: Vec<Arc<Client>> = state.clients.lock().values().cloned().collect();
            info!(clients = clients.len(), "shutting down");
            for client in clients {
                client.send_close(1001, close_code::describe(1001));
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }

    /// Fan an unsolicited EVENT out to every open client.
    ///
    /// Fire-and-forget: no acknowledgment, no ordering promise relative to
    /// in-flight exchanges beyond physical send order.
    pub fn broadcast(&self, endpoint: &str, bytes: Option<Vec<u8>>) {
        let packet = Packet::event(endpoint, bytes);
        let clients: Vec<Arc<Client>> = self.state.clients.lock().values().cloned().collect();
        debug!(endpoint, clients = clients.len(), "broadcast");
        for client in clients {
            client.send(packet.clone());
        }
    }

    /// Encode a structured payload and broadcast it.
    pub fn broadcast_value<T: Serialize + ?Sized>(&self, endpoint: &str, value: &T) -> Result<()> {
        let bytes = codec::encode_value(value)?;
        self.broadcast(endpoint, Some(bytes));
        Ok(())
    }

    /// Number of currently open client connections.
    pub fn client_count(&self) -> usize {
        self.state.clients.lock().len()
    }

    /// Number of issued sessions.
    pub fn session_count(&self) -> usize {
        self.state.sessions.len()
    }
}

async fn upgrade(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if state.config.require_auth {
        match auth::validate_upgrade(&state, &headers) {
            Ok(unique_id) => debug!(%unique_id, "upgrade authorized"),
            Err(code) => {
                warn!(code, "refusing upgrade: {}", close_code::describe(code));
                return (StatusCode::UNAUTHORIZED, close_code::describe(code)).into_response();
            }
        }
    }
    ws.on_upgrade(move |socket| dispatch::run_connection(state, socket))
        .into_response()
}
