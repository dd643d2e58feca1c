//! Session facade: lifecycle orchestration plus the execute family.
//!
//! A session owns the state machine driver and at most one live transport.
//! `connect()` runs authenticate → connect → ready; the execute family
//! rejects locally until READY is reached. The driver is a single task, so
//! transitions and entry actions are processed one at a time.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use wsrpc_wire::{close_code, random_id, Code, Packet, Reply};

use crate::error::{ClientError, ConnectError, ExchangeError, Result};
use crate::events::{EventBus, EventReceiver};
use crate::lifecycle::{transition, LifecycleEvent, LifecycleState};
use crate::mux::ResponseStream;
use crate::transport::{Transport, TransportStatus};

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub hostname: String,
    pub port: u16,
    pub secure: bool,
    pub ws_path: String,
    pub cookie_path: String,
    pub username: String,
    pub password: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 3040,
            secure: false,
            ws_path: "/socket".to_string(),
            cookie_path: "/cookie".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl ConnectionSettings {
    pub fn ws_url(&self, instance_id: &str) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}{}?connectionId={instance_id}",
            self.hostname, self.port, self.ws_path
        )
    }

    pub fn cookie_url(&self, instance_id: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!(
            "{scheme}://{}:{}{}?connectionId={instance_id}",
            self.hostname, self.port, self.cookie_path
        )
    }
}

/// Identity and client fingerprint posted during the cookie exchange.
#[derive(Debug, Serialize)]
struct SessionMetadata {
    #[serde(rename = "uniqueId")]
    unique_id: String,
    password: String,
    #[serde(rename = "userAgent")]
    user_agent: String,
    window: String,
    screen: String,
    #[serde(rename = "proofOfWork")]
    proof_of_work: String,
}

impl SessionMetadata {
    fn from_settings(settings: &ConnectionSettings) -> Self {
        Self {
            unique_id: settings.username.clone(),
            password: settings.password.clone(),
            user_agent: format!("wsrpc-client/{}", env!("CARGO_PKG_VERSION")),
            window: String::new(),
            screen: String::new(),
            proof_of_work: "0".to_string(),
        }
    }
}

type Waiter = oneshot::Sender<std::result::Result<(), ConnectError>>;

struct SessionState {
    lifecycle: LifecycleState,
    transport: Option<Transport>,
    /// Generation of the live transport. Statuses stamped with an older
    /// epoch belong to an already-replaced socket and are dropped.
    transport_epoch: u64,
    cookie: Option<String>,
    error_messages: Vec<String>,
    connect_waiters: Vec<Waiter>,
    update_waiters: Vec<Waiter>,
    is_connected: bool,
    is_authenticated: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleState::Idle,
            transport: None,
            transport_epoch: 0,
            cookie: None,
            error_messages: Vec::new(),
            connect_waiters: Vec::new(),
            update_waiters: Vec::new(),
            is_connected: false,
            is_authenticated: false,
        }
    }
}

struct SessionInner {
    instance_id: String,
    settings: Mutex<ConnectionSettings>,
    http: reqwest::Client,
    state: Mutex<SessionState>,
    events: Arc<EventBus>,
    status_tx: mpsc::UnboundedSender<(u64, TransportStatus)>,
}

/// One logical session. Survives reconnect attempts; dropped with its owner.
///
/// Must be created inside a Tokio runtime: the constructor spawns the
/// lifecycle driver task.
pub struct Session {
    inner: Arc<SessionInner>,
    driver_tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl Session {
    pub fn new(settings: ConnectionSettings) -> Self {
        let (driver_tx, driver_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            instance_id: format!("conn-{}", random_id()),
            settings: Mutex::new(settings),
            http: reqwest::Client::new(),
            state: Mutex::new(SessionState::default()),
            events: Arc::new(EventBus::new()),
            status_tx,
        });
        tokio::spawn(drive(Arc::clone(&inner), driver_rx, status_rx));
        Self { inner, driver_tx }
    }

    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.inner.state.lock().lifecycle
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().is_connected
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().is_authenticated
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.inner.state.lock().error_messages.clone()
    }

    /// Swap the stored credentials; picked up by the next authenticate.
    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        let mut settings = self.inner.settings.lock();
        settings.username = username.into();
        settings.password = password.into();
    }

    /// Authenticate and connect, resolving once READY is reached.
    ///
    /// At most one connect attempt is outstanding: a second call while one
    /// is pending joins the same attempt instead of authenticating again.
    /// When already connected this refreshes credentials instead, like
    /// [`Session::connect_update`].
    pub async fn connect(&self) -> Result<()> {
        let mut already_connected = false;
        let rx = {
            let mut state = self.inner.state.lock();
            if state.is_connected {
                already_connected = true;
                None
            } else {
                state.error_messages.clear();
                let (tx, rx) = oneshot::channel();
                let first = state.connect_waiters.is_empty();
                state.connect_waiters.push(tx);
                if first {
                    let _ = self.driver_tx.send(LifecycleEvent::Authenticate);
                }
                Some(rx)
            }
        };
        if already_connected {
            return self.connect_update().await;
        }
        await_waiter(rx).await
    }

    /// Re-validate credentials over the open transport without tearing the
    /// socket down. Resolves a handle distinct from `connect()`'s.
    pub async fn connect_update(&self) -> Result<()> {
        let rx = {
            let mut state = self.inner.state.lock();
            if !state.is_connected {
                return Err(ClientError::NotConnected);
            }
            let (tx, rx) = oneshot::channel();
            let first = state.update_waiters.is_empty();
            state.update_waiters.push(tx);
            if first {
                let _ = self.driver_tx.send(LifecycleEvent::AuthUpdate);
            }
            Some(rx)
        };
        await_waiter(rx).await
    }

    /// Close the transport and move the machine to DISCONNECTED. No-op when
    /// not connected.
    pub fn disconnect(&self) {
        {
            let state = self.inner.state.lock();
            if !state.is_connected {
                return;
            }
            if let Some(transport) = &state.transport {
                transport.close();
            }
        }
        let _ = self.driver_tx.send(LifecycleEvent::Disconnect);
    }

    /// One-shot invocation. Server-side failures come back as a `Reply`
    /// whose `is_ok` is false; only local and transport conditions error.
    pub async fn execute(&self, endpoint: &str, args: Vec<String>) -> Result<Reply> {
        execute_on(&self.inner, endpoint, args).await
    }

    /// Server-streaming invocation. Each item is the raw payload of one
    /// response packet; a server failure surfaces as an [`ExchangeError`]
    /// item terminating the stream.
    pub fn execute_streaming(
        &self,
        endpoint: &str,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
    ) -> Result<ItemStream> {
        let transport = connected_transport(&self.inner)?;
        let packet = Packet::exec2_request(endpoint, args, bytes);
        debug!(endpoint, id = packet.id, "execute_streaming");
        Ok(ItemStream::new(endpoint, transport.request_stream(packet)?))
    }

    /// Open a bidirectional exchange: a results sequence plus push/close.
    pub fn open_bidirectional(&self, endpoint: &str, args: Vec<String>) -> Result<Duplex> {
        let transport = connected_transport(&self.inner)?;
        let packet = Packet::exec3_request(endpoint, args, None);
        let id = packet.id;
        debug!(endpoint, id, "open_bidirectional");
        let results = ItemStream::new(endpoint, transport.request_stream(packet)?);
        Ok(Duplex {
            id,
            endpoint: endpoint.to_string(),
            transport,
            results,
        })
    }

    /// Subscribe to unsolicited server events by endpoint topic. Works in
    /// any lifecycle state and survives reconnects.
    pub fn subscribe(&self, topic: &str) -> EventReceiver {
        self.inner.events.subscribe(topic)
    }
}

async fn await_waiter(rx: Option<oneshot::Receiver<std::result::Result<(), ConnectError>>>) -> Result<()> {
    let Some(rx) = rx else {
        return Err(ClientError::NotConnected);
    };
    match rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ClientError::Connect(err)),
        Err(_) => Err(ClientError::Connect(ConnectError::Disconnected(
            "session dropped".to_string(),
        ))),
    }
}

fn connected_transport(inner: &SessionInner) -> Result<Transport> {
    let state = inner.state.lock();
    if !state.is_connected {
        return Err(ClientError::NotConnected);
    }
    state.transport.clone().ok_or(ClientError::NotConnected)
}

async fn execute_on(inner: &Arc<SessionInner>, endpoint: &str, args: Vec<String>) -> Result<Reply> {
    let transport = connected_transport(inner)?;
    let packet = Packet::exec_request(endpoint, args);
    debug!(endpoint, id = packet.id, "execute");
    let mut responses = transport.request_stream(packet)?;
    while let Some(response) = responses.next().await {
        match response.code {
            Code::ExecResp | Code::Error => {
                return Ok(Reply::from_optional(response.bytes.as_deref()))
            }
            _ => {}
        }
    }
    Err(ClientError::TransportClosed {
        code: None,
        reason: "connection closed before response".to_string(),
    })
}

// ________________________________________________________________________________
// Lifecycle driver
// ________________________________________________________________________________

async fn drive(
    inner: Arc<SessionInner>,
    mut machine_rx: mpsc::UnboundedReceiver<LifecycleEvent>,
    mut status_rx: mpsc::UnboundedReceiver<(u64, TransportStatus)>,
) {
    loop {
        let event = tokio::select! {
            event = machine_rx.recv() => match event {
                Some(event) => event,
                // Session dropped; stop driving.
                None => break,
            },
            status = status_rx.recv() => match status {
                Some((epoch, status)) => match status_event(&inner, epoch, status) {
                    Some(event) => event,
                    None => continue,
                },
                None => continue,
            },
        };

        let mut next = Some(event);
        while let Some(event) = next.take() {
            next = step(&inner, event).await;
        }
    }
    debug!("session driver stopped");
}

fn status_event(
    inner: &Arc<SessionInner>,
    epoch: u64,
    status: TransportStatus,
) -> Option<LifecycleEvent> {
    if epoch != inner.state.lock().transport_epoch {
        debug!(epoch, "status from a replaced transport dropped");
        return None;
    }
    match status {
        TransportStatus::Connected => None,
        TransportStatus::Errored { message } => {
            inner.state.lock().error_messages.push(message);
            Some(LifecycleEvent::ClientError)
        }
        TransportStatus::Closed { code, reason } => {
            let mut state = inner.state.lock();
            if let Some(code) = code {
                state
                    .error_messages
                    .push(format!("{code}: {}", close_code::describe(code)));
            } else if !reason.is_empty() {
                state.error_messages.push(reason);
            }
            Some(LifecycleEvent::ClientClosed)
        }
    }
}

async fn step(inner: &Arc<SessionInner>, event: LifecycleEvent) -> Option<LifecycleEvent> {
    let current = inner.state.lock().lifecycle;
    let Some(next) = transition(current, event) else {
        debug!(state = current.as_str(), ?event, "lifecycle event ignored");
        return None;
    };
    inner.state.lock().lifecycle = next;
    debug!(state = next.as_str(), "lifecycle transition");
    enter(inner, next).await
}

/// Entry actions. Each returns the follow-up event it feeds back into the
/// machine, if any.
async fn enter(inner: &Arc<SessionInner>, state: LifecycleState) -> Option<LifecycleEvent> {
    match state {
        LifecycleState::Idle => None,
        LifecycleState::Authenticating => Some(authenticate(inner).await),
        LifecycleState::AuthenticationFailed => {
            let mut st = inner.state.lock();
            st.is_authenticated = false;
            let message = st.error_messages.join("\n");
            reject_all_waiters(&mut st, ConnectError::AuthenticationFailed(message));
            None
        }
        LifecycleState::Connecting => Some(open_transport(inner).await),
        LifecycleState::ConnectionOk => {
            inner.state.lock().is_connected = true;
            Some(LifecycleEvent::ConnectionOk)
        }
        LifecycleState::ConnectionNok => {
            let mut st = inner.state.lock();
            st.is_connected = false;
            st.transport = None;
            st.transport_epoch = st.transport_epoch.wrapping_add(1);
            let message = st.error_messages.join("\n");
            for waiter in st.connect_waiters.drain(..) {
                let _ = waiter.send(Err(ConnectError::ConnectionFailed(message.clone())));
            }
            None
        }
        LifecycleState::Ready => {
            let waiters: Vec<Waiter> = {
                let mut st = inner.state.lock();
                st.is_authenticated = true;
                st.connect_waiters.drain(..).collect()
            };
            for waiter in waiters {
                let _ = waiter.send(Ok(()));
            }
            None
        }
        LifecycleState::AuthUpdate => Some(auth_update(inner).await),
        LifecycleState::Disconnected => {
            let mut st = inner.state.lock();
            st.is_connected = false;
            st.is_authenticated = false;
            st.transport = None;
            st.transport_epoch = st.transport_epoch.wrapping_add(1);
            let message = if st.error_messages.is_empty() {
                "disconnected".to_string()
            } else {
                st.error_messages.join("\n")
            };
            reject_all_waiters(&mut st, ConnectError::Disconnected(message));
            None
        }
    }
}

fn reject_all_waiters(state: &mut SessionState, err: ConnectError) {
    for waiter in state.connect_waiters.drain(..) {
        let _ = waiter.send(Err(err.clone()));
    }
    for waiter in state.update_waiters.drain(..) {
        let _ = waiter.send(Err(err.clone()));
    }
}

async fn authenticate(inner: &Arc<SessionInner>) -> LifecycleEvent {
    let (url, metadata) = {
        let settings = inner.settings.lock();
        (
            settings.cookie_url(&inner.instance_id),
            SessionMetadata::from_settings(&settings),
        )
    };
    debug!(%url, unique_id = %metadata.unique_id, "authenticating");
    match fetch_cookie(inner, &url, &metadata).await {
        Ok(cookie) => {
            inner.state.lock().cookie = Some(cookie);
            LifecycleEvent::AuthenticateOk
        }
        Err(message) => {
            let mut st = inner.state.lock();
            st.error_messages.push("authenticate".to_string());
            st.error_messages.push(message);
            LifecycleEvent::AuthenticateNok
        }
    }
}

/// Out-of-band credential exchange. The upgrade handshake cannot carry
/// custom authentication headers cross-origin, so a cookie is established
/// over HTTP first and presented on the upgrade request.
async fn fetch_cookie(
    inner: &Arc<SessionInner>,
    url: &str,
    metadata: &SessionMetadata,
) -> std::result::Result<String, String> {
    let response = inner
        .http
        .post(url)
        .json(metadata)
        .send()
        .await
        .map_err(|err| format!("cookie request failed: {err}"))?;
    let status = response.status();
    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_string());
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(format!("HTTP error: {status} - {body}"));
    }
    cookie.ok_or_else(|| "no session cookie issued".to_string())
}

async fn open_transport(inner: &Arc<SessionInner>) -> LifecycleEvent {
    let url = inner.settings.lock().ws_url(&inner.instance_id);
    let (cookie, epoch) = {
        let state = inner.state.lock();
        (state.cookie.clone(), state.transport_epoch.wrapping_add(1))
    };

    // Stamp this transport's statuses so a replaced socket's late close
    // cannot tear down its successor.
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let forward = inner.status_tx.clone();
    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            if forward.send((epoch, status)).is_err() {
                break;
            }
        }
    });

    match Transport::connect(&url, cookie.as_deref(), Arc::clone(&inner.events), status_tx).await {
        Ok(transport) => {
            let mut state = inner.state.lock();
            state.transport = Some(transport);
            state.transport_epoch = epoch;
            LifecycleEvent::ConnectOk
        }
        Err(err) => {
            let mut st = inner.state.lock();
            st.error_messages.push("cannot connect".to_string());
            st.error_messages.push(err.to_string());
            LifecycleEvent::ConnectNok
        }
    }
}

async fn auth_update(inner: &Arc<SessionInner>) -> LifecycleEvent {
    let (username, password) = {
        let settings = inner.settings.lock();
        (settings.username.clone(), settings.password.clone())
    };
    let outcome = execute_on(
        inner,
        "/auth",
        vec!["login".to_string(), username, password],
    )
    .await;

    let (event, result) = match outcome {
        Ok(reply) if reply.is_ok => (LifecycleEvent::AuthUpdateOk, Ok(())),
        Ok(reply) => {
            inner.state.lock().error_messages.push(reply.result.clone());
            (
                LifecycleEvent::AuthUpdateNok,
                Err(ConnectError::AuthenticationFailed(reply.result)),
            )
        }
        Err(err) => {
            let message = err.to_string();
            inner.state.lock().error_messages.push(message.clone());
            (
                LifecycleEvent::AuthUpdateNok,
                Err(ConnectError::AuthenticationFailed(message)),
            )
        }
    };

    let waiters: Vec<Waiter> = inner.state.lock().update_waiters.drain(..).collect();
    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
    event
}

// ________________________________________________________________________________
// Exchange sequences
// ________________________________________________________________________________

/// Payload items of one exchange, derived from the raw packet sequence:
/// ACCEPT is skipped, response payloads are yielded, a server ERROR becomes
/// a typed error item, COMPLETE terminates.
pub struct ItemStream {
    endpoint: String,
    inner: ResponseStream,
}

impl ItemStream {
    pub(crate) fn new(endpoint: &str, inner: ResponseStream) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            inner,
        }
    }

    /// Correlation id of the underlying exchange.
    pub fn id(&self) -> u32 {
        self.inner.id()
    }
}

impl Stream for ItemStream {
    type Item = std::result::Result<Vec<u8>, ExchangeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(packet)) => match packet.code {
                    Code::Accept => continue,
                    Code::Complete => return Poll::Ready(None),
                    Code::ExecResp | Code::Exec2Resp | Code::Exec3Resp => {
                        return Poll::Ready(Some(Ok(packet.bytes.unwrap_or_default())))
                    }
                    Code::Error => {
                        return Poll::Ready(Some(Err(ExchangeError::new(
                            this.endpoint.clone(),
                            Reply::from_optional(packet.bytes.as_deref()),
                        ))))
                    }
                    other => {
                        return Poll::Ready(Some(Err(ExchangeError::new(
                            this.endpoint.clone(),
                            Reply::nok(format!("invalid packet code: {}", other.tag()), Vec::new()),
                        ))))
                    }
                },
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// An open bidirectional exchange: a results sequence plus push and close.
///
/// Dropping the handle without [`Duplex::close`] abandons the exchange
/// locally; the server keeps its context until told otherwise.
pub struct Duplex {
    id: u32,
    endpoint: String,
    transport: Transport,
    results: ItemStream,
}

impl Duplex {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Push a payload into the open stream.
    pub fn push(&self, bytes: Vec<u8>) -> Result<()> {
        self.transport.send(Packet::exec3_push(self.id, bytes))
    }

    /// Ask the server to tear the stream down; the results sequence ends
    /// when its COMPLETE arrives.
    pub fn close(&self) -> Result<()> {
        self.transport.send(Packet::exec3_close(self.id))
    }
}

impl Stream for Duplex {
    type Item = std::result::Result<Vec<u8>, ExchangeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().results).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::MuxShared;

    #[test]
    fn urls_carry_scheme_and_instance() {
        let settings = ConnectionSettings {
            hostname: "dash.example".to_string(),
            port: 443,
            secure: true,
            ..ConnectionSettings::default()
        };
        assert_eq!(
            settings.ws_url("conn-9"),
            "wss://dash.example:443/socket?connectionId=conn-9"
        );
        assert_eq!(
            settings.cookie_url("conn-9"),
            "https://dash.example:443/cookie?connectionId=conn-9"
        );
    }

    #[tokio::test]
    async fn execute_family_rejects_before_ready() {
        let session = Session::new(ConnectionSettings::default());

        assert!(matches!(
            session.execute("/auth", vec![]).await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            session.execute_streaming("/sys/feed", vec![], None),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            session.open_bidirectional("/sys/relay", vec![]),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            session.connect_update().await,
            Err(ClientError::NotConnected)
        ));
        assert_eq!(session.lifecycle(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn failed_authentication_rejects_connect() {
        // Nothing listens on port 9; the credential POST cannot succeed.
        let session = Session::new(ConnectionSettings {
            hostname: "127.0.0.1".to_string(),
            port: 9,
            username: "tester".to_string(),
            password: "secret".to_string(),
            ..ConnectionSettings::default()
        });

        let err = session.connect().await.expect_err("connect must fail");
        assert!(matches!(
            err,
            ClientError::Connect(ConnectError::AuthenticationFailed(_))
        ));
        assert_eq!(session.lifecycle(), LifecycleState::AuthenticationFailed);
        assert!(!session.is_connected());
        assert!(!session.error_messages().is_empty());
    }

    #[tokio::test]
    async fn item_stream_maps_packet_codes() {
        let bus = Arc::new(EventBus::new());
        let mux = MuxShared::new(Arc::clone(&bus));
        let stream = mux.register(5);
        let mut items = ItemStream::new("/sys/feed", stream);

        mux.route(Packet::accept(5, "/sys/feed"));
        mux.route(Packet::response(5, Code::Exec2Resp, "/sys/feed", vec![7]));
        mux.route(Packet::error(
            5,
            "/sys/feed",
            Reply::nok("backend down", vec![]).to_bytes().ok(),
        ));
        mux.route(Packet::complete(5, "/sys/feed"));

        let first = items.next().await.expect("payload item");
        assert_eq!(first.unwrap(), vec![7]);

        let second = items.next().await.expect("error item");
        let err = second.unwrap_err();
        assert_eq!(err.endpoint, "/sys/feed");
        assert_eq!(err.reply.result, "backend down");

        assert!(items.next().await.is_none());
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_a_no_op() {
        let session = Session::new(ConnectionSettings::default());
        session.disconnect();
        assert_eq!(session.lifecycle(), LifecycleState::Idle);
    }
}
