//! Endpoint registry: maps a path to one handler of one capability shape.
//!
//! Registration overwrites silently and performs no shape checking; a request
//! whose flow does not match the registered shape is answered with an error
//! at invocation time.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::stream::BoxStream;
use serde::Serialize;
use tracing::warn;
use wsrpc_wire::{codec, Code, Packet, Reply};

use crate::client::Client;
use crate::error::HandlerError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler for one-shot execution (`EXEC_REQ`).
pub trait CallHandler: Send + Sync {
    fn call(
        &self,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
        client: Arc<Client>,
    ) -> BoxFuture<'static, Result<Reply, HandlerError>>;
}

impl<F, Fut> CallHandler for F
where
    F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    fn call(
        &self,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
        client: Arc<Client>,
    ) -> BoxFuture<'static, Result<Reply, HandlerError>> {
        Box::pin((self)(args, bytes, client))
    }
}

/// What a streaming handler produced.
///
/// Handlers may emit through the [`Emitter`] as they go and return `Done`, or
/// hand back one value, a batch, or a lazy stream; the dispatcher sends each
/// item as its own response packet in production order.
pub enum StreamBody {
    Done,
    Item(Vec<u8>),
    Items(Vec<Vec<u8>>),
    Stream(BoxStream<'static, Result<Vec<u8>, HandlerError>>),
}

/// Handler for server-streaming execution (`EXEC2_REQ`).
pub trait StreamHandler: Send + Sync {
    fn call(
        &self,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
        client: Arc<Client>,
        emit: Emitter,
    ) -> BoxFuture<'static, Result<StreamBody, HandlerError>>;
}

impl<F, Fut> StreamHandler for F
where
    F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>, Emitter) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StreamBody, HandlerError>> + Send + 'static,
{
    fn call(
        &self,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
        client: Arc<Client>,
        emit: Emitter,
    ) -> BoxFuture<'static, Result<StreamBody, HandlerError>> {
        Box::pin((self)(args, bytes, client, emit))
    }
}

/// Handler for bidirectional streaming (`EXEC3_REQ`).
///
/// Receives a [`crate::StreamHandle`] it may keep to emit asynchronously and
/// to install push/close hooks. Returning does not complete the exchange; the
/// stream stays open until the peer closes it or the connection dies.
pub trait DuplexHandler: Send + Sync {
    fn call(
        &self,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
        client: Arc<Client>,
        stream: crate::stream::StreamHandle,
    ) -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut> DuplexHandler for F
where
    F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>, crate::stream::StreamHandle) -> Fut
        + Send
        + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn call(
        &self,
        args: Vec<String>,
        bytes: Option<Vec<u8>>,
        client: Arc<Client>,
        stream: crate::stream::StreamHandle,
    ) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin((self)(args, bytes, client, stream))
    }
}

/// A registered endpoint, tagged by capability shape.
#[derive(Clone)]
pub enum Endpoint {
    Call(Arc<dyn CallHandler>),
    Stream(Arc<dyn StreamHandler>),
    Duplex(Arc<dyn DuplexHandler>),
}

/// Path → handler table. Mutated only before the server starts; read-only
/// and freely shared during dispatch.
#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built endpoint, overwriting any previous registration.
    pub fn insert(&mut self, path: impl Into<String>, endpoint: Endpoint) {
        self.endpoints.insert(path.into(), endpoint);
    }

    /// Register a one-shot handler, overwriting any previous registration.
    pub fn register_call<F, Fut>(&mut self, path: impl Into<String>, handler: F)
    where
        F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        self.endpoints
            .insert(path.into(), Endpoint::Call(Arc::new(handler)));
    }

    /// Register a streaming handler, overwriting any previous registration.
    pub fn register_stream<F, Fut>(&mut self, path: impl Into<String>, handler: F)
    where
        F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>, Emitter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StreamBody, HandlerError>> + Send + 'static,
    {
        self.endpoints
            .insert(path.into(), Endpoint::Stream(Arc::new(handler)));
    }

    /// Register a bidirectional handler, overwriting any previous registration.
    pub fn register_duplex<F, Fut>(&mut self, path: impl Into<String>, handler: F)
    where
        F: Fn(Vec<String>, Option<Vec<u8>>, Arc<Client>, crate::stream::StreamHandle) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.endpoints
            .insert(path.into(), Endpoint::Duplex(Arc::new(handler)));
    }

    pub fn resolve(&self, path: &str) -> Option<&Endpoint> {
        self.endpoints.get(path)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Cheap handle for pushing response items into one exchange.
///
/// Bound to (client, id, endpoint) and to the response code of the flow that
/// created it.
#[derive(Clone)]
pub struct Emitter {
    client: Arc<Client>,
    id: u32,
    code: Code,
    endpoint: String,
}

impl Emitter {
    pub(crate) fn new(client: Arc<Client>, id: u32, code: Code, endpoint: String) -> Self {
        Self {
            client,
            id,
            code,
            endpoint,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one already-encoded item.
    pub fn emit(&self, bytes: Vec<u8>) {
        self.client
            .send(Packet::response(self.id, self.code, &self.endpoint, bytes));
    }

    /// Encode and send one structured item.
    pub fn emit_value<T: Serialize + ?Sized>(&self, value: &T) {
        match codec::encode_value(value) {
            Ok(bytes) => self.emit(bytes),
            Err(err) => warn!(
                id = self.id,
                endpoint = %self.endpoint,
                "failed to encode emitted item: {err}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn noop_call(
        _args: Vec<String>,
        _bytes: Option<Vec<u8>>,
        _client: Arc<Client>,
    ) -> impl Future<Output = Result<Reply, HandlerError>> + Send {
        async { Ok(Reply::ok("noop")) }
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = EndpointRegistry::new();
        registry.register_call("/auth", noop_call);

        assert!(matches!(registry.resolve("/auth"), Some(Endpoint::Call(_))));
        assert!(registry.resolve("/missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_overwrites_previous_handler() {
        let mut registry = EndpointRegistry::new();
        registry.register_call("/x", noop_call);
        registry.register_stream("/x", |_args, _bytes, _client, _emit: Emitter| async {
            Ok(StreamBody::Done)
        });

        // Last registration wins, shape and all.
        assert!(matches!(registry.resolve("/x"), Some(Endpoint::Stream(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn three_shapes_coexist() {
        let mut registry = EndpointRegistry::new();
        registry.register_call("/call", noop_call);
        registry.register_stream("/stream", |_a, _b, _c, _e: Emitter| async {
            Ok(StreamBody::Done)
        });
        registry.register_duplex(
            "/duplex",
            |_a, _b, _c, _s: crate::stream::StreamHandle| async { Ok(()) },
        );

        assert!(matches!(registry.resolve("/call"), Some(Endpoint::Call(_))));
        assert!(matches!(
            registry.resolve("/stream"),
            Some(Endpoint::Stream(_))
        ));
        assert!(matches!(
            registry.resolve("/duplex"),
            Some(Endpoint::Duplex(_))
        ));
    }

    #[tokio::test]
    async fn emitter_sends_response_packets() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::new(Client::new(7, tx));
        let emitter = Emitter::new(Arc::clone(&client), 42, Code::Exec2Resp, "/sys".into());

        emitter.emit_value("chunk");

        let axum::extract::ws::Message::Binary(buf) = rx.recv().await.expect("one frame") else {
            panic!("expected binary frame");
        };
        let pkt = codec::decode(&buf).expect("decodes");
        assert_eq!(pkt.id, 42);
        assert_eq!(pkt.code, Code::Exec2Resp);
        let item: String = codec::decode_value(pkt.bytes.as_deref().expect("payload")).unwrap();
        assert_eq!(item, "chunk");
    }
}
