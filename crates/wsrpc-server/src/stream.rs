//! Server-side state for one open bidirectional exchange.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HandlerError;
use crate::registry::{BoxFuture, Emitter};

pub(crate) type PushFn =
    dyn Fn(Option<Vec<u8>>) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync;
pub(crate) type CloseFn =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<(), HandlerError>> + Send>;

/// Hook storage shared between the dispatcher and the handler's handle.
#[derive(Default)]
pub struct StreamShared {
    pub(crate) on_push: Mutex<Option<Arc<PushFn>>>,
    pub(crate) on_close: Mutex<Option<CloseFn>>,
}

/// Handle a bidirectional handler keeps for the lifetime of its stream.
///
/// Lets the handler emit response items at will and install the hooks the
/// dispatcher invokes for `EXEC3_PUSH` / `EXEC3_CLOSE`.
#[derive(Clone)]
pub struct StreamHandle {
    shared: Arc<StreamShared>,
    emitter: Emitter,
}

impl StreamHandle {
    pub(crate) fn new(shared: Arc<StreamShared>, emitter: Emitter) -> Self {
        Self { shared, emitter }
    }

    /// Correlation id of this stream.
    pub fn id(&self) -> u32 {
        self.emitter.id()
    }

    /// Endpoint this stream was opened on.
    pub fn endpoint(&self) -> &str {
        self.emitter.endpoint()
    }

    /// Emitter bound to this stream, cloneable into background tasks.
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Install the hook invoked for every `EXEC3_PUSH` on this stream.
    ///
    /// A hook error is reported to the peer but leaves the stream open.
    pub fn on_push<F, Fut>(&self, hook: F)
    where
        F: Fn(Option<Vec<u8>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        *self.shared.on_push.lock() = Some(Arc::new(move |bytes| Box::pin(hook(bytes))));
    }

    /// Install the hook invoked once when the peer closes this stream.
    pub fn on_close<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        *self.shared.on_close.lock() = Some(Box::new(move || Box::pin(hook())));
    }
}
