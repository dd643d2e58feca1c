//! Protocol dispatcher and WebSocket server for wsrpc.
//!
//! Accepts upgrades on a single configured path, authenticates them against a
//! cookie issued over plain HTTP, and multiplexes three request flows per
//! connection: one-shot execution, server streaming, and bidirectional
//! streaming, all correlated by packet id.

pub mod auth;
pub mod client;
mod dispatch;
pub mod error;
pub mod registry;
pub mod server;
pub mod stream;

pub use auth::{SessionMetadata, SessionStore};
pub use client::Client;
pub use error::{HandlerError, Result, ServerError};
pub use registry::{
    BoxFuture, CallHandler, DuplexHandler, Emitter, Endpoint, EndpointRegistry, StreamBody,
    StreamHandler,
};
pub use server::{CredentialCheck, ServerConfig, WsServer, WsServerBuilder};
pub use stream::StreamHandle;
