//! Client side of the wsrpc protocol.
//!
//! One physical WebSocket connection carries many logical exchanges keyed by
//! correlation id. The [`Transport`] demultiplexes inbound packets to
//! per-request sequences, the [`Session`] runs the authenticate → connect →
//! ready lifecycle and exposes the execute family, and the [`EventBus`] fans
//! unsolicited server events out to subscribers by topic.

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod mux;
pub mod session;
pub mod transport;

pub use error::{ClientError, ConnectError, ExchangeError, Result};
pub use events::{EventBus, EventReceiver};
pub use lifecycle::{transition, LifecycleEvent, LifecycleState};
pub use mux::ResponseStream;
pub use session::{ConnectionSettings, Duplex, ItemStream, Session};
pub use transport::{Transport, TransportStatus};
