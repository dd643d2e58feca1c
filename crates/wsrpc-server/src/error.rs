/// Errors that can occur while running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Packet-level encode/decode error.
    #[error("wire error: {0}")]
    Wire(#[from] wsrpc_wire::WireError),

    /// Socket-level error while binding or serving.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured route path is unusable.
    #[error("invalid route path '{0}': must start with '/'")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Failure raised inside an endpoint handler.
///
/// Converted by the dispatcher into an ERROR packet followed by COMPLETE;
/// never tears down the connection.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub stack: Vec<String>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Vec::new(),
        }
    }

    pub fn with_stack(message: impl Into<String>, stack: Vec<String>) -> Self {
        Self {
            message: message.into(),
            stack,
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<wsrpc_wire::WireError> for HandlerError {
    fn from(err: wsrpc_wire::WireError) -> Self {
        Self::new(err.to_string())
    }
}
