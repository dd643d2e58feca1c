use std::fmt;
use std::io;

use wsrpc_client::{ClientError, ConnectError};
use wsrpc_server::ServerError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Io(source) => io_error(context, source),
        ServerError::Wire(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ServerError::InvalidPath(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::NotConnected => CliError::new(FAILURE, format!("{context}: {err}")),
        ClientError::Connect(ConnectError::AuthenticationFailed(_)) => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        ClientError::Connect(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::Http(err) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::WebSocket(err) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::TransportClosed { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ClientError::Wire(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ClientError::Exchange(err) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
