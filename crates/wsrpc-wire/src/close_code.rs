//! WebSocket close codes used by the protocol.
//!
//! 1000-1015 are the standard registry; 4000+ is the application range this
//! protocol claims for authentication and framing violations.

/// Missing session cookie on upgrade.
pub const MISSING_COOKIE: u16 = 4001;
/// Session cookie present but unreadable.
pub const COOKIE_DECODE_ERROR: u16 = 4002;
/// Cookie decoded but the authenticator is not recognized.
pub const INVALID_AUTHENTICATOR: u16 = 4003;
/// Session validation against the store failed.
pub const SESSION_VALIDATION_FAILED: u16 = 4004;
/// A text frame arrived where only binary frames are accepted.
pub const TEXT_FRAME_REJECTED: u16 = 4005;
/// The server hit an unhandled exception servicing the connection.
pub const UNHANDLED_EXCEPTION: u16 = 4006;

/// Human-readable description for a close code.
pub fn describe(code: u16) -> &'static str {
    match code {
        1000 => "connection closed normally",
        1001 => "connection is going away (server shutdown or tab closed)",
        1002 => "protocol error occurred (malformed frame)",
        1003 => "invalid message type - cannot accept data type",
        1005 => "no close status but transport finished normally",
        1006 => "transport layer broke or could not connect",
        1007 => "invalid payload data - data inconsistent with message type",
        1008 => "endpoint terminated connection (policy violation)",
        1009 => "message too big",
        1011 => "internal server error",
        1012 => "server/service is restarting",
        3000 => "endpoint must be authorized (HTTP 401 equivalent)",
        3003 => "no permission to perform request (HTTP 403 equivalent)",
        3008 => "endpoint took too long to respond (HTTP 408 equivalent)",
        MISSING_COOKIE => "missing cookie",
        COOKIE_DECODE_ERROR => "cookie decode error",
        INVALID_AUTHENTICATOR => "invalid authenticator",
        SESSION_VALIDATION_FAILED => "validate session failed",
        TEXT_FRAME_REJECTED => "received text but binary is required",
        UNHANDLED_EXCEPTION => "unhandled exception",
        _ => "unknown",
    }
}
