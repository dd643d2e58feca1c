//! Out-of-band cookie authentication for the upgrade path.
//!
//! The WebSocket handshake cannot carry custom authentication headers from a
//! browser, so credentials travel over a plain HTTP POST first. A valid post
//! sets a session cookie; the upgrade request must present it.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use wsrpc_wire::close_code;

use crate::server::ServerState;

/// Identity plus client fingerprint posted to the cookie endpoint.
///
/// The fingerprint fields exist to tell browsers from bots; they are stored
/// with the session but not otherwise interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "uniqueId")]
    pub unique_id: String,
    pub password: String,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
    #[serde(default)]
    pub window: String,
    #[serde(default)]
    pub screen: String,
    #[serde(rename = "proofOfWork", default)]
    pub proof_of_work: String,
}

impl SessionMetadata {
    pub fn new(unique_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            password: password.into(),
            user_agent: String::new(),
            window: String::new(),
            screen: String::new(),
            proof_of_work: "0".to_string(),
        }
    }
}

struct SessionEntry {
    unique_id: String,
    issued_at: Instant,
}

/// Issued-session table keyed by opaque token.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token for an authenticated identity.
    pub fn issue(&self, unique_id: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        self.sessions.lock().insert(
            token.clone(),
            SessionEntry {
                unique_id: unique_id.to_string(),
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// Look up a token, returning the identity it was issued to.
    pub fn validate(&self, token: &str) -> Option<String> {
        self.sessions
            .lock()
            .get(token)
            .map(|entry| entry.unique_id.clone())
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.lock().remove(token);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Age of a session, if it exists.
    pub fn age(&self, token: &str) -> Option<std::time::Duration> {
        self.sessions
            .lock()
            .get(token)
            .map(|entry| entry.issued_at.elapsed())
    }
}

/// POST handler that validates credentials and sets the session cookie.
/// The body echoes the unique id so callers can confirm who they are.
pub(crate) async fn issue_cookie(
    State(state): State<Arc<ServerState>>,
    Json(meta): Json<SessionMetadata>,
) -> Response {
    if !(state.credential_check)(&meta) {
        warn!(unique_id = %meta.unique_id, "credential check rejected cookie request");
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }

    let token = state.sessions.issue(&meta.unique_id);
    debug!(unique_id = %meta.unique_id, "session cookie issued");
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        state.config.cookie_name, token
    );
    ([(header::SET_COOKIE, cookie)], meta.unique_id).into_response()
}

/// Gate an upgrade request on its session cookie. Returns the application
/// close code describing the refusal.
pub(crate) fn validate_upgrade(state: &ServerState, headers: &HeaderMap) -> Result<String, u16> {
    let raw = headers
        .get(header::COOKIE)
        .ok_or(close_code::MISSING_COOKIE)?;
    let raw = raw
        .to_str()
        .map_err(|_| close_code::COOKIE_DECODE_ERROR)?;

    let token = raw
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == state.config.cookie_name)
        .map(|(_, value)| value)
        .ok_or(close_code::MISSING_COOKIE)?;

    state
        .sessions
        .validate(token)
        .ok_or(close_code::SESSION_VALIDATION_FAILED)
}

/// Default credential check: both identity and password must have at least
/// three characters.
pub(crate) fn default_credential_check(meta: &SessionMetadata) -> bool {
    meta.unique_id.len() >= 3 && meta.password.len() >= 3
}
