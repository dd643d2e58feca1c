//! Connection lifecycle state machine.
//!
//! A fixed, declarative transition table: small enough that a plain match is
//! the whole interpreter. Entry actions live with the session driver; this
//! module only answers "given this state and this event, where to".

/// Named lifecycle states. READY and DISCONNECTED are the only states from
/// which a fresh authenticate restarts the cycle (besides the failure
/// states, which also accept it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Authenticating,
    AuthenticationFailed,
    Connecting,
    ConnectionOk,
    ConnectionNok,
    Ready,
    AuthUpdate,
    Disconnected,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "IDLE",
            LifecycleState::Authenticating => "AUTHENTICATING",
            LifecycleState::AuthenticationFailed => "AUTHENTICATION_FAILED",
            LifecycleState::Connecting => "CONNECTING",
            LifecycleState::ConnectionOk => "CONNECTION_OK",
            LifecycleState::ConnectionNok => "CONNECTION_NOK",
            LifecycleState::Ready => "READY",
            LifecycleState::AuthUpdate => "AUTH_UPDATE",
            LifecycleState::Disconnected => "DISCONNECTED",
        }
    }
}

/// Events fed into the machine, either by callers (authenticate, disconnect,
/// auth update) or by observing the transport and the entry actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Authenticate,
    AuthenticateOk,
    AuthenticateNok,
    ConnectOk,
    ConnectNok,
    ClientError,
    ClientClosed,
    ConnectionOk,
    Disconnect,
    AuthUpdate,
    AuthUpdateOk,
    AuthUpdateNok,
}

/// Pure transition function. `None` means the event is ignored in this
/// state, matching interpreter semantics for unlisted transitions.
pub fn transition(state: LifecycleState, event: LifecycleEvent) -> Option<LifecycleState> {
    match (state, event) {
        (LifecycleState::Idle, LifecycleEvent::Authenticate) => Some(LifecycleState::Authenticating),

        (LifecycleState::Authenticating, LifecycleEvent::AuthenticateOk) => {
            Some(LifecycleState::Connecting)
        }
        (LifecycleState::Authenticating, LifecycleEvent::AuthenticateNok) => {
            Some(LifecycleState::AuthenticationFailed)
        }
        (LifecycleState::AuthenticationFailed, LifecycleEvent::Authenticate) => {
            Some(LifecycleState::Authenticating)
        }

        (LifecycleState::Connecting, LifecycleEvent::ConnectOk) => Some(LifecycleState::ConnectionOk),
        (
            LifecycleState::Connecting,
            LifecycleEvent::ConnectNok | LifecycleEvent::ClientError | LifecycleEvent::ClientClosed,
        ) => Some(LifecycleState::ConnectionNok),

        (LifecycleState::ConnectionOk, LifecycleEvent::ConnectionOk) => Some(LifecycleState::Ready),
        (LifecycleState::ConnectionNok, LifecycleEvent::Authenticate) => {
            Some(LifecycleState::Authenticating)
        }

        (LifecycleState::Ready, LifecycleEvent::Disconnect | LifecycleEvent::ClientClosed) => {
            Some(LifecycleState::Disconnected)
        }
        (LifecycleState::Ready, LifecycleEvent::AuthUpdate) => Some(LifecycleState::AuthUpdate),

        (
            LifecycleState::AuthUpdate,
            LifecycleEvent::AuthUpdateOk | LifecycleEvent::AuthUpdateNok,
        ) => Some(LifecycleState::Ready),

        (LifecycleState::Disconnected, LifecycleEvent::Authenticate) => {
            Some(LifecycleState::Authenticating)
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleEvent::*;
    use super::LifecycleState::*;
    use super::*;

    #[test]
    fn happy_path_reaches_ready() {
        let mut state = Idle;
        for event in [Authenticate, AuthenticateOk, ConnectOk, LifecycleEvent::ConnectionOk] {
            state = transition(state, event).expect("transition defined");
        }
        assert_eq!(state, Ready);
    }

    #[test]
    fn failed_authentication_is_restartable() {
        let state = transition(Authenticating, AuthenticateNok).unwrap();
        assert_eq!(state, AuthenticationFailed);
        assert_eq!(transition(state, Authenticate), Some(Authenticating));
    }

    #[test]
    fn connect_failures_all_land_in_nok() {
        for event in [ConnectNok, ClientError, ClientClosed] {
            assert_eq!(transition(Connecting, event), Some(ConnectionNok));
        }
        assert_eq!(transition(ConnectionNok, Authenticate), Some(Authenticating));
    }

    #[test]
    fn ready_handles_teardown_and_refresh() {
        assert_eq!(transition(Ready, Disconnect), Some(Disconnected));
        assert_eq!(transition(Ready, ClientClosed), Some(Disconnected));
        assert_eq!(transition(Ready, LifecycleEvent::AuthUpdate), Some(LifecycleState::AuthUpdate));
    }

    #[test]
    fn auth_update_returns_to_ready_either_way() {
        assert_eq!(transition(LifecycleState::AuthUpdate, AuthUpdateOk), Some(Ready));
        assert_eq!(transition(LifecycleState::AuthUpdate, AuthUpdateNok), Some(Ready));
    }

    #[test]
    fn disconnected_is_restartable() {
        assert_eq!(transition(Disconnected, Authenticate), Some(Authenticating));
    }

    #[test]
    fn unlisted_events_are_ignored() {
        assert_eq!(transition(Idle, ConnectOk), None);
        assert_eq!(transition(Ready, Authenticate), None);
        assert_eq!(transition(Ready, ClientError), None);
        assert_eq!(transition(Authenticating, Disconnect), None);
        assert_eq!(transition(Connecting, Authenticate), None);
    }

    #[test]
    fn state_names_match_wire_logging() {
        assert_eq!(Idle.as_str(), "IDLE");
        assert_eq!(AuthenticationFailed.as_str(), "AUTHENTICATION_FAILED");
        assert_eq!(LifecycleState::AuthUpdate.as_str(), "AUTH_UPDATE");
    }
}
