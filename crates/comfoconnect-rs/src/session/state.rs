use core::fmt;

/// Lifecycle state of a bridge session.
///
/// Only `SessionOpen` permits RMI and PDO operations; every public session
/// method guards on this at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport. The initial and final state.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// Transport up, waiting for `StartSessionConfirm`.
    AwaitingStart,
    /// `StartSession` was refused with `NotAllowed`; registering the app.
    Registering,
    /// The bridge accepted the session.
    SessionOpen,
    /// Ordered teardown in progress.
    Closing,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::SessionOpen)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::AwaitingStart => "AwaitingStart",
            Self::Registering => "Registering",
            Self::SessionOpen => "SessionOpen",
            Self::Closing => "Closing",
        };
        f.write_str(name)
    }
}
