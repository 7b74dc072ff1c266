use core::fmt;

use crate::proto::GatewayResult;

/// Defines a single, descriptive error type for the whole client stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComfoError {
    /// TCP connect to the bridge failed or timed out.
    NotReachable,
    /// The bridge rejected `StartSession` with `NotAllowed` and no pin was
    /// provided to register with.
    NotRegistered,
    /// `RegisterApp` was rejected by the bridge.
    BadPin,
    /// `connect` was called while the session was not `Disconnected`.
    AlreadyConnected,
    /// An operation was attempted outside `SessionOpen`.
    NotOpen,
    /// The per-request deadline elapsed before a reply arrived.
    Timeout,
    /// The session was torn down while the request was in flight.
    SessionClosed,
    /// The peer violated the protocol (mismatched reply type, undersized
    /// envelope, malformed protobuf).
    ProtocolViolation(&'static str),
    /// An RMI response carried a non-zero status byte, preserved verbatim.
    RmiError(u8),
    /// The bridge refused a request with the given gateway status.
    Refused(GatewayResult),
    /// A sensor sample was shorter than its sample type requires.
    DecodeError,
    /// The caller cancelled the operation.
    Cancelled,
    /// The sensor id is not in the sensor registry.
    UnknownSensor(u16),
    /// A wire segment announced a length above the accepted ceiling.
    FrameTooLarge(usize),
    /// The stream ended in the middle of a message.
    ShortRead,
    /// The peer closed the connection at a message boundary.
    PeerClosed,
    /// No usable (non-loopback IPv4) network interface was found.
    NoInterfaces,
    /// A UDP socket operation failed during discovery.
    SocketError,
    /// An underlying I/O error occurred.
    Io(std::io::ErrorKind),
}

impl fmt::Display for ComfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReachable => write!(f, "bridge is not reachable"),
            Self::NotRegistered => write!(f, "app is not registered with the bridge"),
            Self::BadPin => write!(f, "bridge rejected the registration pin"),
            Self::AlreadyConnected => write!(f, "session is already connected"),
            Self::NotOpen => write!(f, "session is not open"),
            Self::Timeout => write!(f, "request deadline elapsed"),
            Self::SessionClosed => write!(f, "session closed while request was in flight"),
            Self::ProtocolViolation(s) => write!(f, "protocol violation: {}", s),
            Self::RmiError(status) => write!(f, "RMI error status {:#04x}", status),
            Self::Refused(result) => write!(f, "bridge refused request: {:?}", result),
            Self::DecodeError => write!(f, "sensor sample too short for its type"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::UnknownSensor(id) => write!(f, "unknown sensor id {}", id),
            Self::FrameTooLarge(len) => write!(f, "frame of {} bytes exceeds the ceiling", len),
            Self::ShortRead => write!(f, "stream ended mid-message"),
            Self::PeerClosed => write!(f, "peer closed the connection"),
            Self::NoInterfaces => write!(f, "no usable network interface"),
            Self::SocketError => write!(f, "discovery socket error"),
            Self::Io(kind) => write!(f, "I/O error: {}", kind),
        }
    }
}

impl std::error::Error for ComfoError {}

// --- From Implementations for Error Conversion ---

impl From<std::io::Error> for ComfoError {
    fn from(err: std::io::Error) -> Self {
        ComfoError::Io(err.kind())
    }
}

impl From<prost::DecodeError> for ComfoError {
    fn from(_: prost::DecodeError) -> Self {
        ComfoError::ProtocolViolation("malformed protobuf")
    }
}

impl ComfoError {
    /// Maps a non-OK gateway status on a correlated confirm to the error the
    /// caller should see. `StartSessionConfirm` and `RegisterAppConfirm`
    /// give `NotAllowed` a more specific meaning during the handshake.
    pub(crate) fn from_gateway_result(
        result: GatewayResult,
        op: crate::proto::OperationType,
    ) -> Self {
        use crate::proto::OperationType;
        match (op, result) {
            (OperationType::StartSessionConfirm, GatewayResult::NotAllowed) => {
                ComfoError::NotRegistered
            }
            (OperationType::RegisterAppConfirm, GatewayResult::NotAllowed) => ComfoError::BadPin,
            (_, result) => ComfoError::Refused(result),
        }
    }
}
