//! Protobuf messages exchanged with the bridge.
//!
//! The structs are hand-derived with `prost` rather than generated from a
//! `.proto` file; the schema is small and stable. The envelope carries
//! addressing, the operation discriminant and the correlation reference;
//! the operation selects which inner message governs the payload segment.

use prost::Message;

use crate::error::ComfoError;

/// Operation discriminant of an envelope. Requests occupy 1..=43, confirms
/// 51..=68, unsolicited traffic 100 and up, matching the appliance numbering.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum OperationType {
    NoOperation = 0,
    RegisterAppRequest = 2,
    StartSessionRequest = 3,
    CloseSessionRequest = 4,
    ListRegisteredAppsRequest = 5,
    DeregisterAppRequest = 6,
    ChangePinRequest = 7,
    VersionRequest = 18,
    CnTimeRequest = 30,
    CnTimeConfirm = 31,
    CnNodeNotification = 32,
    CnRmiRequest = 33,
    CnRmiResponse = 34,
    CnRmiAsyncRequest = 35,
    CnRmiAsyncConfirm = 36,
    CnRmiAsyncResponse = 37,
    CnRpdoRequest = 38,
    CnRpdoConfirm = 39,
    CnRpdoNotification = 40,
    CnAlarmNotification = 41,
    CloseSessionNotification = 42,
    RegisterAppConfirm = 52,
    StartSessionConfirm = 53,
    CloseSessionConfirm = 54,
    ListRegisteredAppsConfirm = 55,
    DeregisterAppConfirm = 56,
    ChangePinConfirm = 57,
    VersionConfirm = 68,
    GatewayNotification = 100,
    KeepAlive = 101,
    FactoryReset = 102,
}

/// Status the bridge attaches to confirms.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum GatewayResult {
    Ok = 0,
    BadRequest = 1,
    InternalError = 2,
    NotReachable = 3,
    OtherSession = 4,
    NotAllowed = 5,
    NoResources = 6,
    NotExist = 7,
    TooMany = 8,
}

/// Returns the single confirm operation expected for a request, or `None`
/// for fire-and-forget and unsolicited operations.
pub fn expected_reply(op: OperationType) -> Option<OperationType> {
    match op {
        OperationType::RegisterAppRequest => Some(OperationType::RegisterAppConfirm),
        OperationType::StartSessionRequest => Some(OperationType::StartSessionConfirm),
        OperationType::CloseSessionRequest => Some(OperationType::CloseSessionConfirm),
        OperationType::ListRegisteredAppsRequest => {
            Some(OperationType::ListRegisteredAppsConfirm)
        }
        OperationType::DeregisterAppRequest => Some(OperationType::DeregisterAppConfirm),
        OperationType::ChangePinRequest => Some(OperationType::ChangePinConfirm),
        OperationType::VersionRequest => Some(OperationType::VersionConfirm),
        OperationType::CnTimeRequest => Some(OperationType::CnTimeConfirm),
        OperationType::CnRmiRequest => Some(OperationType::CnRmiResponse),
        OperationType::CnRmiAsyncRequest => Some(OperationType::CnRmiAsyncConfirm),
        OperationType::CnRpdoRequest => Some(OperationType::CnRpdoConfirm),
        _ => None,
    }
}

/// Outer message of every framed exchange.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    /// 16-byte uuid of the sender.
    #[prost(bytes = "vec", tag = "1")]
    pub src: Vec<u8>,
    /// 16-byte uuid of the receiver.
    #[prost(bytes = "vec", tag = "2")]
    pub dst: Vec<u8>,
    #[prost(enumeration = "OperationType", tag = "3")]
    pub operation: i32,
    /// Correlation reference; absent on keepalives and notifications.
    #[prost(uint32, optional, tag = "4")]
    pub reference: Option<u32>,
    /// Gateway status; only meaningful on confirms.
    #[prost(enumeration = "GatewayResult", optional, tag = "5")]
    pub result: Option<i32>,
}

impl Envelope {
    /// The operation, or an error for values this client does not know.
    /// (The derived `operation()` getter silently maps those to
    /// `NoOperation`, which the read loop must not do.)
    pub fn op(&self) -> Result<OperationType, ComfoError> {
        OperationType::try_from(self.operation)
            .map_err(|_| ComfoError::ProtocolViolation("unknown operation type"))
    }

    /// Gateway status of a confirm; `Ok` when the field is absent or holds
    /// an out-of-range value (benign per the appliance behavior).
    pub fn gateway_result(&self) -> GatewayResult {
        self.result
            .and_then(|raw| GatewayResult::try_from(raw).ok())
            .unwrap_or(GatewayResult::Ok)
    }
}

// --- Discovery ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchGateway {}

/// Discovery probe; encodes to the constant two bytes `0a 00`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchGatewayRequest {
    #[prost(message, optional, tag = "1")]
    pub search: Option<SearchGateway>,
}

/// The fixed probe datagram broadcast on the discovery port.
pub const SEARCH_PROBE: &[u8] = &[0x0a, 0x00];

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchGatewayResponse {
    #[prost(string, tag = "1")]
    pub ipaddress: String,
    #[prost(bytes = "vec", tag = "2")]
    pub uuid: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub version: u32,
}

// --- Session management ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartSessionRequest {
    /// Take the session over from another connected app.
    #[prost(bool, tag = "1")]
    pub takeover: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartSessionConfirm {
    #[prost(string, tag = "1")]
    pub device_name: String,
    #[prost(bool, tag = "2")]
    pub resumed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloseSessionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloseSessionConfirm {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CloseSessionNotification {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeepAlive {}

// --- App registration ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterAppRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub uuid: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub pin: u32,
    #[prost(string, tag = "3")]
    pub device_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterAppConfirm {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeregisterAppRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub uuid: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeregisterAppConfirm {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisteredApp {
    #[prost(bytes = "vec", tag = "1")]
    pub uuid: Vec<u8>,
    #[prost(string, tag = "2")]
    pub device_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListRegisteredAppsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListRegisteredAppsConfirm {
    #[prost(message, repeated, tag = "1")]
    pub apps: Vec<RegisteredApp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChangePinRequest {
    #[prost(uint32, tag = "1")]
    pub old_pin: u32,
    #[prost(uint32, tag = "2")]
    pub new_pin: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChangePinConfirm {}

// --- Bridge queries ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VersionConfirm {
    #[prost(uint32, tag = "1")]
    pub gateway_version: u32,
    #[prost(string, tag = "2")]
    pub serial_number: String,
    #[prost(uint32, tag = "3")]
    pub comfonet_version: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnTimeRequest {
    /// When present, sets the unit clock (seconds since 2000-01-01 UTC).
    #[prost(uint32, optional, tag = "1")]
    pub set_time: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnTimeConfirm {
    #[prost(uint32, tag = "1")]
    pub current_time: u32,
}

// --- RMI ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRmiRequest {
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
}

/// The message bytes carry the RMI status in the first position.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRmiResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRmiAsyncRequest {
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRmiAsyncConfirm {
    #[prost(uint32, tag = "1")]
    pub result: u32,
}

/// Unlike the synchronous response, the RMI status is carried in `result`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRmiAsyncResponse {
    #[prost(uint32, tag = "1")]
    pub result: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
}

// --- RPDO ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRpdoRequest {
    #[prost(uint32, tag = "1")]
    pub pdid: u32,
    #[prost(uint32, tag = "2")]
    pub zone: u32,
    #[prost(uint32, tag = "3")]
    pub data_type: u32,
    /// Seconds; -1 keeps the subscription until cancelled, 0 cancels it.
    #[prost(sint32, tag = "4")]
    pub timeout: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRpdoConfirm {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnRpdoNotification {
    #[prost(uint32, tag = "1")]
    pub pdid: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

// --- Unsolicited notifications ---

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnNodeNotification {
    #[prost(uint32, tag = "1")]
    pub node_id: u32,
    #[prost(uint32, tag = "2")]
    pub product_id: u32,
    #[prost(uint32, tag = "3")]
    pub zone_id: u32,
    #[prost(uint32, tag = "4")]
    pub mode: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CnAlarmNotification {
    #[prost(uint32, tag = "1")]
    pub zone: u32,
    #[prost(uint32, tag = "2")]
    pub product_id: u32,
    #[prost(uint32, tag = "3")]
    pub product_variant: u32,
    #[prost(string, tag = "4")]
    pub serial_number: String,
    #[prost(uint32, tag = "5")]
    pub sw_program_version: u32,
    /// Bitmask of active error codes, one byte per error register.
    #[prost(bytes = "vec", tag = "6")]
    pub errors: Vec<u8>,
    #[prost(uint32, tag = "7")]
    pub error_id: u32,
    #[prost(uint32, tag = "8")]
    pub node_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GatewayNotification {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub push_uuids: Vec<Vec<u8>>,
}

/// Encodes an inner message to its payload segment bytes.
pub fn encode_payload<M: Message>(msg: &M) -> Vec<u8> {
    msg.encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_probe_matches_encoding() {
        let probe = SearchGatewayRequest {
            search: Some(SearchGateway {}),
        };
        assert_eq!(encode_payload(&probe), SEARCH_PROBE);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = Envelope {
            src: vec![0x11; 16],
            dst: vec![0x22; 16],
            operation: OperationType::CnRmiRequest as i32,
            reference: Some(42),
            result: None,
        };
        let bytes = encode_payload(&envelope);
        let decoded = Envelope::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.op().unwrap(), OperationType::CnRmiRequest);
        assert_eq!(decoded.gateway_result(), GatewayResult::Ok);
    }

    #[test]
    fn test_expected_reply_table() {
        assert_eq!(
            expected_reply(OperationType::StartSessionRequest),
            Some(OperationType::StartSessionConfirm)
        );
        assert_eq!(
            expected_reply(OperationType::CnRmiRequest),
            Some(OperationType::CnRmiResponse)
        );
        assert_eq!(
            expected_reply(OperationType::CnRpdoRequest),
            Some(OperationType::CnRpdoConfirm)
        );
        assert_eq!(expected_reply(OperationType::KeepAlive), None);
        assert_eq!(expected_reply(OperationType::CnRpdoNotification), None);
    }

    #[test]
    fn test_unknown_operation_is_a_protocol_violation() {
        let envelope = Envelope {
            src: vec![0x11; 16],
            dst: vec![0x22; 16],
            operation: 9999,
            reference: None,
            result: None,
        };
        assert!(envelope.op().is_err());
    }
}
