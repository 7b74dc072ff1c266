//! RMI request builders and response parsing.
//!
//! Byte layouts follow the appliance's RMI documentation. A property is
//! addressed by `(unit, subunit, property id)`; schedule overrides live on
//! the schedule unit and are addressed by a per-function subunit. An
//! override is either untimed (holds until cleared) or timed, carrying a
//! signed 32-bit LE timeout in seconds where -1 means "until cleared".

use crate::error::ComfoError;
use crate::rmi::value::PropertyValue;

// Opcodes.
pub const OP_PROPERTY_READ: u8 = 0x01;
pub const OP_PROPERTY_WRITE: u8 = 0x03;
pub const OP_OVERRIDE_GET: u8 = 0x83;
pub const OP_OVERRIDE_SET: u8 = 0x84;
pub const OP_OVERRIDE_CLEAR: u8 = 0x85;

/// Sub-opcode selecting property access by 16-bit id.
const PROPERTY_BY_ID: u8 = 0x10;

/// Discriminator for a timed override entry.
const OVERRIDE_TIMED: u8 = 0x06;

/// Node address of the ventilation unit itself.
pub const NODE_UNIT: u8 = 0x01;

/// The schedule unit hosting override subunits.
pub const UNIT_SCHEDULE: u8 = 0x15;

// Override subunits on the schedule unit.
pub const SUBUNIT_FAN_SPEED: u8 = 0x01;
pub const SUBUNIT_BYPASS: u8 = 0x02;
pub const SUBUNIT_TEMPERATURE_PROFILE: u8 = 0x03;
pub const SUBUNIT_SUPPLY_FAN: u8 = 0x05;
pub const SUBUNIT_EXHAUST_FAN: u8 = 0x06;
pub const SUBUNIT_COMFOCOOL: u8 = 0x0A;
pub const SUBUNIT_AWAY: u8 = 0x0B;

/// Timeout value keeping an override active until it is cleared.
pub const TIMEOUT_INDEFINITE: i32 = -1;

/// Builds a property read: `[0x01, unit, subunit, 0x10, id lo, id hi]`.
pub fn property_read(unit: u8, subunit: u8, property_id: u16) -> Vec<u8> {
    let id = property_id.to_le_bytes();
    vec![OP_PROPERTY_READ, unit, subunit, PROPERTY_BY_ID, id[0], id[1]]
}

/// Builds a property write: the read layout plus the encoded value.
pub fn property_write(unit: u8, subunit: u8, property_id: u16, value: &PropertyValue) -> Vec<u8> {
    let id = property_id.to_le_bytes();
    let mut buf = vec![OP_PROPERTY_WRITE, unit, subunit, PROPERTY_BY_ID, id[0], id[1]];
    buf.extend_from_slice(&value.encode());
    buf
}

/// Builds an override state query for a schedule subunit.
pub fn override_get(subunit: u8) -> Vec<u8> {
    vec![OP_OVERRIDE_GET, UNIT_SCHEDULE, subunit]
}

/// Builds an untimed override: `[0x84, 0x15, subunit, value...]`.
pub fn override_set(subunit: u8, value: &[u8]) -> Vec<u8> {
    let mut buf = vec![OP_OVERRIDE_SET, UNIT_SCHEDULE, subunit];
    buf.extend_from_slice(value);
    buf
}

/// Builds a timed override:
/// `[0x84, 0x15, subunit, 0x06, timeout i32 LE, value...]`.
pub fn override_set_timed(subunit: u8, timeout_secs: i32, value: &[u8]) -> Vec<u8> {
    let mut buf = vec![OP_OVERRIDE_SET, UNIT_SCHEDULE, subunit, OVERRIDE_TIMED];
    buf.extend_from_slice(&timeout_secs.to_le_bytes());
    buf.extend_from_slice(value);
    buf
}

/// Builds an override clear for a schedule subunit.
pub fn override_clear(subunit: u8) -> Vec<u8> {
    vec![OP_OVERRIDE_CLEAR, UNIT_SCHEDULE, subunit]
}

/// A parsed RMI response body (the bytes after the status byte).
pub type RmiResponse = Vec<u8>;

/// Splits the leading status byte off an RMI response.
///
/// Status `0x00` is success; anything else is surfaced verbatim as
/// [`ComfoError::RmiError`]. An empty response is success with no data,
/// which some action invocations produce.
pub fn parse_response(message: &[u8]) -> Result<RmiResponse, ComfoError> {
    match message.split_first() {
        None => Ok(Vec::new()),
        Some((0x00, rest)) => Ok(rest.to_vec()),
        Some((&status, _)) => Err(ComfoError::RmiError(status)),
    }
}
