use core::fmt;
use core::str::FromStr;

// --- Protocol Constants ---

/// TCP port of the bridge's session endpoint, and UDP port of its
/// discovery responder.
pub const C_BRIDGE_PORT: u16 = 56747;

/// Maximum accepted size for a single length-prefixed wire segment.
pub const C_MAX_SEGMENT: usize = 1 << 20;

/// Minimum encoded size of a valid envelope: two 16-byte uuid fields plus
/// the operation field, each with a protobuf key byte.
pub const C_MIN_ENVELOPE: usize = 38;

/// Zone selector used for all RPDO subscriptions on this appliance family.
pub const C_PDO_ZONE: u8 = 1;

/// Offset of the appliance epoch (2000-01-01T00:00:00Z) from the Unix epoch,
/// in seconds. RMI timestamps and `CnTime` values count from it.
pub const C_EPOCH_OFFSET: i64 = 946_684_800;

/// Error type for invalid uuid text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UuidError {
    /// The string is not exactly 32 hexadecimal digits.
    InvalidFormat,
}

impl fmt::Display for UuidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "uuid must be 32 hexadecimal digits"),
        }
    }
}

impl std::error::Error for UuidError {}

/// 16-byte identifier of an application or bridge.
///
/// The bridge does not use RFC 4122 uuids; both sides exchange opaque
/// 16-byte strings. The client may pick its local uuid freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceUuid(pub [u8; 16]);

impl DeviceUuid {
    pub const LEN: usize = 16;

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        DeviceUuid(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Parses a uuid from a slice, which must be exactly 16 bytes long.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; 16]>::try_from(slice).ok().map(DeviceUuid)
    }
}

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for DeviceUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.is_ascii() {
            return Err(UuidError::InvalidFormat);
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in s.as_bytes().chunks_exact(2).enumerate() {
            let hex = core::str::from_utf8(chunk).map_err(|_| UuidError::InvalidFormat)?;
            bytes[i] = u8::from_str_radix(hex, 16).map_err(|_| UuidError::InvalidFormat)?;
        }
        Ok(DeviceUuid(bytes))
    }
}
