//! RMI (remote management interface) request encoding and response parsing.
//!
//! RMI payloads are raw byte strings tunneled through `CnRmiRequest`
//! envelopes: an opcode byte, unit/subunit addressing, then typed fields.
//! The enumerations below are written to the wire verbatim and must keep
//! their values.

pub mod command;
pub mod value;

pub use command::{RmiResponse, parse_response};
pub use value::{ElementType, PropertyType, PropertyValue};

use crate::error::ComfoError;

/// Ventilation mode, written as a raw byte to the mode property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VentilationMode {
    Auto = 0xFF,
    Manual = 0x01,
}

impl TryFrom<u8> for VentilationMode {
    type Error = ComfoError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xFF => Ok(Self::Auto),
            0x01 => Ok(Self::Manual),
            _ => Err(ComfoError::ProtocolViolation("invalid ventilation mode")),
        }
    }
}

/// Fan speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum VentilationSpeed {
    Away = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl TryFrom<u8> for VentilationSpeed {
    type Error = ComfoError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Away),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            _ => Err(ComfoError::ProtocolViolation("invalid fan speed")),
        }
    }
}

/// Bypass damper mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BypassMode {
    Auto = 0x00,
    Off = 0x01,
    On = 0x02,
}

impl TryFrom<u8> for BypassMode {
    type Error = ComfoError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Auto),
            0x01 => Ok(Self::Off),
            0x02 => Ok(Self::On),
            _ => Err(ComfoError::ProtocolViolation("invalid bypass mode")),
        }
    }
}

/// Supply temperature profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TemperatureProfile {
    Warm = 0,
    Normal = 1,
    Cool = 2,
}

impl TryFrom<u8> for TemperatureProfile {
    type Error = ComfoError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Warm),
            1 => Ok(Self::Normal),
            2 => Ok(Self::Cool),
            _ => Err(ComfoError::ProtocolViolation("invalid temperature profile")),
        }
    }
}

/// Fan balance mode. Supply-only and exhaust-only are realized as an
/// override that parks the opposite fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceMode {
    Balance,
    SupplyOnly,
    ExhaustOnly,
}

/// ComfoCool attachment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComfoCoolMode {
    Auto = 0,
    Off = 1,
}

impl TryFrom<u8> for ComfoCoolMode {
    type Error = ComfoError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Auto),
            1 => Ok(Self::Off),
            _ => Err(ComfoError::ProtocolViolation("invalid ComfoCool mode")),
        }
    }
}
