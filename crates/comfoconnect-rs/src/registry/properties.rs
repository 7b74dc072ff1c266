//! Static registry of RMI-addressable device properties.

use crate::rmi::value::PropertyType;

// --- Unit ids of the ventilation unit's internal subsystems ---

pub const UNIT_NODE: u8 = 0x01;
pub const UNIT_COMFOBUS: u8 = 0x02;
pub const UNIT_ERROR: u8 = 0x03;
pub const UNIT_SCHEDULE: u8 = 0x15;
pub const UNIT_VALVE: u8 = 0x16;
pub const UNIT_FAN: u8 = 0x17;
pub const UNIT_POWERSENSOR: u8 = 0x18;
pub const UNIT_PREHEATER: u8 = 0x19;
pub const UNIT_HMI: u8 = 0x1A;
pub const UNIT_RFCOMMUNICATION: u8 = 0x1B;
pub const UNIT_FILTER: u8 = 0x1C;
pub const UNIT_TEMPHUMCONTROL: u8 = 0x1D;
pub const UNIT_VENTILATIONCONFIG: u8 = 0x1E;
pub const UNIT_NODECONFIGURATION: u8 = 0x20;
pub const UNIT_TEMPERATURESENSOR: u8 = 0x21;
pub const UNIT_HUMIDITYSENSOR: u8 = 0x22;
pub const UNIT_PRESSURESENSOR: u8 = 0x24;
pub const UNIT_PERIPHERALS: u8 = 0x25;
pub const UNIT_ANALOGINPUT: u8 = 0x26;
pub const UNIT_COOKERHOOD: u8 = 0x27;
pub const UNIT_POSTHEATER: u8 = 0x28;
pub const UNIT_COMFOFOND: u8 = 0x29;

/// Address and wire type of one device property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub unit: u8,
    pub subunit: u8,
    pub id: u16,
    pub kind: PropertyType,
}

const fn property(unit: u8, subunit: u8, id: u16, kind: PropertyType) -> PropertyDescriptor {
    PropertyDescriptor {
        unit,
        subunit,
        id,
        kind,
    }
}

// --- Node identity ---

pub const PROPERTY_SERIAL_NUMBER: PropertyDescriptor =
    property(UNIT_NODE, 0x01, 4, PropertyType::CString);
pub const PROPERTY_FIRMWARE_VERSION: PropertyDescriptor =
    property(UNIT_NODE, 0x01, 6, PropertyType::Unsigned32);
pub const PROPERTY_MODEL: PropertyDescriptor =
    property(UNIT_NODE, 0x01, 8, PropertyType::CString);
pub const PROPERTY_ARTICLE_NUMBER: PropertyDescriptor =
    property(UNIT_NODE, 0x01, 11, PropertyType::CString);
pub const PROPERTY_COUNTRY: PropertyDescriptor =
    property(UNIT_NODE, 0x01, 13, PropertyType::CString);
pub const PROPERTY_DEVICE_NAME: PropertyDescriptor =
    property(UNIT_NODE, 0x01, 20, PropertyType::CString);

// --- Ventilation configuration ---

/// Raw mode byte: 0xFF automatic, 0x01 manual.
pub const PROPERTY_VENTILATION_MODE: PropertyDescriptor =
    property(UNIT_VENTILATIONCONFIG, 0x01, 8, PropertyType::Unsigned8);
pub const PROPERTY_TEMPERATURE_PROFILE: PropertyDescriptor =
    property(UNIT_VENTILATIONCONFIG, 0x01, 3, PropertyType::Unsigned8);
pub const PROPERTY_SENSOR_VENTMODE_TEMPERATURE_PASSIVE: PropertyDescriptor =
    property(UNIT_VENTILATIONCONFIG, 0x01, 4, PropertyType::Boolean);
pub const PROPERTY_SENSOR_VENTMODE_HUMIDITY_COMFORT: PropertyDescriptor =
    property(UNIT_VENTILATIONCONFIG, 0x01, 6, PropertyType::Boolean);
pub const PROPERTY_SENSOR_VENTMODE_HUMIDITY_PROTECTION: PropertyDescriptor =
    property(UNIT_VENTILATIONCONFIG, 0x01, 7, PropertyType::Boolean);
pub const PROPERTY_PASSIVE_TEMPERATURE_TARGET: PropertyDescriptor =
    property(UNIT_VENTILATIONCONFIG, 0x01, 10, PropertyType::Fixed88);

// --- Temperature and humidity control ---

pub const PROPERTY_RMOT_COOL_LIMIT: PropertyDescriptor =
    property(UNIT_TEMPHUMCONTROL, 0x01, 2, PropertyType::Integer16);
pub const PROPERTY_RMOT_WARM_LIMIT: PropertyDescriptor =
    property(UNIT_TEMPHUMCONTROL, 0x01, 3, PropertyType::Integer16);

// --- Filters ---

pub const PROPERTY_FILTER_DURATION: PropertyDescriptor =
    property(UNIT_FILTER, 0x01, 2, PropertyType::Unsigned16);

// --- Maintenance ---

pub const PROPERTY_MAINTAINER_PASSWORD: PropertyDescriptor =
    property(UNIT_NODECONFIGURATION, 0x01, 3, PropertyType::CString);
pub const PROPERTY_INSTALLATION_DATE: PropertyDescriptor =
    property(UNIT_NODECONFIGURATION, 0x01, 4, PropertyType::Timestamp);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_addressing() {
        assert_eq!(PROPERTY_SERIAL_NUMBER.unit, UNIT_NODE);
        assert_eq!(PROPERTY_SERIAL_NUMBER.id, 4);
        assert_eq!(PROPERTY_VENTILATION_MODE.unit, UNIT_VENTILATIONCONFIG);
        assert_eq!(PROPERTY_VENTILATION_MODE.kind, PropertyType::Unsigned8);
    }
}
