//! Static sensor (RPDO) registry of the ComfoAir Q family.
//!
//! Pure data; the subscription manager consults this table to pick the
//! sample type for the bridge-side subscription and to decode notifications.

/// Sample type of a process-data object, with the code used in
/// `CnRpdoRequest.data_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SampleType {
    Boolean = 0,
    Unsigned8 = 1,
    Unsigned16 = 2,
    Unsigned32 = 3,
    Integer8 = 5,
    Integer16 = 6,
    Integer32 = 7,
    Integer64 = 8,
    /// Signed 8.8 fixed point.
    Fixed88 = 9,
    /// Seconds, unsigned 32-bit.
    Time = 16,
    /// Variable-length error bitmask.
    Error = 17,
}

impl SampleType {
    /// Wire code for the RPDO subscription request.
    pub fn wire_code(&self) -> u8 {
        *self as u8
    }

    /// Expected sample width in bytes; `None` for variable-length types.
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Unsigned8 | Self::Integer8 => Some(1),
            Self::Unsigned16 | Self::Integer16 | Self::Fixed88 => Some(2),
            Self::Unsigned32 | Self::Integer32 | Self::Time => Some(4),
            Self::Integer64 => Some(8),
            Self::Error => None,
        }
    }
}

/// One entry of the sensor registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorDefinition {
    pub id: u16,
    pub name: &'static str,
    /// Display unit; empty for dimensionless values.
    pub unit: &'static str,
    pub kind: SampleType,
    /// Multiplier applied to the decoded raw value.
    pub scale: f64,
    /// PDO zone; always 1 on this appliance family.
    pub zone: u8,
}

const fn sensor(
    id: u16,
    name: &'static str,
    unit: &'static str,
    kind: SampleType,
    scale: f64,
) -> SensorDefinition {
    SensorDefinition {
        id,
        name,
        unit,
        kind,
        scale,
        zone: 1,
    }
}

/// The sensor registry, sorted by id.
#[rustfmt::skip]
pub const SENSORS: &[SensorDefinition] = &[
    sensor(16,  "Away indicator",                            "",     SampleType::Unsigned8,  1.0),
    sensor(32,  "Device state",                              "",     SampleType::Unsigned8,  1.0),
    sensor(33,  "Filter change required",                    "",     SampleType::Boolean,    1.0),
    sensor(48,  "Heating period active",                     "",     SampleType::Boolean,    1.0),
    sensor(49,  "Operating mode",                            "",     SampleType::Integer8,   1.0),
    sensor(53,  "RMOT heating threshold",                    "°C",   SampleType::Integer16,  0.1),
    sensor(56,  "Ventilation mode",                          "",     SampleType::Unsigned8,  1.0),
    sensor(57,  "Supply fan enabled",                        "",     SampleType::Boolean,    1.0),
    sensor(58,  "Exhaust fan enabled",                       "",     SampleType::Boolean,    1.0),
    sensor(65,  "Fan speed setting",                         "",     SampleType::Unsigned8,  1.0),
    sensor(66,  "Bypass activation mode",                    "",     SampleType::Unsigned8,  1.0),
    sensor(67,  "Temperature profile setting",               "",     SampleType::Unsigned8,  1.0),
    sensor(70,  "Supply fan mode",                           "",     SampleType::Unsigned8,  1.0),
    sensor(71,  "Exhaust fan mode",                          "",     SampleType::Unsigned8,  1.0),
    sensor(81,  "Next fan speed change",                     "s",    SampleType::Time,       1.0),
    sensor(82,  "Next bypass change",                        "s",    SampleType::Time,       1.0),
    sensor(85,  "Supply fan override remaining",             "s",    SampleType::Time,       1.0),
    sensor(86,  "Exhaust fan override remaining",            "s",    SampleType::Time,       1.0),
    sensor(87,  "Away override remaining",                   "s",    SampleType::Time,       1.0),
    sensor(96,  "Bypass valve setpoint",                     "%",    SampleType::Unsigned8,  1.0),
    sensor(100, "Active errors",                             "",     SampleType::Error,      1.0),
    sensor(117, "Exhaust fan duty",                          "%",    SampleType::Unsigned8,  1.0),
    sensor(118, "Supply fan duty",                           "%",    SampleType::Unsigned8,  1.0),
    sensor(119, "Exhaust fan flow",                          "m³/h", SampleType::Unsigned16, 1.0),
    sensor(120, "Supply fan flow",                           "m³/h", SampleType::Unsigned16, 1.0),
    sensor(121, "Exhaust fan speed",                         "rpm",  SampleType::Unsigned16, 1.0),
    sensor(122, "Supply fan speed",                          "rpm",  SampleType::Unsigned16, 1.0),
    sensor(128, "Ventilation power consumption",             "W",    SampleType::Unsigned16, 1.0),
    sensor(129, "Energy consumption year to date",           "kWh",  SampleType::Unsigned16, 1.0),
    sensor(130, "Energy consumption since start",            "kWh",  SampleType::Unsigned16, 1.0),
    sensor(144, "Preheater energy year to date",             "kWh",  SampleType::Unsigned16, 1.0),
    sensor(145, "Preheater energy since start",              "kWh",  SampleType::Unsigned16, 1.0),
    sensor(146, "Preheater power consumption",               "W",    SampleType::Unsigned16, 1.0),
    sensor(176, "RF pairing mode",                           "",     SampleType::Unsigned8,  1.0),
    sensor(192, "Days until filter replacement",             "d",    SampleType::Unsigned16, 1.0),
    sensor(208, "Device temperature unit",                   "",     SampleType::Unsigned8,  1.0),
    sensor(209, "Running mean outdoor temperature",          "°C",   SampleType::Integer16,  0.1),
    sensor(210, "Frost protection active",                   "",     SampleType::Boolean,    1.0),
    sensor(211, "Frost protection preheater level",          "",     SampleType::Unsigned8,  1.0),
    sensor(212, "Target supply temperature",                 "°C",   SampleType::Integer16,  0.1),
    sensor(213, "Avoided heating power",                     "W",    SampleType::Unsigned16, 1.0),
    sensor(214, "Avoided heating year to date",              "kWh",  SampleType::Unsigned16, 1.0),
    sensor(215, "Avoided heating since start",               "kWh",  SampleType::Unsigned16, 1.0),
    sensor(216, "Avoided cooling power",                     "W",    SampleType::Unsigned16, 1.0),
    sensor(217, "Avoided cooling year to date",              "kWh",  SampleType::Unsigned16, 1.0),
    sensor(218, "Avoided cooling since start",               "kWh",  SampleType::Unsigned16, 1.0),
    sensor(220, "Supply air temperature before post-heater", "°C",   SampleType::Integer16,  0.1),
    sensor(221, "Supply air temperature",                    "°C",   SampleType::Integer16,  0.1),
    sensor(224, "Airflow constraints",                       "",     SampleType::Unsigned32, 1.0),
    sensor(226, "Fan speed override remaining",              "s",    SampleType::Time,       1.0),
    sensor(227, "Bypass state",                              "%",    SampleType::Unsigned8,  1.0),
    sensor(228, "Frost protection unbalance",                "%",    SampleType::Unsigned8,  1.0),
    sensor(274, "Extract air temperature",                   "°C",   SampleType::Integer16,  0.1),
    sensor(275, "Exhaust air temperature",                   "°C",   SampleType::Integer16,  0.1),
    sensor(276, "Outdoor air temperature",                   "°C",   SampleType::Integer16,  0.1),
    sensor(277, "Pre-heated outdoor air temperature",        "°C",   SampleType::Integer16,  0.1),
    sensor(278, "Post-heater supply temperature",            "°C",   SampleType::Integer16,  0.1),
    sensor(290, "Extract air humidity",                      "%",    SampleType::Unsigned8,  1.0),
    sensor(291, "Exhaust air humidity",                      "%",    SampleType::Unsigned8,  1.0),
    sensor(292, "Outdoor air humidity",                      "%",    SampleType::Unsigned8,  1.0),
    sensor(293, "Pre-heated outdoor air humidity",           "%",    SampleType::Unsigned8,  1.0),
    sensor(294, "Supply air humidity",                       "%",    SampleType::Unsigned8,  1.0),
    sensor(321, "Boost remaining",                           "s",    SampleType::Time,       1.0),
    sensor(337, "Away function state",                       "",     SampleType::Unsigned32, 1.0),
    sensor(338, "Bypass override state",                     "",     SampleType::Unsigned32, 1.0),
    sensor(345, "ComfoCool override remaining",              "s",    SampleType::Time,       1.0),
    sensor(369, "Analog input 1",                            "V",    SampleType::Fixed88,    1.0),
    sensor(370, "Analog input 2",                            "V",    SampleType::Fixed88,    1.0),
    sensor(371, "Analog input 3",                            "V",    SampleType::Fixed88,    1.0),
    sensor(372, "Analog input 4",                            "V",    SampleType::Fixed88,    1.0),
    sensor(384, "ComfoCool state",                           "",     SampleType::Unsigned8,  1.0),
    sensor(385, "ComfoCool condenser temperature",           "°C",   SampleType::Integer16,  0.1),
    sensor(386, "ComfoCool compressor active",               "",     SampleType::Boolean,    1.0),
    sensor(387, "ComfoCool outlet temperature",              "°C",   SampleType::Integer16,  0.1),
    sensor(400, "Post-heater present",                       "",     SampleType::Boolean,    1.0),
    sensor(402, "Post-heater state",                         "",     SampleType::Unsigned8,  1.0),
    sensor(416, "ComfoFond outdoor temperature",             "°C",   SampleType::Integer16,  0.1),
    sensor(417, "ComfoFond ground temperature",              "°C",   SampleType::Integer16,  0.1),
    sensor(418, "ComfoFond pump duty",                       "%",    SampleType::Unsigned8,  1.0),
    sensor(432, "Supply pressure",                           "Pa",   SampleType::Unsigned16, 0.1),
    sensor(433, "Exhaust pressure",                          "Pa",   SampleType::Unsigned16, 0.1),
    sensor(448, "Cooker hood state",                         "",     SampleType::Unsigned8,  1.0),
    sensor(449, "Cooker hood speed",                         "",     SampleType::Unsigned8,  1.0),
    sensor(450, "Cooker hood temperature",                   "°C",   SampleType::Integer16,  0.1),
];

/// Looks up a sensor definition by id.
pub fn lookup(id: u16) -> Option<&'static SensorDefinition> {
    SENSORS
        .binary_search_by_key(&id, |s| s.id)
        .ok()
        .map(|idx| &SENSORS[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in SENSORS.windows(2) {
            assert!(pair[0].id < pair[1].id, "sensor table must stay sorted");
        }
    }

    #[test]
    fn test_lookup() {
        let outdoor = lookup(276).unwrap();
        assert_eq!(outdoor.name, "Outdoor air temperature");
        assert_eq!(outdoor.kind, SampleType::Integer16);
        assert_eq!(outdoor.scale, 0.1);
        assert_eq!(outdoor.zone, 1);

        assert!(lookup(9999).is_none());
    }

    #[test]
    fn test_sample_widths() {
        assert_eq!(SampleType::Boolean.width(), Some(1));
        assert_eq!(SampleType::Fixed88.width(), Some(2));
        assert_eq!(SampleType::Integer64.width(), Some(8));
        assert_eq!(SampleType::Error.width(), None);
    }
}
