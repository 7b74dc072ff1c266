//! High-level facade over a bridge session.
//!
//! Every method here is a thin composition: look up a property descriptor
//! or an override subunit, build the RMI byte string, send it through the
//! session and decode the answer. Nothing below this layer knows about
//! ventilation semantics.

use log::debug;

use crate::discovery::BridgeEndpoint;
use crate::error::ComfoError;
use crate::pdo::SensorUpdate;
use crate::registry::properties::{
    self, PROPERTY_SENSOR_VENTMODE_HUMIDITY_COMFORT, PROPERTY_SENSOR_VENTMODE_HUMIDITY_PROTECTION,
    PROPERTY_SENSOR_VENTMODE_TEMPERATURE_PASSIVE, PROPERTY_VENTILATION_MODE,
};
use crate::rmi::command::{
    self, NODE_UNIT, SUBUNIT_AWAY, SUBUNIT_BYPASS, SUBUNIT_COMFOCOOL, SUBUNIT_EXHAUST_FAN,
    SUBUNIT_FAN_SPEED, SUBUNIT_SUPPLY_FAN, SUBUNIT_TEMPERATURE_PROFILE,
};
use crate::rmi::{
    BalanceMode, BypassMode, ComfoCoolMode, PropertyValue, TemperatureProfile, VentilationMode,
    VentilationSpeed,
};
use crate::session::{Bridge, BridgeEvent};
use crate::types::{C_EPOCH_OFFSET, DeviceUuid};
use crate::util::version_decode;

/// Version report of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeVersion {
    pub gateway_version: String,
    pub serial_number: String,
    pub comfonet_version: String,
}

/// A connected ComfoAir Q unit behind a ComfoConnect LAN C bridge.
pub struct ComfoConnect {
    bridge: Bridge,
}

impl ComfoConnect {
    pub fn new(endpoint: BridgeEndpoint, local_uuid: DeviceUuid) -> Self {
        ComfoConnect {
            bridge: Bridge::new(endpoint, local_uuid),
        }
    }

    pub fn with_device_name(
        endpoint: BridgeEndpoint,
        local_uuid: DeviceUuid,
        device_name: &str,
    ) -> Self {
        ComfoConnect {
            bridge: Bridge::with_device_name(endpoint, local_uuid, device_name),
        }
    }

    /// The underlying session, for low-level commands.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub async fn connect(&self, pin: Option<u32>) -> Result<(), ComfoError> {
        self.bridge.connect(pin).await
    }

    pub async fn disconnect(&self) {
        self.bridge.disconnect().await
    }

    pub fn events(&self) -> tokio::sync::mpsc::UnboundedReceiver<BridgeEvent> {
        self.bridge.events()
    }

    pub async fn register_sensor(
        &self,
        sensor_id: u16,
    ) -> Result<tokio::sync::mpsc::UnboundedReceiver<SensorUpdate>, ComfoError> {
        self.bridge.register_sensor(sensor_id).await
    }

    pub async fn deregister_sensor(&self, sensor_id: u16) -> Result<(), ComfoError> {
        self.bridge.deregister_sensor(sensor_id).await
    }

    // --- Typed property access ---

    pub async fn get_property(
        &self,
        descriptor: &properties::PropertyDescriptor,
    ) -> Result<PropertyValue, ComfoError> {
        let request = command::property_read(descriptor.unit, descriptor.subunit, descriptor.id);
        let body = self.bridge.rmi(NODE_UNIT, request).await?;
        PropertyValue::decode(&body, descriptor.kind)
    }

    pub async fn set_property(
        &self,
        descriptor: &properties::PropertyDescriptor,
        value: &PropertyValue,
    ) -> Result<(), ComfoError> {
        let request =
            command::property_write(descriptor.unit, descriptor.subunit, descriptor.id, value);
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    // --- Ventilation mode ---

    pub async fn get_mode(&self) -> Result<VentilationMode, ComfoError> {
        match self.get_property(&PROPERTY_VENTILATION_MODE).await? {
            PropertyValue::Unsigned8(raw) => VentilationMode::try_from(raw),
            _ => Err(ComfoError::DecodeError),
        }
    }

    pub async fn set_mode(&self, mode: VentilationMode) -> Result<(), ComfoError> {
        debug!("[UNIT] Setting ventilation mode {:?}", mode);
        self.set_property(
            &PROPERTY_VENTILATION_MODE,
            &PropertyValue::Unsigned8(mode as u8),
        )
        .await
    }

    // --- Fan speed, boost and away ---

    pub async fn get_speed(&self) -> Result<VentilationSpeed, ComfoError> {
        let (_, value) = self.override_state(SUBUNIT_FAN_SPEED).await?;
        VentilationSpeed::try_from(first_byte(&value)?)
    }

    pub async fn set_speed(&self, speed: VentilationSpeed) -> Result<(), ComfoError> {
        debug!("[UNIT] Setting fan speed {:?}", speed);
        let request = command::override_set(SUBUNIT_FAN_SPEED, &[speed as u8]);
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    /// Boost is a timed high-speed override on the fan speed subunit.
    pub async fn get_boost(&self) -> Result<bool, ComfoError> {
        let (active, value) = self.override_state(SUBUNIT_FAN_SPEED).await?;
        Ok(active && first_byte(&value)? == VentilationSpeed::High as u8)
    }

    pub async fn set_boost(&self, enable: bool, timeout_secs: i32) -> Result<(), ComfoError> {
        let request = if enable {
            command::override_set_timed(
                SUBUNIT_FAN_SPEED,
                timeout_secs,
                &[VentilationSpeed::High as u8],
            )
        } else {
            command::override_clear(SUBUNIT_FAN_SPEED)
        };
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    pub async fn get_away(&self) -> Result<bool, ComfoError> {
        let (active, _) = self.override_state(SUBUNIT_AWAY).await?;
        Ok(active)
    }

    pub async fn set_away(&self, enable: bool, timeout_secs: i32) -> Result<(), ComfoError> {
        let request = if enable {
            command::override_set_timed(SUBUNIT_AWAY, timeout_secs, &[0x01])
        } else {
            command::override_clear(SUBUNIT_AWAY)
        };
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    // --- Bypass ---

    pub async fn get_bypass(&self) -> Result<BypassMode, ComfoError> {
        let (active, value) = self.override_state(SUBUNIT_BYPASS).await?;
        if !active {
            return Ok(BypassMode::Auto);
        }
        BypassMode::try_from(first_byte(&value)?)
    }

    pub async fn set_bypass(
        &self,
        mode: BypassMode,
        timeout_secs: i32,
    ) -> Result<(), ComfoError> {
        let request = match mode {
            BypassMode::Auto => command::override_clear(SUBUNIT_BYPASS),
            mode => command::override_set_timed(SUBUNIT_BYPASS, timeout_secs, &[mode as u8]),
        };
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    // --- Temperature profile ---

    pub async fn get_temperature_profile(&self) -> Result<TemperatureProfile, ComfoError> {
        let (_, value) = self.override_state(SUBUNIT_TEMPERATURE_PROFILE).await?;
        TemperatureProfile::try_from(first_byte(&value)?)
    }

    pub async fn set_temperature_profile(
        &self,
        profile: TemperatureProfile,
    ) -> Result<(), ComfoError> {
        let request = command::override_set(SUBUNIT_TEMPERATURE_PROFILE, &[profile as u8]);
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    // --- Balance mode ---

    /// Supply-only parks the exhaust fan, exhaust-only parks the supply
    /// fan; balance clears both overrides.
    pub async fn get_balance_mode(&self) -> Result<BalanceMode, ComfoError> {
        let (supply_parked, _) = self.override_state(SUBUNIT_SUPPLY_FAN).await?;
        let (exhaust_parked, _) = self.override_state(SUBUNIT_EXHAUST_FAN).await?;
        Ok(match (supply_parked, exhaust_parked) {
            (false, true) => BalanceMode::SupplyOnly,
            (true, false) => BalanceMode::ExhaustOnly,
            _ => BalanceMode::Balance,
        })
    }

    pub async fn set_balance_mode(
        &self,
        mode: BalanceMode,
        timeout_secs: i32,
    ) -> Result<(), ComfoError> {
        debug!("[UNIT] Setting balance mode {:?}", mode);
        let (park, clear) = match mode {
            BalanceMode::Balance => {
                self.clear_override(SUBUNIT_SUPPLY_FAN).await?;
                self.clear_override(SUBUNIT_EXHAUST_FAN).await?;
                return Ok(());
            }
            BalanceMode::SupplyOnly => (SUBUNIT_EXHAUST_FAN, SUBUNIT_SUPPLY_FAN),
            BalanceMode::ExhaustOnly => (SUBUNIT_SUPPLY_FAN, SUBUNIT_EXHAUST_FAN),
        };
        self.clear_override(clear).await?;
        let request = command::override_set_timed(park, timeout_secs, &[0x00]);
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    // --- ComfoCool ---

    pub async fn get_comfocool_mode(&self) -> Result<ComfoCoolMode, ComfoError> {
        let (active, _) = self.override_state(SUBUNIT_COMFOCOOL).await?;
        Ok(if active {
            ComfoCoolMode::Off
        } else {
            ComfoCoolMode::Auto
        })
    }

    pub async fn set_comfocool_mode(
        &self,
        mode: ComfoCoolMode,
        timeout_secs: i32,
    ) -> Result<(), ComfoError> {
        let request = match mode {
            ComfoCoolMode::Auto => command::override_clear(SUBUNIT_COMFOCOOL),
            ComfoCoolMode::Off => {
                command::override_set_timed(SUBUNIT_COMFOCOOL, timeout_secs, &[0x01])
            }
        };
        self.bridge.rmi(NODE_UNIT, request).await.map(|_| ())
    }

    // --- Sensor-based ventilation modes ---

    pub async fn get_sensor_ventmode_temperature_passive(&self) -> Result<bool, ComfoError> {
        self.get_bool_property(&PROPERTY_SENSOR_VENTMODE_TEMPERATURE_PASSIVE)
            .await
    }

    pub async fn set_sensor_ventmode_temperature_passive(
        &self,
        enable: bool,
    ) -> Result<(), ComfoError> {
        self.set_property(
            &PROPERTY_SENSOR_VENTMODE_TEMPERATURE_PASSIVE,
            &PropertyValue::Boolean(enable),
        )
        .await
    }

    pub async fn get_sensor_ventmode_humidity_comfort(&self) -> Result<bool, ComfoError> {
        self.get_bool_property(&PROPERTY_SENSOR_VENTMODE_HUMIDITY_COMFORT)
            .await
    }

    pub async fn set_sensor_ventmode_humidity_comfort(
        &self,
        enable: bool,
    ) -> Result<(), ComfoError> {
        self.set_property(
            &PROPERTY_SENSOR_VENTMODE_HUMIDITY_COMFORT,
            &PropertyValue::Boolean(enable),
        )
        .await
    }

    pub async fn get_sensor_ventmode_humidity_protection(&self) -> Result<bool, ComfoError> {
        self.get_bool_property(&PROPERTY_SENSOR_VENTMODE_HUMIDITY_PROTECTION)
            .await
    }

    pub async fn set_sensor_ventmode_humidity_protection(
        &self,
        enable: bool,
    ) -> Result<(), ComfoError> {
        self.set_property(
            &PROPERTY_SENSOR_VENTMODE_HUMIDITY_PROTECTION,
            &PropertyValue::Boolean(enable),
        )
        .await
    }

    // --- Bridge queries ---

    pub async fn version(&self) -> Result<BridgeVersion, ComfoError> {
        let confirm = self.bridge.cmd_version_request().await?;
        Ok(BridgeVersion {
            gateway_version: version_decode(confirm.gateway_version),
            serial_number: confirm.serial_number,
            comfonet_version: version_decode(confirm.comfonet_version),
        })
    }

    /// The unit clock as a Unix timestamp.
    pub async fn time(&self) -> Result<i64, ComfoError> {
        let seconds = self.bridge.cmd_time_request().await?;
        Ok(i64::from(seconds) + C_EPOCH_OFFSET)
    }

    // --- Internals ---

    /// Queries an override subunit. The response body is the active flag
    /// followed by the effective value bytes.
    async fn override_state(&self, subunit: u8) -> Result<(bool, Vec<u8>), ComfoError> {
        let body = self
            .bridge
            .rmi(NODE_UNIT, command::override_get(subunit))
            .await?;
        let (&active, value) = body.split_first().ok_or(ComfoError::DecodeError)?;
        Ok((active != 0, value.to_vec()))
    }

    async fn clear_override(&self, subunit: u8) -> Result<(), ComfoError> {
        self.bridge
            .rmi(NODE_UNIT, command::override_clear(subunit))
            .await
            .map(|_| ())
    }

    async fn get_bool_property(
        &self,
        descriptor: &properties::PropertyDescriptor,
    ) -> Result<bool, ComfoError> {
        match self.get_property(descriptor).await? {
            PropertyValue::Boolean(value) => Ok(value),
            _ => Err(ComfoError::DecodeError),
        }
    }
}

fn first_byte(value: &[u8]) -> Result<u8, ComfoError> {
    value.first().copied().ok_or(ComfoError::DecodeError)
}
