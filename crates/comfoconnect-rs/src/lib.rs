//! Async client for the Zehnder ComfoConnect LAN C bridge.
//!
//! The bridge fronts ComfoAir Q ventilation units and speaks a
//! length-prefixed, protobuf-framed protocol on TCP port 56747, with UDP
//! discovery on the same port. This crate covers discovery, the session
//! (registration, request multiplexing, keepalive, teardown), the RMI
//! property/action codec and sensor (RPDO) subscriptions.

// --- Foundation Modules ---
pub mod error;
pub mod types;
pub mod util;

// --- Wire Layer ---
pub mod frame;
pub mod proto;

// --- Protocol Layers ---
pub mod discovery;
pub mod pdo;
pub mod registry;
pub mod rmi;
pub mod session;

// --- Facade ---
pub mod comfoconnect;

// --- Top-level Exports ---
pub use comfoconnect::{BridgeVersion, ComfoConnect};
pub use discovery::{BridgeEndpoint, DiscoveryOptions, discover_bridge, discover_bridges};
pub use error::ComfoError;
pub use pdo::{SensorUpdate, SensorValue};
pub use registry::sensors::{SampleType, SensorDefinition};
pub use rmi::{
    BalanceMode, BypassMode, ComfoCoolMode, PropertyType, PropertyValue, TemperatureProfile,
    VentilationMode, VentilationSpeed,
};
pub use session::{Bridge, BridgeEvent, SessionState};
pub use types::DeviceUuid;
