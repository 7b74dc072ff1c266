//! Static registries: sensors, device properties, alarm error codes.
//!
//! These tables are data, not code; they are embedded as constants and
//! shared read-only by every session.

pub mod errors;
pub mod properties;
pub mod sensors;

pub use errors::{decode_error_bitmask, error_text};
pub use properties::PropertyDescriptor;
pub use sensors::{SampleType, SensorDefinition, lookup as sensor};
