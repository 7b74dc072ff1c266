//! Sensor (RPDO) subscription bookkeeping and sample decoding.
//!
//! The bridge keeps at most one subscription per pdo id; locally any number
//! of subscribers may listen. The first local subscriber triggers the
//! bridge-side subscription, removing the sensor cancels it. Updates are
//! fanned out over unbounded channels, and the subscription lock is
//! released before any send so subscriber tasks may (de)register sensors
//! while handling an update.

use std::collections::HashMap;
use std::sync::Mutex;

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::error::ComfoError;
use crate::registry::sensors::{SampleType, SensorDefinition};

/// A decoded sensor sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    /// Numeric sample after applying the registry scale factor.
    Number(f64),
    Boolean(bool),
    /// Seconds.
    Time(u32),
    /// Raw error bitmask; expand with
    /// [`crate::registry::decode_error_bitmask`].
    Errors(Vec<u8>),
}

/// One update delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    pub sensor: &'static SensorDefinition,
    pub value: SensorValue,
}

/// Decodes a raw PDO sample against the sensor's registered sample type.
///
/// Integers are little-endian; signed types sign-extend; the registry
/// scale factor is applied to every numeric sample.
pub fn decode_sample(
    sensor: &SensorDefinition,
    data: &[u8],
) -> Result<SensorValue, ComfoError> {
    if let Some(width) = sensor.kind.width() {
        if data.len() < width {
            return Err(ComfoError::DecodeError);
        }
    }

    let value = match sensor.kind {
        SampleType::Boolean => return Ok(SensorValue::Boolean(data[0] != 0)),
        SampleType::Unsigned8 => f64::from(data[0]),
        SampleType::Unsigned16 => f64::from(u16::from_le_bytes([data[0], data[1]])),
        SampleType::Unsigned32 => {
            f64::from(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
        }
        SampleType::Integer8 => f64::from(data[0] as i8),
        SampleType::Integer16 => f64::from(i16::from_le_bytes([data[0], data[1]])),
        SampleType::Integer32 => {
            f64::from(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))
        }
        SampleType::Integer64 => {
            let bytes: [u8; 8] = data[..8].try_into().map_err(|_| ComfoError::DecodeError)?;
            i64::from_le_bytes(bytes) as f64
        }
        SampleType::Fixed88 => f64::from(i16::from_le_bytes([data[0], data[1]])) / 256.0,
        SampleType::Time => {
            return Ok(SensorValue::Time(u32::from_le_bytes([
                data[0], data[1], data[2], data[3],
            ])));
        }
        SampleType::Error => return Ok(SensorValue::Errors(data.to_vec())),
    };

    Ok(SensorValue::Number(value * sensor.scale))
}

struct Subscription {
    sensor: &'static SensorDefinition,
    senders: Vec<mpsc::UnboundedSender<SensorUpdate>>,
}

/// Per-session subscription table, keyed by pdo id.
#[derive(Default)]
pub(crate) struct SensorSubscriptions {
    inner: Mutex<HashMap<u16, Subscription>>,
}

impl SensorSubscriptions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a local subscriber. Returns the update receiver and whether the
    /// bridge-side subscription still has to be requested.
    pub(crate) fn add(
        &self,
        sensor: &'static SensorDefinition,
    ) -> (mpsc::UnboundedReceiver<SensorUpdate>, bool) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let subscription = inner.entry(sensor.id).or_insert_with(|| Subscription {
            sensor,
            senders: Vec::new(),
        });
        let first = subscription.senders.is_empty();
        subscription.senders.push(tx);
        (rx, first)
    }

    /// Drops every local subscriber of a sensor. Returns true when a
    /// subscription existed, in which case the bridge-side one is due for
    /// cancellation.
    pub(crate) fn remove(&self, id: u16) -> bool {
        self.inner.lock().unwrap().remove(&id).is_some()
    }

    /// Decodes a notification and fans it out to the sensor's subscribers.
    /// Unknown pdo ids and undecodable samples are logged and dropped.
    pub(crate) fn dispatch(&self, pdid: u16, data: &[u8]) {
        let (sensor, senders) = {
            let mut inner = self.inner.lock().unwrap();
            let Some(subscription) = inner.get_mut(&pdid) else {
                debug!("[PDO] Notification for unsubscribed pdid {}, ignoring", pdid);
                return;
            };
            subscription.senders.retain(|tx| !tx.is_closed());
            (subscription.sensor, subscription.senders.clone())
        };

        let value = match decode_sample(sensor, data) {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "[PDO] Undecodable sample for pdid {} ({} bytes), dropping",
                    pdid,
                    data.len()
                );
                return;
            }
        };

        for tx in senders {
            let _ = tx.send(SensorUpdate {
                sensor,
                value: value.clone(),
            });
        }
    }

    /// Drops every subscription; receivers observe the closed channel.
    pub(crate) fn reset(&self) {
        self.inner.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn test_outdoor_temperature_sample() {
        // Raw 240 at 0.1 °C per unit.
        let sensor = registry::sensor(276).unwrap();
        let value = decode_sample(sensor, &[0xF0, 0x00]).unwrap();
        assert_eq!(value, SensorValue::Number(24.0));

        // Sign extension: -15 raw = -1.5 °C.
        let value = decode_sample(sensor, &(-15i16).to_le_bytes()).unwrap();
        assert_eq!(value, SensorValue::Number(-1.5));
    }

    #[test]
    fn test_short_sample_is_a_decode_error() {
        let sensor = registry::sensor(276).unwrap();
        assert_eq!(
            decode_sample(sensor, &[0xF0]).unwrap_err(),
            ComfoError::DecodeError
        );
    }

    #[test]
    fn test_fixed88_sample() {
        let sensor = registry::sensor(369).unwrap();
        let value = decode_sample(sensor, &[0x80, 0x01]).unwrap();
        assert_eq!(value, SensorValue::Number(1.5));
    }

    #[test]
    fn test_boolean_time_and_error_samples() {
        let frost = registry::sensor(210).unwrap();
        assert_eq!(
            decode_sample(frost, &[0x01]).unwrap(),
            SensorValue::Boolean(true)
        );

        let countdown = registry::sensor(81).unwrap();
        assert_eq!(
            decode_sample(countdown, &[0x10, 0x0E, 0x00, 0x00]).unwrap(),
            SensorValue::Time(3600)
        );

        let errors = registry::sensor(100).unwrap();
        assert_eq!(
            decode_sample(errors, &[0b0000_0001]).unwrap(),
            SensorValue::Errors(vec![1])
        );
    }

    #[tokio::test]
    async fn test_fan_out_and_refcounting() {
        let subs = SensorSubscriptions::new();
        let sensor = registry::sensor(276).unwrap();

        let (mut rx1, first) = subs.add(sensor);
        assert!(first);
        let (mut rx2, first) = subs.add(sensor);
        assert!(!first, "one bridge-side subscription per pdo id");

        subs.dispatch(276, &[0xF0, 0x00]);
        assert_eq!(rx1.recv().await.unwrap().value, SensorValue::Number(24.0));
        assert_eq!(rx2.recv().await.unwrap().value, SensorValue::Number(24.0));

        assert!(subs.remove(276));
        assert!(!subs.remove(276), "second removal is a no-op");
        assert!(rx1.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_preserves_arrival_order() {
        let subs = SensorSubscriptions::new();
        let sensor = registry::sensor(276).unwrap();
        let (mut rx, _) = subs.add(sensor);

        for raw in [100i16, 200, 300] {
            subs.dispatch(276, &raw.to_le_bytes());
        }
        assert_eq!(rx.recv().await.unwrap().value, SensorValue::Number(10.0));
        assert_eq!(rx.recv().await.unwrap().value, SensorValue::Number(20.0));
        assert_eq!(rx.recv().await.unwrap().value, SensorValue::Number(30.0));
    }

    #[test]
    fn test_unknown_pdid_is_ignored() {
        let subs = SensorSubscriptions::new();
        subs.dispatch(9999, &[0x00]);
    }
}
