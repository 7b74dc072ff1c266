//! Typed values carried inside RMI property reads and writes.
//!
//! All multi-byte encodings are little-endian. Timestamps count seconds
//! from the appliance epoch, 2000-01-01T00:00:00Z.

use crate::error::ComfoError;
use crate::types::C_EPOCH_OFFSET;

/// Element type of an RMI array property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Integer8,
    Integer16,
    Integer32,
}

impl ElementType {
    fn width(&self) -> usize {
        match self {
            Self::Unsigned8 | Self::Integer8 => 1,
            Self::Unsigned16 | Self::Integer16 => 2,
            Self::Unsigned32 | Self::Integer32 => 4,
        }
    }
}

/// Wire type of an RMI property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Boolean,
    Unsigned8,
    Unsigned16,
    Unsigned32,
    Integer8,
    Integer16,
    Integer32,
    Integer64,
    /// Seconds since the appliance epoch, 8 bytes.
    Timestamp,
    /// Signed 8.8 fixed point, 2 bytes.
    Fixed88,
    /// NUL-terminated UTF-8.
    CString,
    /// Raw bytes, length taken from the response.
    Bytes,
    /// One count byte followed by that many fixed-width elements.
    Array(ElementType),
}

/// A decoded RMI property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Boolean(bool),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Integer8(i8),
    Integer16(i16),
    Integer32(i32),
    Integer64(i64),
    /// Seconds since the appliance epoch.
    Timestamp(i64),
    Fixed88(f32),
    CString(String),
    Bytes(Vec<u8>),
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Serializes the value into its little-endian wire form.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            PropertyValue::Boolean(v) => vec![u8::from(*v)],
            PropertyValue::Unsigned8(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Unsigned16(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Unsigned32(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Integer8(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Integer16(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Integer32(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Integer64(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Timestamp(v) => v.to_le_bytes().to_vec(),
            PropertyValue::Fixed88(v) => {
                let raw = (v * 256.0).round() as i16;
                raw.to_le_bytes().to_vec()
            }
            PropertyValue::CString(v) => {
                let mut buf = v.as_bytes().to_vec();
                buf.push(0);
                buf
            }
            PropertyValue::Bytes(v) => v.clone(),
            PropertyValue::Array(items) => {
                let mut buf = vec![items.len() as u8];
                for item in items {
                    buf.extend_from_slice(&item.encode());
                }
                buf
            }
        }
    }

    /// Deserializes a byte slice against the expected wire type.
    pub fn decode(data: &[u8], kind: PropertyType) -> Result<PropertyValue, ComfoError> {
        // Helper macro for the fixed-width integer cases.
        macro_rules! decode_fixed {
            ($data:expr, $variant:path, $type:ty) => {
                $data
                    .try_into()
                    .map(|bytes| $variant(<$type>::from_le_bytes(bytes)))
                    .map_err(|_| ComfoError::DecodeError)
            };
        }

        match kind {
            PropertyType::Boolean => match data {
                [0] => Ok(PropertyValue::Boolean(false)),
                [_] => Ok(PropertyValue::Boolean(true)),
                _ => Err(ComfoError::DecodeError),
            },
            PropertyType::Unsigned8 => decode_fixed!(data, PropertyValue::Unsigned8, u8),
            PropertyType::Unsigned16 => decode_fixed!(data, PropertyValue::Unsigned16, u16),
            PropertyType::Unsigned32 => decode_fixed!(data, PropertyValue::Unsigned32, u32),
            PropertyType::Integer8 => decode_fixed!(data, PropertyValue::Integer8, i8),
            PropertyType::Integer16 => decode_fixed!(data, PropertyValue::Integer16, i16),
            PropertyType::Integer32 => decode_fixed!(data, PropertyValue::Integer32, i32),
            PropertyType::Integer64 => decode_fixed!(data, PropertyValue::Integer64, i64),
            PropertyType::Timestamp => decode_fixed!(data, PropertyValue::Timestamp, i64),
            PropertyType::Fixed88 => {
                let bytes: [u8; 2] = data.try_into().map_err(|_| ComfoError::DecodeError)?;
                Ok(PropertyValue::Fixed88(
                    f32::from(i16::from_le_bytes(bytes)) / 256.0,
                ))
            }
            PropertyType::CString => {
                let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                let text = core::str::from_utf8(&data[..end])
                    .map_err(|_| ComfoError::DecodeError)?;
                Ok(PropertyValue::CString(text.to_owned()))
            }
            PropertyType::Bytes => Ok(PropertyValue::Bytes(data.to_vec())),
            PropertyType::Array(element) => {
                let (&count, rest) = data.split_first().ok_or(ComfoError::DecodeError)?;
                let width = element.width();
                if rest.len() < count as usize * width {
                    return Err(ComfoError::DecodeError);
                }
                let mut items = Vec::with_capacity(count as usize);
                for chunk in rest.chunks_exact(width).take(count as usize) {
                    items.push(PropertyValue::decode(chunk, element.into())?);
                }
                Ok(PropertyValue::Array(items))
            }
        }
    }

    /// The value as a Unix timestamp, for `Timestamp` values.
    pub fn as_unix_time(&self) -> Option<i64> {
        match self {
            PropertyValue::Timestamp(secs) => Some(secs + C_EPOCH_OFFSET),
            _ => None,
        }
    }
}

impl From<ElementType> for PropertyType {
    fn from(element: ElementType) -> Self {
        match element {
            ElementType::Unsigned8 => PropertyType::Unsigned8,
            ElementType::Unsigned16 => PropertyType::Unsigned16,
            ElementType::Unsigned32 => PropertyType::Unsigned32,
            ElementType::Integer8 => PropertyType::Integer8,
            ElementType::Integer16 => PropertyType::Integer16,
            ElementType::Integer32 => PropertyType::Integer32,
        }
    }
}
