//! Debug variable types reported by a running control program.
//!
//! The control program names the type of each debug value with an
//! IEC 61131-3 elementary type name. This module maps those names to a
//! fixed storage width and decodes the raw bytes into a [`DebugValue`].
//!
//! | Type name                              | Storage |
//! |----------------------------------------|---------|
//! | BOOL, STEP, TRANSITION, ACTION         | u8 bit  |
//! | SINT                                   | i8      |
//! | USINT, BYTE                            | u8      |
//! | INT                                    | i16     |
//! | UINT, WORD                             | u16     |
//! | DINT                                   | i32     |
//! | UDINT, DWORD                           | u32     |
//! | LINT                                   | i64     |
//! | ULINT, LWORD                           | u64     |
//! | REAL                                   | f32     |
//! | LREAL                                  | f64     |
//! | STRING, WSTRING                        | not decodable |

use serde::{Deserialize, Serialize};

/// Semantic type of a debug variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugType {
    /// Single bit stored in one byte.
    Bit,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
    /// Single precision float.
    F32,
    /// Double precision float.
    F64,
    /// Character string. Known but not decoded.
    String,
}

/// Static translation table from type name to semantic type.
const TYPE_TABLE: &[(&str, DebugType)] = &[
    ("BOOL", DebugType::Bit),
    ("STEP", DebugType::Bit),
    ("TRANSITION", DebugType::Bit),
    ("ACTION", DebugType::Bit),
    ("SINT", DebugType::I8),
    ("USINT", DebugType::U8),
    ("BYTE", DebugType::U8),
    ("STRING", DebugType::String),
    ("INT", DebugType::I16),
    ("UINT", DebugType::U16),
    ("WORD", DebugType::U16),
    ("WSTRING", DebugType::String),
    ("DINT", DebugType::I32),
    ("UDINT", DebugType::U32),
    ("DWORD", DebugType::U32),
    ("LINT", DebugType::I64),
    ("ULINT", DebugType::U64),
    ("LWORD", DebugType::U64),
    ("REAL", DebugType::F32),
    ("LREAL", DebugType::F64),
];

impl DebugType {
    /// Look up a type by its IEC type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        TYPE_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, ty)| ty)
    }

    /// Storage width in bytes, or `None` for types that cannot be decoded.
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::Bit | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::String => None,
        }
    }

    /// Decode a value stored in native byte order.
    ///
    /// Returns `None` when the type is not decodable or `raw` is shorter
    /// than the storage width.
    pub fn decode(self, raw: &[u8]) -> Option<DebugValue> {
        let width = self.width()?;
        let bytes = raw.get(..width)?;
        let value = match self {
            Self::Bit => DebugValue::Bit(bytes[0] != 0),
            Self::I8 => DebugValue::I8(i8::from_ne_bytes([bytes[0]])),
            Self::U8 => DebugValue::U8(bytes[0]),
            Self::I16 => DebugValue::I16(i16::from_ne_bytes(bytes.try_into().ok()?)),
            Self::U16 => DebugValue::U16(u16::from_ne_bytes(bytes.try_into().ok()?)),
            Self::I32 => DebugValue::I32(i32::from_ne_bytes(bytes.try_into().ok()?)),
            Self::U32 => DebugValue::U32(u32::from_ne_bytes(bytes.try_into().ok()?)),
            Self::I64 => DebugValue::I64(i64::from_ne_bytes(bytes.try_into().ok()?)),
            Self::U64 => DebugValue::U64(u64::from_ne_bytes(bytes.try_into().ok()?)),
            Self::F32 => DebugValue::F32(f32::from_ne_bytes(bytes.try_into().ok()?)),
            Self::F64 => DebugValue::F64(f64::from_ne_bytes(bytes.try_into().ok()?)),
            Self::String => return None,
        };
        Some(value)
    }
}

/// A decoded debug value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DebugValue {
    /// Bit value.
    Bit(bool),
    /// Signed 8-bit value.
    I8(i8),
    /// Unsigned 8-bit value.
    U8(u8),
    /// Signed 16-bit value.
    I16(i16),
    /// Unsigned 16-bit value.
    U16(u16),
    /// Signed 32-bit value.
    I32(i32),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Signed 64-bit value.
    I64(i64),
    /// Unsigned 64-bit value.
    U64(u64),
    /// Single precision value.
    F32(f32),
    /// Double precision value.
    F64(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_table_aliases() {
        assert_eq!(DebugType::from_type_name("BOOL"), Some(DebugType::Bit));
        assert_eq!(DebugType::from_type_name("STEP"), Some(DebugType::Bit));
        assert_eq!(DebugType::from_type_name("BYTE"), Some(DebugType::U8));
        assert_eq!(DebugType::from_type_name("WORD"), Some(DebugType::U16));
        assert_eq!(DebugType::from_type_name("DWORD"), Some(DebugType::U32));
        assert_eq!(DebugType::from_type_name("LWORD"), Some(DebugType::U64));
        assert_eq!(DebugType::from_type_name("LREAL"), Some(DebugType::F64));
        assert_eq!(DebugType::from_type_name("TIME"), None);
        assert_eq!(DebugType::from_type_name("bool"), None);
    }

    #[test]
    fn decode_integers() {
        assert_eq!(
            DebugType::I16.decode(&(-1234i16).to_ne_bytes()),
            Some(DebugValue::I16(-1234))
        );
        assert_eq!(
            DebugType::U32.decode(&0xDEAD_BEEFu32.to_ne_bytes()),
            Some(DebugValue::U32(0xDEAD_BEEF))
        );
        assert_eq!(
            DebugType::I64.decode(&i64::MIN.to_ne_bytes()),
            Some(DebugValue::I64(i64::MIN))
        );
    }

    #[test]
    fn decode_bit_and_float() {
        assert_eq!(DebugType::Bit.decode(&[1]), Some(DebugValue::Bit(true)));
        assert_eq!(DebugType::Bit.decode(&[0]), Some(DebugValue::Bit(false)));
        assert_eq!(
            DebugType::F64.decode(&2.5f64.to_ne_bytes()),
            Some(DebugValue::F64(2.5))
        );
    }

    #[test]
    fn decode_rejects_short_buffer_and_strings() {
        assert_eq!(DebugType::I32.decode(&[0, 1]), None);
        assert_eq!(DebugType::String.decode(b"hello"), None);
        assert_eq!(DebugType::String.width(), None);
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_string(&[DebugValue::I16(7), DebugValue::Bit(true)]).unwrap();
        assert_eq!(json, "[7,true]");
    }
}
