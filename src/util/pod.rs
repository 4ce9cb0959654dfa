//! Plain Old Data types - the primitive storage kinds a property can hold.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

/// Primitive storage kind of a property element.
///
/// Every Scalar/Array property declares one of these together with an
/// extent (see [`crate::util::DataType`]). Each kind has a fixed size and
/// a stable textual name used by the directory encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Boolean = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// 16-bit floating point (IEEE 754 half precision)
    Float16 = 9,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 10,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 11,
    /// UTF-8 string
    String = 12,
    /// Unknown/invalid kind
    #[default]
    Unknown = 127,
}

impl PlainOldDataType {
    /// Number of valid kinds (excluding Unknown).
    pub const COUNT: usize = 13;

    /// Size in bytes of a single element of this kind.
    ///
    /// Strings are variable-length in sample payloads (NUL-terminated);
    /// this returns 1 so payload size checks degrade to byte counts.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Boolean | Self::Uint8 | Self::Int8 | Self::String => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
            Self::Unknown => 0,
        }
    }

    /// Stable textual name, as written by the directory encoding.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool_t",
            Self::Uint8 => "uint8_t",
            Self::Int8 => "int8_t",
            Self::Uint16 => "uint16_t",
            Self::Int16 => "int16_t",
            Self::Uint32 => "uint32_t",
            Self::Int32 => "int32_t",
            Self::Uint64 => "uint64_t",
            Self::Int64 => "int64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a kind from its textual name. Unrecognized names map to Unknown.
    pub fn from_name(name: &str) -> Self {
        match name {
            "bool_t" => Self::Boolean,
            "uint8_t" => Self::Uint8,
            "int8_t" => Self::Int8,
            "uint16_t" => Self::Uint16,
            "int16_t" => Self::Int16,
            "uint32_t" => Self::Uint32,
            "int32_t" => Self::Int32,
            "uint64_t" => Self::Uint64,
            "int64_t" => Self::Int64,
            "float16_t" => Self::Float16,
            "float32_t" => Self::Float32,
            "float64_t" => Self::Float64,
            "string" => Self::String,
            _ => Self::Unknown,
        }
    }

    /// Convert from the stored u8 tag.
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Boolean,
            1 => Self::Uint8,
            2 => Self::Int8,
            3 => Self::Uint16,
            4 => Self::Int16,
            5 => Self::Uint32,
            6 => Self::Int32,
            7 => Self::Uint64,
            8 => Self::Int64,
            9 => Self::Float16,
            10 => Self::Float32,
            11 => Self::Float64,
            12 => Self::String,
            _ => Self::Unknown,
        }
    }

    /// True for the variable-length string kind.
    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String)
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === POD trait for type-safe sample views ===

/// Rust types that map onto a [`PlainOldDataType`] for typed sample access.
pub trait StrataPod: Pod + Zeroable + Copy + Default {
    /// The corresponding PlainOldDataType enum value.
    const POD_TYPE: PlainOldDataType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl StrataPod for u8 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint8;
}

impl StrataPod for i8 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int8;
}

impl StrataPod for u16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint16;
}

impl StrataPod for i16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int16;
}

impl StrataPod for u32 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint32;
}

impl StrataPod for i32 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int32;
}

impl StrataPod for u64 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint64;
}

impl StrataPod for i64 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int64;
}

impl StrataPod for f32 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float32;
}

impl StrataPod for f64 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float64;
}

impl StrataPod for f16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float16;
}

/// Boolean with guaranteed 1-byte storage, safe to view through bytemuck.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl StrataPod for Bool {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Boolean;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_sizes() {
        assert_eq!(PlainOldDataType::Boolean.num_bytes(), 1);
        assert_eq!(PlainOldDataType::Int32.num_bytes(), 4);
        assert_eq!(PlainOldDataType::Float16.num_bytes(), 2);
        assert_eq!(PlainOldDataType::Float64.num_bytes(), 8);
    }

    #[test]
    fn test_pod_name_roundtrip() {
        for i in 0..PlainOldDataType::COUNT as u8 {
            let pod = PlainOldDataType::from_u8(i);
            assert_ne!(pod, PlainOldDataType::Unknown);
            assert_eq!(PlainOldDataType::from_name(pod.name()), pod);
        }
        assert_eq!(
            PlainOldDataType::from_name("no_such_t"),
            PlainOldDataType::Unknown
        );
    }

    #[test]
    fn test_bool_storage() {
        assert_eq!(std::mem::size_of::<Bool>(), 1);
        assert!(Bool::new(true).get());
        assert!(!Bool::FALSE.get());
    }
}
