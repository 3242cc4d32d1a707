//! Named data arrays and the numeric types they are stored as

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// element type of a `DataArray`, the `type` attribute in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precision {
    Float32,
    #[default]
    Float64,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl Precision {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
        }
    }

    pub fn from_name(name: &[u8]) -> Option<Self> {
        let precision = match name {
            b"Float32" => Self::Float32,
            b"Float64" => Self::Float64,
            b"Int8" => Self::Int8,
            b"UInt8" => Self::UInt8,
            b"Int16" => Self::Int16,
            b"UInt16" => Self::UInt16,
            b"Int32" => Self::Int32,
            b"UInt32" => Self::UInt32,
            b"Int64" => Self::Int64,
            b"UInt64" => Self::UInt64,
            _ => return None,
        };

        Some(precision)
    }

    /// bytes per value
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Float32 | Self::Int32 | Self::UInt32 => 4,
            Self::Float64 | Self::Int64 | Self::UInt64 => 8,
        }
    }

    /// little endian bytes of `values` converted to this precision
    pub(crate) fn encode(&self, values: &[f64]) -> Result<Vec<u8>, Unrepresentable> {
        match self {
            Self::Float32 => encode_as::<f32>(values),
            Self::Float64 => encode_as::<f64>(values),
            Self::Int8 => encode_as::<i8>(values),
            Self::UInt8 => encode_as::<u8>(values),
            Self::Int16 => encode_as::<i16>(values),
            Self::UInt16 => encode_as::<u16>(values),
            Self::Int32 => encode_as::<i32>(values),
            Self::UInt32 => encode_as::<u32>(values),
            Self::Int64 => encode_as::<i64>(values),
            Self::UInt64 => encode_as::<u64>(values),
        }
    }

    /// values stored little endian in this precision, widened to `f64`
    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<f64> {
        match self {
            Self::Float32 => decode_as::<f32>(bytes),
            Self::Float64 => decode_as::<f64>(bytes),
            Self::Int8 => decode_as::<i8>(bytes),
            Self::UInt8 => decode_as::<u8>(bytes),
            Self::Int16 => decode_as::<i16>(bytes),
            Self::UInt16 => decode_as::<u16>(bytes),
            Self::Int32 => decode_as::<i32>(bytes),
            Self::UInt32 => decode_as::<u32>(bytes),
            Self::Int64 => decode_as::<i64>(bytes),
            Self::UInt64 => decode_as::<u64>(bytes),
        }
    }

    /// space separated ascii representation of `values` in this precision
    pub(crate) fn format_ascii(&self, values: &[f64]) -> Result<String, Unrepresentable> {
        match self {
            Self::Float32 => ascii_as::<f32>(values),
            Self::Float64 => ascii_as::<f64>(values),
            Self::Int8 => ascii_as::<i8>(values),
            Self::UInt8 => ascii_as::<u8>(values),
            Self::Int16 => ascii_as::<i16>(values),
            Self::UInt16 => ascii_as::<u16>(values),
            Self::Int32 => ascii_as::<i32>(values),
            Self::UInt32 => ascii_as::<u32>(values),
            Self::Int64 => ascii_as::<i64>(values),
            Self::UInt64 => ascii_as::<u64>(values),
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = match s.trim().to_ascii_lowercase().as_str() {
            "f32" | "float32" => "Float32",
            "f64" | "float64" => "Float64",
            "u8" | "uint8" => "UInt8",
            _ => s.trim(),
        };

        Self::from_name(name.as_bytes()).ok_or_else(|| format!("`{}` is not a VTK data type", s))
    }
}

/// A numeric type that can be stored in a data array
pub trait Numeric: Copy + num_traits::NumCast {
    const PRECISION: Precision;

    fn extend_le_bytes(self, out: &mut Vec<u8>);

    /// `bytes` holds exactly `PRECISION.size()` bytes
    fn from_le_slice(bytes: &[u8]) -> Self;

    fn write_ascii(self, out: &mut String);
}

macro_rules! numeric_int {
    ($ty:ty, $precision:ident) => {
        impl Numeric for $ty {
            const PRECISION: Precision = Precision::$precision;

            fn extend_le_bytes(self, out: &mut Vec<u8>) {
                out.extend(self.to_le_bytes());
            }

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut raw = [0; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }

            fn write_ascii(self, out: &mut String) {
                let _ = write!(out, "{}", self);
            }
        }
    };
}

macro_rules! numeric_float {
    ($ty:ty, $precision:ident) => {
        impl Numeric for $ty {
            const PRECISION: Precision = Precision::$precision;

            fn extend_le_bytes(self, out: &mut Vec<u8>) {
                out.extend(self.to_le_bytes());
            }

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut raw = [0; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }

            fn write_ascii(self, out: &mut String) {
                let mut buffer = ryu::Buffer::new();
                out.push_str(buffer.format(self));
            }
        }
    };
}

numeric_float!(f32, Float32);
numeric_float!(f64, Float64);
numeric_int!(i8, Int8);
numeric_int!(u8, UInt8);
numeric_int!(i16, Int16);
numeric_int!(u16, UInt16);
numeric_int!(i32, Int32);
numeric_int!(u32, UInt32);
numeric_int!(i64, Int64);
numeric_int!(u64, UInt64);

/// A value outside the range of the type it is written as, such as NaN or a
/// negative number in an unsigned array
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("value {value} at index {index} cannot be stored as {}", .precision.to_str())]
pub struct Unrepresentable {
    pub value: f64,
    pub index: usize,
    pub precision: Precision,
}

/// fractions are truncated towards zero for integer types
fn convert<T: Numeric>(index: usize, value: f64) -> Result<T, Unrepresentable> {
    num_traits::cast::<f64, T>(value).ok_or(Unrepresentable {
        value,
        index,
        precision: T::PRECISION,
    })
}

fn encode_as<T: Numeric>(values: &[f64]) -> Result<Vec<u8>, Unrepresentable> {
    let mut out = Vec::with_capacity(values.len() * T::PRECISION.size());
    for (index, value) in values.iter().enumerate() {
        convert::<T>(index, *value)?.extend_le_bytes(&mut out);
    }
    Ok(out)
}

fn decode_as<T: Numeric>(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(T::PRECISION.size())
        .map(|chunk| {
            let value = T::from_le_slice(chunk);
            num_traits::cast::<T, f64>(value).unwrap_or(0.)
        })
        .collect()
}

fn ascii_as<T: Numeric>(values: &[f64]) -> Result<String, Unrepresentable> {
    let mut out = String::with_capacity(values.len() * 8);
    for (index, value) in values.iter().enumerate() {
        convert::<T>(index, *value)?.write_ascii(&mut out);
        out.push(' ');
    }
    Ok(out)
}

/// A named array of point values, components interleaved per point
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub precision: Precision,
    pub values: Vec<f64>,
}

impl DataArray {
    pub fn new<T: Into<String>>(name: T, components: usize, precision: Precision, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            components,
            precision,
            values,
        }
    }

    /// number of tuples (points) in the array
    pub fn len(&self) -> usize {
        self.values.len() / self.components.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// size of the raw data in bytes, without the block header
    pub(crate) fn byte_len(&self) -> usize {
        self.values.len() * self.precision.size()
    }
}
