use std::sync::Arc;

use smallvec::SmallVec;

use crate::foundation::error::{BridgeError, BridgeResult};

/// Element type of a numeric wire buffer. All multi-byte types are little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum DType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl DType {
    /// Parse the wire name (`"float32"`, `"uint8"`, ...).
    pub fn parse(name: &str) -> BridgeResult<Self> {
        Ok(match name {
            "int8" => Self::Int8,
            "uint8" => Self::Uint8,
            "int16" => Self::Int16,
            "uint16" => Self::Uint16,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            other => return Err(BridgeError::protocol(format!("unsupported dtype '{other}'"))),
        })
    }

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Element width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// A numeric view over one shared binary buffer.
///
/// Element reads reinterpret bytes in place; the backing bytes are shared with
/// the message that carried them and never copied per item.
#[derive(Clone, Debug)]
pub struct TypedBuffer {
    dtype: DType,
    bytes: Arc<[u8]>,
    len: usize,
}

impl TypedBuffer {
    /// Wrap raw bytes. The byte length must be a whole number of elements.
    pub fn new(dtype: DType, bytes: Arc<[u8]>) -> BridgeResult<Self> {
        let width = dtype.width();
        if bytes.len() % width != 0 {
            return Err(BridgeError::protocol(format!(
                "{} buffer of {} bytes is not a multiple of {width}",
                dtype.name(),
                bytes.len()
            )));
        }
        let len = bytes.len() / width;
        Ok(Self { dtype, bytes, len })
    }

    /// Build a float64 buffer from values (used for inline JSON arrays).
    pub fn from_f64s(values: &[f64]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self {
            dtype: DType::Float64,
            len: values.len(),
            bytes: bytes.into(),
        }
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw backing bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Element `i` widened to `f64`, or `None` past the end.
    pub fn get(&self, i: usize) -> Option<f64> {
        let w = self.dtype.width();
        let b = self.bytes.get(i.checked_mul(w)?..(i + 1).checked_mul(w)?)?;
        Some(match self.dtype {
            DType::Int8 => f64::from(b[0] as i8),
            DType::Uint8 => f64::from(b[0]),
            DType::Int16 => f64::from(i16::from_le_bytes([b[0], b[1]])),
            DType::Uint16 => f64::from(u16::from_le_bytes([b[0], b[1]])),
            DType::Int32 => f64::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            DType::Uint32 => f64::from(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            DType::Float32 => f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            DType::Float64 => f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
        })
    }

    /// Collect every element as `f64`.
    pub fn to_vec(&self) -> Vec<f64> {
        (0..self.len).filter_map(|i| self.get(i)).collect()
    }
}

/// Dimensions attached to a buffer argument (`[h, w, c]` for image payloads).
pub type Shape = SmallVec<[usize; 3]>;

/// One resolved command argument.
#[derive(Clone, Debug)]
pub enum Argument {
    /// Literal value; broadcasts to every index.
    Scalar(serde_json::Value),
    /// Buffer-backed array with indexed access.
    Buffer {
        /// Element view.
        data: TypedBuffer,
        /// Optional n-dimensional shape.
        shape: Option<Shape>,
    },
}

impl Argument {
    /// Literal numeric scalar.
    pub fn number(v: f64) -> Self {
        Self::Scalar(serde_json::Value::from(v))
    }

    /// Declared element count; `None` for scalars, which have no bound.
    pub fn declared_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Buffer { data, .. } => Some(data.len()),
        }
    }

    /// `true` for JSON `null` (an omitted optional argument).
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(serde_json::Value::Null))
    }

    /// A single number: a numeric/bool scalar, or element 0 of a buffer.
    pub fn as_f64(&self) -> BridgeResult<f64> {
        match self {
            Self::Scalar(serde_json::Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| BridgeError::protocol("number is not representable as f64")),
            Self::Scalar(serde_json::Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Scalar(other) => Err(BridgeError::protocol(format!(
                "expected a number, got {other}"
            ))),
            Self::Buffer { data, .. } => data
                .get(0)
                .ok_or_else(|| BridgeError::protocol("expected a number, got an empty buffer")),
        }
    }

    /// A boolean flag; numbers are truthy when non-zero.
    pub fn as_bool(&self) -> BridgeResult<bool> {
        match self {
            Self::Scalar(serde_json::Value::Bool(b)) => Ok(*b),
            Self::Scalar(serde_json::Value::Null) => Ok(false),
            _ => Ok(self.as_f64()? != 0.0),
        }
    }

    /// A string scalar.
    pub fn as_str(&self) -> BridgeResult<&str> {
        match self {
            Self::Scalar(serde_json::Value::String(s)) => Ok(s),
            other => Err(BridgeError::protocol(format!(
                "expected a string, got {}",
                other.kind()
            ))),
        }
    }

    /// Buffer view, or a protocol error for scalars.
    pub fn as_buffer(&self) -> BridgeResult<&TypedBuffer> {
        match self {
            Self::Buffer { data, .. } => Ok(data),
            Self::Scalar(v) => Err(BridgeError::protocol(format!(
                "expected a buffer, got scalar {v}"
            ))),
        }
    }

    /// Scalar-or-array accessor for numeric fields.
    pub fn numbers(&self) -> BridgeResult<NumberAccessor<'_>> {
        NumberAccessor::new(self)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(serde_json::Value::Null) => "null",
            Self::Scalar(serde_json::Value::Bool(_)) => "bool",
            Self::Scalar(serde_json::Value::Number(_)) => "number",
            Self::Scalar(serde_json::Value::String(_)) => "string",
            Self::Scalar(_) => "json value",
            Self::Buffer { .. } => "buffer",
        }
    }
}

/// Uniform `get(i)` over a scalar or a per-item buffer.
///
/// A declared length of exactly 1 reads the value once up front and returns
/// it for every index.
#[derive(Clone, Copy, Debug)]
pub enum NumberAccessor<'a> {
    /// Same value at every index.
    Broadcast(f64),
    /// Direct indexed access.
    Indexed(&'a TypedBuffer),
}

impl<'a> NumberAccessor<'a> {
    /// Build an accessor for a numeric argument.
    pub fn new(arg: &'a Argument) -> BridgeResult<Self> {
        match arg {
            Argument::Buffer { data, .. } if data.len() != 1 => Ok(Self::Indexed(data)),
            _ => Ok(Self::Broadcast(arg.as_f64()?)),
        }
    }

    /// Declared length; broadcasts count as 1.
    pub fn len(&self) -> usize {
        match self {
            Self::Broadcast(_) => 1,
            Self::Indexed(b) => b.len(),
        }
    }

    /// `true` when the accessor is backed by an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `i`. Callers iterate below the frame's item count, which has
    /// already been checked against this accessor's length; a read past the
    /// end yields NaN, which every primitive skips.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        match self {
            Self::Broadcast(v) => *v,
            Self::Indexed(b) => b.get(i).unwrap_or(f64::NAN),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/args.rs"]
mod tests;
