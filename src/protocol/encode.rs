use std::sync::Arc;

use serde_json::{Value, json};

use crate::protocol::args::DType;
use crate::protocol::table::{Opcode, StyleAttribute};

/// One argument handed to [`CommandBuilder::push`].
#[derive(Clone, Debug)]
pub enum Arg {
    /// Literal scalar (number, bool, string or null).
    Value(Value),
    /// `float32` buffer.
    F32(Vec<f32>),
    /// `float64` buffer.
    F64(Vec<f64>),
    /// `int32` buffer.
    I32(Vec<i32>),
    /// `uint8` buffer with an optional shape (`[h, w, c]` for raw pixels).
    U8 {
        /// Bytes.
        data: Vec<u8>,
        /// Optional shape.
        shape: Option<Vec<usize>>,
    },
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Self::Value(json!(v))
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Self::Value(json!(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Self::Value(json!(v))
    }
}

enum Wire {
    Literal(Value),
    Buffer {
        dtype: DType,
        shape: Option<Vec<usize>>,
        bytes: Vec<u8>,
    },
}

impl Arg {
    fn into_wire(self) -> Wire {
        let le = |dtype, bytes| Wire::Buffer {
            dtype,
            shape: None,
            bytes,
        };
        match self {
            Self::Value(v) => Wire::Literal(v),
            Self::F32(v) => le(
                DType::Float32,
                v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ),
            Self::F64(v) => le(
                DType::Float64,
                v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ),
            Self::I32(v) => le(
                DType::Int32,
                v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ),
            Self::U8 { data, shape } => Wire::Buffer {
                dtype: DType::Uint8,
                shape,
                bytes: data,
            },
        }
    }
}

/// Producer-side encoder for the command wire format.
///
/// Each pushed command becomes a `[opcode, args, bufferCount]` triple; buffer
/// arguments are appended to the shared pool and referenced by an index local
/// to the command's own slice of that pool.
#[derive(Clone, Debug, Default)]
pub struct CommandBuilder {
    commands: Vec<Value>,
    buffers: Vec<Arc<[u8]>>,
}

impl CommandBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one command.
    pub fn push(&mut self, opcode: Opcode, args: impl IntoIterator<Item = Arg>) -> &mut Self {
        let mut wire_args = Vec::new();
        let mut local = 0usize;
        for arg in args {
            match arg.into_wire() {
                Wire::Buffer {
                    dtype,
                    shape,
                    bytes,
                } => {
                    let mut desc = json!({ "idx": local, "dtype": dtype.name() });
                    if let Some(shape) = shape {
                        desc["shape"] = json!(shape);
                    }
                    wire_args.push(desc);
                    self.buffers.push(bytes.into());
                    local += 1;
                }
                Wire::Literal(value) => wire_args.push(value),
            }
        }
        self.commands
            .push(json!([opcode.index(), wire_args, local]));
        self
    }

    /// Append a `set` command for one style attribute.
    pub fn set(&mut self, attr: StyleAttribute, value: impl Into<Value>) -> &mut Self {
        self.push(
            Opcode::Set,
            [Arg::Value(json!(attr as u8)), Arg::Value(value.into())],
        )
    }

    /// Number of commands pushed so far.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` when nothing was pushed.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Batch payload (a list of triples) plus its buffer pool.
    pub fn finish(self) -> (Value, Vec<Arc<[u8]>>) {
        (Value::Array(self.commands), self.buffers)
    }

    /// Meta-encoded message: the command list travels as JSON in buffer 0.
    pub fn finish_meta(self) -> (Value, Vec<Arc<[u8]>>) {
        let json = Value::Array(self.commands).to_string().into_bytes();
        let descriptor = json!({ "dtype": "uint8", "shape": [json.len()] });
        let mut buffers = Vec::with_capacity(self.buffers.len() + 1);
        buffers.push(Arc::<[u8]>::from(json));
        buffers.extend(self.buffers);
        (descriptor, buffers)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/encode.rs"]
mod tests;
