use std::ops::Range;
use std::sync::Arc;

use serde_json::Value;
use smallvec::SmallVec;

use crate::foundation::error::{BridgeError, BridgeResult};
use crate::protocol::args::{Argument, DType, Shape, TypedBuffer};
use crate::protocol::table::Opcode;

/// What to do with the rest of a batch once one command fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorPolicy {
    /// Log and record the failure, then run the remaining commands.
    #[default]
    SkipAndContinue,
    /// Stop at the first failing command.
    Abort,
}

/// Decoder configuration.
#[derive(Clone, Debug, Default)]
pub struct DecodeOpts {
    /// Batch policy for failing commands.
    pub error_policy: ErrorPolicy,
}

impl DecodeOpts {
    /// Set the batch error policy.
    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }
}

/// Argument list of one command; most commands carry at most eight.
pub type Args = SmallVec<[Argument; 8]>;

/// One decoded, executable command.
#[derive(Clone, Debug)]
pub struct Command {
    /// Resolved operation.
    pub opcode: Opcode,
    /// Arguments, buffer references already resolved.
    pub args: Args,
    /// Sequential position in the flattened batch.
    pub position: usize,
    /// Range of the message's buffer pool this command consumed.
    pub buffers: Range<usize>,
}

impl Command {
    /// Argument `i`, or a protocol error naming the command.
    pub fn arg(&self, i: usize) -> BridgeResult<&Argument> {
        self.args.get(i).ok_or_else(|| {
            BridgeError::protocol(format!(
                "{} expects at least {} arguments, got {}",
                self.opcode,
                i + 1,
                self.args.len()
            ))
        })
    }

    /// Optional argument `i`: absent and `null` both read as `None`.
    pub fn opt_arg(&self, i: usize) -> Option<&Argument> {
        self.args.get(i).filter(|a| !a.is_null())
    }

    /// Numeric argument `i`.
    pub fn f64_arg(&self, i: usize) -> BridgeResult<f64> {
        self.arg(i)?.as_f64()
    }
}

/// A command that failed to decode or execute.
#[derive(Debug)]
pub struct CommandFailure {
    /// Sequential position in the flattened batch.
    pub position: usize,
    /// Operation, when the opcode itself resolved.
    pub opcode: Option<Opcode>,
    /// What went wrong.
    pub error: BridgeError,
}

/// Outcome of running one message.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Commands that ran to completion.
    pub executed: usize,
    /// Commands that executed and change drawing state or pixels.
    pub mutating: usize,
    /// Failures in order of occurrence.
    pub failures: Vec<CommandFailure>,
    /// `true` when [`ErrorPolicy::Abort`] stopped the batch early.
    pub aborted: bool,
}

impl BatchReport {
    /// `true` when every command ran.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report (from a nested run) into this one.
    pub fn absorb(&mut self, other: BatchReport) {
        self.executed += other.executed;
        self.mutating += other.mutating;
        self.failures.extend(other.failures);
        self.aborted |= other.aborted;
    }
}

/// Streaming decoder for command messages.
///
/// Commands are handed to the caller's executor one at a time, in list order,
/// as soon as they are decoded. The buffer cursor advances by each command's
/// declared `bufferCount` whether or not the command succeeds.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    opts: DecodeOpts,
}

impl Decoder {
    /// Create a decoder with the given options.
    pub fn new(opts: DecodeOpts) -> Self {
        Self { opts }
    }

    /// Active options.
    pub fn opts(&self) -> &DecodeOpts {
        &self.opts
    }

    /// Decode a widget message and run each command through `exec`.
    ///
    /// A message whose payload is a buffer descriptor (`{"dtype": "uint8", ...}`)
    /// carries its JSON command list in `buffers[0]`; the remaining buffers form
    /// the argument pool. Any other payload is the command structure itself.
    #[tracing::instrument(skip_all, fields(buffers = buffers.len()))]
    pub fn run_message<F>(&self, message: &Value, buffers: &[Arc<[u8]>], exec: F) -> BatchReport
    where
        F: FnMut(&Command) -> BridgeResult<()>,
    {
        if is_meta_descriptor(message) {
            let parsed = buffers
                .first()
                .ok_or_else(|| BridgeError::protocol("meta-encoded message without a buffer"))
                .and_then(|b| serde_json::from_slice::<Value>(b).map_err(BridgeError::from));
            return match parsed {
                Ok(commands) => self.run(&commands, &buffers[1..], exec),
                Err(error) => {
                    tracing::warn!(%error, "dropping undecodable command message");
                    BatchReport {
                        failures: vec![CommandFailure {
                            position: 0,
                            opcode: None,
                            error,
                        }],
                        aborted: true,
                        ..BatchReport::default()
                    }
                }
            };
        }
        self.run(message, buffers, exec)
    }

    /// Decode a command (or batch of commands) against a buffer pool.
    pub fn run<F>(&self, commands: &Value, buffers: &[Arc<[u8]>], mut exec: F) -> BatchReport
    where
        F: FnMut(&Command) -> BridgeResult<()>,
    {
        let mut walk = Walk {
            policy: self.opts.error_policy,
            pool: buffers,
            cursor: 0,
            position: 0,
            report: BatchReport::default(),
            exec: &mut exec,
        };
        if is_batch(commands) {
            walk.batch(commands);
        } else {
            walk.single_top_level(commands);
        }
        walk.report
    }
}

struct Walk<'a, F> {
    policy: ErrorPolicy,
    pool: &'a [Arc<[u8]>],
    cursor: usize,
    position: usize,
    report: BatchReport,
    exec: &'a mut F,
}

impl<F> Walk<'_, F>
where
    F: FnMut(&Command) -> BridgeResult<()>,
{
    /// Returns `false` once the batch must stop.
    fn batch(&mut self, value: &Value) -> bool {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(obj) => match obj.get("commands") {
                Some(Value::Array(items)) => items,
                _ => return self.fail(None, BridgeError::protocol("batch marker without commands")),
            },
            _ => return true,
        };
        for item in items {
            let keep_going = if is_batch(item) {
                self.batch(item)
            } else {
                self.leaf(item)
            };
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// A lone top-level command may omit its buffer count; it sees the whole pool.
    fn single_top_level(&mut self, value: &Value) {
        let declared = raw_parts(value).ok().and_then(|p| p.buffer_count);
        let count = declared.unwrap_or(self.pool.len());
        self.leaf_with_count(value, count);
    }

    fn leaf(&mut self, value: &Value) -> bool {
        let count = raw_parts(value)
            .ok()
            .and_then(|p| p.buffer_count)
            .unwrap_or(0);
        self.leaf_with_count(value, count)
    }

    fn leaf_with_count(&mut self, value: &Value, count: usize) -> bool {
        let start = self.cursor;
        let end = start.saturating_add(count);
        let overflow = end > self.pool.len();
        self.cursor = end.min(self.pool.len());
        let span = start..self.cursor;

        let position = self.position;
        self.position += 1;

        let parts = match raw_parts(value) {
            Ok(p) => p,
            Err(e) => return self.fail_at(position, None, e),
        };
        let opcode = match parts.opcode() {
            Ok(op) => op,
            Err(e) => return self.fail_at(position, None, e),
        };
        if overflow {
            return self.fail_at(
                position,
                Some(opcode),
                BridgeError::protocol(format!(
                    "{opcode} declares {count} buffers but only {} remain",
                    self.pool.len() - start
                )),
            );
        }
        let local = &self.pool[span.clone()];
        let args = match parts
            .args
            .iter()
            .map(|a| resolve_argument(a, local))
            .collect::<BridgeResult<Args>>()
        {
            Ok(a) => a,
            Err(e) => return self.fail_at(position, Some(opcode), e),
        };

        let cmd = Command {
            opcode,
            args,
            position,
            buffers: span,
        };
        match (self.exec)(&cmd) {
            Ok(()) => {
                self.report.executed += 1;
                if opcode.is_mutating() {
                    self.report.mutating += 1;
                }
                true
            }
            Err(e) => self.fail_at(position, Some(opcode), e),
        }
    }

    fn fail(&mut self, opcode: Option<Opcode>, error: BridgeError) -> bool {
        let position = self.position;
        self.fail_at(position, opcode, error)
    }

    fn fail_at(&mut self, position: usize, opcode: Option<Opcode>, error: BridgeError) -> bool {
        let name = opcode.map_or("<unknown>", Opcode::name);
        let abort = self.policy == ErrorPolicy::Abort;
        tracing::warn!(position, command = name, %error, abort, "command failed");
        self.report.failures.push(CommandFailure {
            position,
            opcode,
            error,
        });
        if abort {
            self.report.aborted = true;
        }
        !abort
    }
}

/// A list whose first element is itself a command (list or `{"name", ...}`
/// object), or an explicit `{"commands": [...]}` marker, is a batch.
fn is_batch(value: &Value) -> bool {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Array(_)) => true,
            Some(Value::Object(obj)) => obj.contains_key("name"),
            _ => false,
        },
        Value::Object(obj) => obj.contains_key("commands"),
        _ => false,
    }
}

fn is_meta_descriptor(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if obj.contains_key("dtype") && !obj.contains_key("idx"))
}

struct RawParts<'v> {
    op: &'v Value,
    args: SmallVec<[&'v Value; 8]>,
    buffer_count: Option<usize>,
}

impl RawParts<'_> {
    fn opcode(&self) -> BridgeResult<Opcode> {
        match self.op {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| BridgeError::protocol(format!("invalid opcode {n}")))
                .and_then(Opcode::from_index),
            Value::String(s) => Opcode::from_name(s),
            other => Err(BridgeError::protocol(format!("invalid opcode {other}"))),
        }
    }
}

/// Split `[opcode, args?, bufferCount?]` or `{"name", "args", "nbuffers"}`.
fn raw_parts(value: &Value) -> BridgeResult<RawParts<'_>> {
    match value {
        Value::Array(items) => {
            let op = items
                .first()
                .ok_or_else(|| BridgeError::protocol("empty command"))?;
            let args = match items.get(1) {
                None | Some(Value::Null) => SmallVec::new(),
                Some(Value::Array(a)) => a.iter().collect(),
                Some(other) => {
                    return Err(BridgeError::protocol(format!(
                        "command arguments must be a list, got {other}"
                    )));
                }
            };
            let buffer_count = match items.get(2) {
                None | Some(Value::Null) => None,
                Some(v) => Some(as_count(v)?),
            };
            Ok(RawParts {
                op,
                args,
                buffer_count,
            })
        }
        Value::Object(obj) => {
            let op = obj
                .get("name")
                .ok_or_else(|| BridgeError::protocol("command object without 'name'"))?;
            let mut args: SmallVec<[&Value; 8]> = match obj.get("args") {
                Some(Value::Array(a)) => a.iter().collect(),
                _ => SmallVec::new(),
            };
            if let (Some(attr), Some(v)) = (obj.get("attr"), obj.get("value")) {
                args.push(attr);
                args.push(v);
            }
            let buffer_count = match obj.get("nbuffers") {
                None | Some(Value::Null) => None,
                Some(v) => Some(as_count(v)?),
            };
            Ok(RawParts {
                op,
                args,
                buffer_count,
            })
        }
        other => Err(BridgeError::protocol(format!(
            "command must be a list or object, got {other}"
        ))),
    }
}

fn as_count(v: &Value) -> BridgeResult<usize> {
    v.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| BridgeError::protocol(format!("invalid buffer count {v}")))
}

/// Resolve one argument descriptor against the command's local buffer slice.
pub(crate) fn resolve_argument(value: &Value, local: &[Arc<[u8]>]) -> BridgeResult<Argument> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(Argument::Scalar(value.clone()))
        }
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| {
                        BridgeError::protocol(format!("inline array holds non-number {v}"))
                    })
                })
                .collect::<BridgeResult<Vec<f64>>>()?;
            Ok(Argument::Buffer {
                data: TypedBuffer::from_f64s(&values),
                shape: None,
            })
        }
        Value::Object(obj) => {
            let idx = obj
                .get("idx")
                .ok_or_else(|| BridgeError::protocol("buffer reference without 'idx'"))
                .and_then(as_count)?;
            let dtype = obj
                .get("dtype")
                .and_then(Value::as_str)
                .ok_or_else(|| BridgeError::protocol("buffer reference without 'dtype'"))
                .and_then(DType::parse)?;
            let bytes = local.get(idx).ok_or_else(|| {
                BridgeError::protocol(format!(
                    "buffer index {idx} outside the command's {} buffers",
                    local.len()
                ))
            })?;
            let shape = match obj.get("shape") {
                Some(Value::Array(dims)) => Some(
                    dims.iter()
                        .map(as_count)
                        .collect::<BridgeResult<Shape>>()?,
                ),
                _ => None,
            };
            Ok(Argument::Buffer {
                data: TypedBuffer::new(dtype, Arc::clone(bytes))?,
                shape,
            })
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/decode.rs"]
mod tests;
