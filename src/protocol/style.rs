use crate::foundation::color::Rgba;
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::protocol::args::{Argument, NumberAccessor, TypedBuffer};

#[derive(Clone, Copy, Debug)]
enum Channels<'a> {
    Fixed(Rgba),
    Packed(&'a TypedBuffer),
}

/// Per-item `rgba(r, g, b, a)` lookup for styled batch primitives.
///
/// Colour is packed as three channel values per item; alpha is a separate
/// scalar-or-array. Each side indexes with `i` while `i` is below its declared
/// length and falls back to slot 0 past it, so one declared style covers any
/// number of geometric items.
#[derive(Clone, Copy, Debug)]
pub struct ColorAccessor<'a> {
    precomputed: Option<Rgba>,
    channels: Channels<'a>,
    color_len: usize,
    alpha: NumberAccessor<'a>,
    alpha_len: usize,
    alpha_scale: f64,
}

impl<'a> ColorAccessor<'a> {
    /// Build an accessor from the `color` and `alpha` arguments of a styled command.
    ///
    /// `color` is a buffer of `3 * n` channel values or a CSS colour string.
    pub fn new(color: &'a Argument, alpha: &'a Argument) -> BridgeResult<Self> {
        let (channels, color_len, css_alpha) = match color {
            Argument::Buffer { data, .. } => {
                if data.is_empty() || data.len() % 3 != 0 {
                    return Err(BridgeError::protocol(format!(
                        "colour buffer of {} values is not a whole number of rgb triples",
                        data.len()
                    )));
                }
                (Channels::Packed(data), data.len() / 3, 1.0)
            }
            Argument::Scalar(serde_json::Value::String(s)) => {
                let c = Rgba::parse(s).map_err(|e| BridgeError::protocol(e.to_string()))?;
                (Channels::Fixed(Rgba { a: 1.0, ..c }), 1, c.a)
            }
            Argument::Scalar(other) => {
                return Err(BridgeError::protocol(format!(
                    "colour must be a buffer or a css string, got {other}"
                )));
            }
        };

        let alpha_acc = if alpha.is_null() {
            NumberAccessor::Broadcast(1.0)
        } else {
            alpha.numbers()?
        };
        let alpha_len = alpha_acc.len();
        if alpha_len == 0 {
            return Err(BridgeError::protocol("alpha buffer is empty"));
        }

        let mut out = Self {
            precomputed: None,
            channels,
            color_len,
            alpha: alpha_acc,
            alpha_len,
            alpha_scale: css_alpha,
        };
        if color_len == 1 && alpha_len == 1 {
            out.precomputed = Some(out.lookup(0));
        }
        Ok(out)
    }

    /// Declared colour length in items.
    pub fn color_len(&self) -> usize {
        self.color_len
    }

    /// Declared alpha length in items.
    pub fn alpha_len(&self) -> usize {
        self.alpha_len
    }

    /// Style for item `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Rgba {
        match self.precomputed {
            Some(c) => c,
            None => self.lookup(i),
        }
    }

    fn lookup(&self, i: usize) -> Rgba {
        let ci = if i < self.color_len { i * 3 } else { 0 };
        let ai = if i < self.alpha_len { i } else { 0 };
        let (r, g, b) = match self.channels {
            Channels::Fixed(c) => (c.r, c.g, c.b),
            Channels::Packed(buf) => (
                buf.get(ci).unwrap_or(0.0),
                buf.get(ci + 1).unwrap_or(0.0),
                buf.get(ci + 2).unwrap_or(0.0),
            ),
        };
        Rgba::new(r, g, b, self.alpha.get(ai) * self.alpha_scale)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/style.rs"]
mod tests;
