use crate::foundation::error::{BridgeError, BridgeResult};

/// A CSS-style colour: `r`, `g`, `b` in `0..=255`, `a` in `0..=1`.
///
/// `Display` renders the `rgba(r, g, b, a)` style string the Canvas2D
/// contract accepts, which is also what batched styled primitives produce.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    /// Red channel, `0..=255`.
    pub r: f64,
    /// Green channel, `0..=255`.
    pub g: f64,
    /// Blue channel, `0..=255`.
    pub b: f64,
    /// Alpha, `0..=1`.
    pub a: f64,
}

impl Rgba {
    /// Opaque black, the Canvas2D default for fill and stroke.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Build a colour from raw channel values.
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS colour string (`#rgb[a]`, `#rrggbb[aa]`, `rgb()`, `rgba()`,
    /// `hsl()`, `hsla()` or a basic named colour).
    pub fn parse(s: &str) -> BridgeResult<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).map_err(BridgeError::validation);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(body) = func_body(&lower, "rgba").or_else(|| func_body(&lower, "rgb")) {
            let v = parse_components(body)?;
            return match v.as_slice() {
                [r, g, b] => Ok(Self::new(r.0, g.0, b.0, 1.0)),
                [r, g, b, a] => Ok(Self::new(r.0, g.0, b.0, alpha_of(*a))),
                _ => Err(BridgeError::validation(format!("bad rgb() colour '{s}'"))),
            };
        }
        if let Some(body) = func_body(&lower, "hsla").or_else(|| func_body(&lower, "hsl")) {
            let v = parse_components(body)?;
            return match v.as_slice() {
                [h, sat, l] => Ok(hsla_to_rgba(h.0, sat.0 / 100.0, l.0 / 100.0, 1.0)),
                [h, sat, l, a] => Ok(hsla_to_rgba(h.0, sat.0 / 100.0, l.0 / 100.0, alpha_of(*a))),
                _ => Err(BridgeError::validation(format!("bad hsl() colour '{s}'"))),
            };
        }
        named(&lower).ok_or_else(|| BridgeError::validation(format!("unknown colour '{s}'")))
    }

    /// Straight-alpha RGBA8 with channels clamped and rounded.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn to_u8(x: f64) -> u8 {
            x.clamp(0.0, 255.0).round() as u8
        }
        [
            to_u8(self.r),
            to_u8(self.g),
            to_u8(self.b),
            to_u8(self.a.clamp(0.0, 1.0) * 255.0),
        ]
    }

    /// Same colour with alpha multiplied by `k` (used for `globalAlpha`).
    pub fn with_alpha_mul(self, k: f64) -> Self {
        Self {
            a: (self.a * k).clamp(0.0, 1.0),
            ..self
        }
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl std::str::FromStr for Rgba {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn func_body<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Split `a, b, c[, d]` (or the space/slash syntax) into `(value, is_percent)` pairs.
fn parse_components(body: &str) -> BridgeResult<Vec<(f64, bool)>> {
    body.split([',', ' ', '/'])
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (num, pct) = match p.strip_suffix('%') {
                Some(n) => (n, true),
                None => (p.strip_suffix("deg").unwrap_or(p), false),
            };
            let v: f64 = num
                .parse()
                .map_err(|_| BridgeError::validation(format!("bad colour component '{p}'")))?;
            Ok((v, pct))
        })
        .collect()
}

fn alpha_of((v, pct): (f64, bool)) -> f64 {
    if pct { v / 100.0 } else { v }
}

fn parse_hex(s: &str) -> Result<Rgba, String> {
    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }
    fn hex_nibble(c: &str) -> Result<u8, String> {
        let v = u8::from_str_radix(c, 16).map_err(|_| format!("invalid hex digit \"{c}\""))?;
        Ok(v * 17)
    }

    if !s.is_ascii() {
        return Err("hex colour must be ascii".to_owned());
    }
    let (r, g, b, a) = match s.len() {
        3 | 4 => {
            let r = hex_nibble(&s[0..1])?;
            let g = hex_nibble(&s[1..2])?;
            let b = hex_nibble(&s[2..3])?;
            let a = if s.len() == 4 {
                hex_nibble(&s[3..4])?
            } else {
                255
            };
            (r, g, b, a)
        }
        6 | 8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = if s.len() == 8 {
                hex_byte(&s[6..8])?
            } else {
                255
            };
            (r, g, b, a)
        }
        _ => return Err("hex colour must be #RGB, #RGBA, #RRGGBB or #RRGGBBAA".to_owned()),
    };
    Ok(Rgba::new(
        f64::from(r),
        f64::from(g),
        f64::from(b),
        f64::from(a) / 255.0,
    ))
}

fn hsla_to_rgba(h: f64, s: f64, l: f64, a: f64) -> Rgba {
    let h = (h % 360.0 + 360.0) % 360.0 / 360.0;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return Rgba::new(l * 255.0, l * 255.0, l * 255.0, a);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;

    Rgba::new(
        hue_to_rgb(p, q, h + 1.0 / 3.0) * 255.0,
        hue_to_rgb(p, q, h) * 255.0,
        hue_to_rgb(p, q, h - 1.0 / 3.0) * 255.0,
        a,
    )
}

fn named(s: &str) -> Option<Rgba> {
    let (r, g, b) = match s {
        "transparent" => return Some(Rgba::TRANSPARENT),
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "lime" => (0, 255, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "navy" => (0, 0, 128),
        "purple" => (128, 0, 128),
        "teal" => (0, 128, 128),
        "orange" => (255, 165, 0),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        _ => return None,
    };
    Some(Rgba::new(f64::from(r), f64::from(g), f64::from(b), 1.0))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
