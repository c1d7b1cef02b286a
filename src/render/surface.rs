use std::sync::Arc;

use crate::foundation::color::Rgba;
use crate::foundation::core::{Affine, Bitmap, CanvasSize};
use crate::foundation::error::{BridgeError, BridgeResult};

/// Colour stop of a gradient, `offset` in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// Position along the gradient.
    pub offset: f64,
    /// Colour at this position.
    pub color: Rgba,
}

/// Gradient geometry, in user space at the time the paint is used.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum GradientKind {
    /// Linear gradient from `(x0, y0)` to `(x1, y1)`.
    Linear {
        /// Start x.
        x0: f64,
        /// Start y.
        y0: f64,
        /// End x.
        x1: f64,
        /// End y.
        y1: f64,
    },
    /// Two-circle radial gradient.
    Radial {
        /// Start circle centre x.
        x0: f64,
        /// Start circle centre y.
        y0: f64,
        /// Start radius.
        r0: f64,
        /// End circle centre x.
        x1: f64,
        /// End circle centre y.
        y1: f64,
        /// End radius.
        r1: f64,
    },
}

/// A linear or radial gradient paint.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gradient {
    /// Geometry.
    pub kind: GradientKind,
    /// Stops sorted by offset.
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    /// Build a gradient; stops are sorted by offset.
    pub fn new(kind: GradientKind, mut stops: Vec<GradientStop>) -> Self {
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Self { kind, stops }
    }

    /// Interpolated colour at parameter `t` (clamped to the stop range).
    pub fn color_at(&self, t: f64) -> Rgba {
        let Some(first) = self.stops.first() else {
            return Rgba::TRANSPARENT;
        };
        if t <= first.offset {
            return first.color;
        }
        for w in self.stops.windows(2) {
            let (a, b) = (w[0], w[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                let k = if span <= 0.0 { 1.0 } else { (t - a.offset) / span };
                let lerp = |x: f64, y: f64| x + (y - x) * k;
                return Rgba::new(
                    lerp(a.color.r, b.color.r),
                    lerp(a.color.g, b.color.g),
                    lerp(a.color.b, b.color.b),
                    lerp(a.color.a, b.color.a),
                );
            }
        }
        self.stops.last().map_or(Rgba::TRANSPARENT, |s| s.color)
    }

    /// Gradient parameter for a user-space point, or `None` where a radial
    /// gradient is undefined.
    pub fn param_at(&self, x: f64, y: f64) -> Option<f64> {
        match self.kind {
            GradientKind::Linear { x0, y0, x1, y1 } => {
                let (dx, dy) = (x1 - x0, y1 - y0);
                let len2 = dx * dx + dy * dy;
                if len2 <= f64::EPSILON {
                    return None;
                }
                Some(((x - x0) * dx + (y - y0) * dy) / len2)
            }
            GradientKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            } => {
                // Largest t with r(t) >= 0 such that |p - c(t)| == r(t).
                let (cdx, cdy, dr) = (x1 - x0, y1 - y0, r1 - r0);
                let (px, py) = (x - x0, y - y0);
                let a = cdx * cdx + cdy * cdy - dr * dr;
                let b = px * cdx + py * cdy + r0 * dr;
                let c = px * px + py * py - r0 * r0;
                let valid = |t: f64| r0 + t * dr >= 0.0;
                if a.abs() < 1e-12 {
                    if b.abs() < 1e-12 {
                        return None;
                    }
                    let t = c / (2.0 * b);
                    return valid(t).then_some(t);
                }
                let disc = b * b - a * c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                let (t1, t2) = ((b + sq) / a, (b - sq) / a);
                let (hi, lo) = if t1 >= t2 { (t1, t2) } else { (t2, t1) };
                if valid(hi) {
                    Some(hi)
                } else if valid(lo) {
                    Some(lo)
                } else {
                    None
                }
            }
        }
    }
}

/// Tiling mode of a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Repetition {
    /// Tile in both directions.
    #[default]
    Repeat,
    /// Tile horizontally only.
    RepeatX,
    /// Tile vertically only.
    RepeatY,
    /// Draw the source once.
    NoRepeat,
}

impl Repetition {
    /// Parse `repeat`, `repeat-x`, `repeat-y` or `no-repeat` (empty means `repeat`).
    pub fn parse(s: &str) -> BridgeResult<Self> {
        Ok(match s {
            "" | "repeat" => Self::Repeat,
            "repeat-x" => Self::RepeatX,
            "repeat-y" => Self::RepeatY,
            "no-repeat" => Self::NoRepeat,
            other => {
                return Err(BridgeError::validation(format!(
                    "unknown pattern repetition '{other}'"
                )));
            }
        })
    }
}

/// An image pattern paint.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    /// Source pixels.
    pub image: Arc<Bitmap>,
    /// Tiling.
    pub repetition: Repetition,
}

impl Pattern {
    /// Straight RGBA8 texel for a user-space point, or `None` outside the tiling.
    pub fn texel_at(&self, x: f64, y: f64) -> Option<[u8; 4]> {
        let (w, h) = (f64::from(self.image.width), f64::from(self.image.height));
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let tile = |v: f64, len: f64, repeat: bool| -> Option<u32> {
            if repeat {
                Some(v.rem_euclid(len).floor() as u32)
            } else if (0.0..len).contains(&v) {
                Some(v.floor() as u32)
            } else {
                None
            }
        };
        let (rx, ry) = match self.repetition {
            Repetition::Repeat => (true, true),
            Repetition::RepeatX => (true, false),
            Repetition::RepeatY => (false, true),
            Repetition::NoRepeat => (false, false),
        };
        let tx = tile(x, w, rx)?;
        let ty = tile(y, h, ry)?;
        self.image.pixel(tx, ty)
    }
}

/// Fill or stroke source.
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    /// Solid colour.
    Color(Rgba),
    /// Linear or radial gradient.
    Gradient(Arc<Gradient>),
    /// Image pattern.
    Pattern(Arc<Pattern>),
}

impl Default for Paint {
    fn default() -> Self {
        Self::Color(Rgba::BLACK)
    }
}

/// Winding rule for `fill` and `clip`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillRule {
    /// `nonzero`.
    #[default]
    NonZero,
    /// `evenodd`.
    EvenOdd,
}

impl FillRule {
    /// Parse `nonzero` / `evenodd`.
    pub fn parse(s: &str) -> BridgeResult<Self> {
        match s {
            "nonzero" => Ok(Self::NonZero),
            "evenodd" => Ok(Self::EvenOdd),
            other => Err(BridgeError::protocol(format!("unknown fill rule '{other}'"))),
        }
    }
}

/// `lineCap` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// `lineJoin` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// `textAlign` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
}

/// `textBaseline` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TextBaseline {
    Top,
    Hanging,
    Middle,
    #[default]
    Alphabetic,
    Ideographic,
    Bottom,
}

fn keyword_error(what: &str, value: &str) -> BridgeError {
    BridgeError::protocol(format!("unknown {what} '{value}'"))
}

impl LineCap {
    /// Parse `butt`, `round` or `square`.
    pub fn parse(s: &str) -> BridgeResult<Self> {
        match s {
            "butt" => Ok(Self::Butt),
            "round" => Ok(Self::Round),
            "square" => Ok(Self::Square),
            other => Err(keyword_error("line cap", other)),
        }
    }
}

impl LineJoin {
    /// Parse `miter`, `round` or `bevel`.
    pub fn parse(s: &str) -> BridgeResult<Self> {
        match s {
            "miter" => Ok(Self::Miter),
            "round" => Ok(Self::Round),
            "bevel" => Ok(Self::Bevel),
            other => Err(keyword_error("line join", other)),
        }
    }
}

impl TextAlign {
    /// Parse a `textAlign` keyword.
    pub fn parse(s: &str) -> BridgeResult<Self> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            other => Err(keyword_error("text align", other)),
        }
    }
}

impl TextBaseline {
    /// Parse a `textBaseline` keyword.
    pub fn parse(s: &str) -> BridgeResult<Self> {
        match s {
            "top" => Ok(Self::Top),
            "hanging" => Ok(Self::Hanging),
            "middle" => Ok(Self::Middle),
            "alphabetic" => Ok(Self::Alphabetic),
            "ideographic" => Ok(Self::Ideographic),
            "bottom" => Ok(Self::Bottom),
            other => Err(keyword_error("text baseline", other)),
        }
    }
}

/// `globalCompositeOperation` values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CompositeOp {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    SourceAtop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl CompositeOp {
    /// Parse a CSS composite / blend keyword.
    pub fn parse(s: &str) -> BridgeResult<Self> {
        Ok(match s {
            "source-over" => Self::SourceOver,
            "source-in" => Self::SourceIn,
            "source-out" => Self::SourceOut,
            "source-atop" => Self::SourceAtop,
            "destination-over" => Self::DestinationOver,
            "destination-in" => Self::DestinationIn,
            "destination-out" => Self::DestinationOut,
            "destination-atop" => Self::DestinationAtop,
            "lighter" => Self::Lighter,
            "copy" => Self::Copy,
            "xor" => Self::Xor,
            "multiply" => Self::Multiply,
            "screen" => Self::Screen,
            "overlay" => Self::Overlay,
            "darken" => Self::Darken,
            "lighten" => Self::Lighten,
            "color-dodge" => Self::ColorDodge,
            "color-burn" => Self::ColorBurn,
            "hard-light" => Self::HardLight,
            "soft-light" => Self::SoftLight,
            "difference" => Self::Difference,
            "exclusion" => Self::Exclusion,
            "hue" => Self::Hue,
            "saturation" => Self::Saturation,
            "color" => Self::Color,
            "luminosity" => Self::Luminosity,
            other => {
                return Err(BridgeError::protocol(format!(
                    "unknown composite operation '{other}'"
                )));
            }
        })
    }
}

/// One typed drawing-state assignment, produced from a `set` command.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum StyleSetting {
    FillStyle(Paint),
    StrokeStyle(Paint),
    GlobalAlpha(f64),
    Font(String),
    TextAlign(TextAlign),
    TextBaseline(TextBaseline),
    Direction(String),
    GlobalCompositeOperation(CompositeOp),
    LineWidth(f64),
    LineCap(LineCap),
    LineJoin(LineJoin),
    MiterLimit(f64),
    LineDashOffset(f64),
    ShadowOffsetX(f64),
    ShadowOffsetY(f64),
    ShadowBlur(f64),
    ShadowColor(Rgba),
    Filter(String),
    ImageSmoothingEnabled(bool),
}

/// Immediate-mode 2D drawing surface with Canvas2D semantics.
///
/// Numeric arguments that are not finite make the call a no-op, as in Canvas2D.
pub trait DrawingSurface {
    /// Backing-store size.
    fn size(&self) -> CanvasSize;
    /// Re-establish the backing store. Existing pixels and drawing state are discarded.
    fn resize(&mut self, size: CanvasSize);

    /// Apply one drawing-state assignment.
    fn apply_style(&mut self, setting: &StyleSetting);
    /// Push the drawing state.
    fn save(&mut self);
    /// Pop the drawing state; a no-op on an empty stack.
    fn restore(&mut self);

    /// Post-multiply the current transform.
    fn transform(&mut self, m: Affine);
    /// Replace the current transform.
    fn set_transform(&mut self, m: Affine);
    /// Reset to identity.
    fn reset_transform(&mut self) {
        self.set_transform(Affine::IDENTITY);
    }
    /// `translate(x, y)`.
    fn translate(&mut self, x: f64, y: f64) {
        self.transform(Affine::translate((x, y)));
    }
    /// `rotate(angle)`, radians clockwise in canvas space.
    fn rotate(&mut self, angle: f64) {
        self.transform(Affine::rotate(angle));
    }
    /// `scale(x, y)`.
    fn scale(&mut self, x: f64, y: f64) {
        self.transform(Affine::scale_non_uniform(x, y));
    }

    /// Start a new path.
    fn begin_path(&mut self);
    /// Close the current sub-path.
    fn close_path(&mut self);
    /// Start a sub-path.
    fn move_to(&mut self, x: f64, y: f64);
    /// Straight segment.
    fn line_to(&mut self, x: f64, y: f64);
    /// Closed rectangle sub-path.
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    /// Circular arc, joined to the current point by a line.
    fn arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64, anticlockwise: bool);
    /// Elliptical arc.
    #[allow(clippy::too_many_arguments)]
    fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        rx: f64,
        ry: f64,
        rotation: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    );
    /// Tangent arc between two lines.
    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, r: f64);
    /// Quadratic Bézier segment.
    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64);
    /// Cubic Bézier segment.
    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64);

    /// Fill the current path.
    fn fill(&mut self, rule: FillRule);
    /// Stroke the current path.
    fn stroke(&mut self);
    /// Intersect the clip region with the current path.
    fn clip(&mut self, rule: FillRule);

    /// Fill a rectangle without touching the current path.
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    /// Stroke a rectangle without touching the current path.
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    /// Set pixels in a rectangle to transparent black.
    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64);

    /// Draw filled text.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>);
    /// Draw outlined text.
    fn stroke_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>);
    /// Dash pattern for subsequent strokes.
    fn set_line_dash(&mut self, segments: &[f64]);

    /// Draw an image, transformed and composited.
    fn draw_image(&mut self, image: &Bitmap, dx: f64, dy: f64, dw: Option<f64>, dh: Option<f64>);
    /// Replace device pixels, ignoring transform, clip, alpha and compositing.
    fn put_image_data(&mut self, image: &Bitmap, dx: i64, dy: i64);

    /// Wipe the whole surface to transparent.
    fn clear(&mut self);
    /// Read back the current pixels.
    fn read_pixels(&mut self) -> Bitmap;
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
