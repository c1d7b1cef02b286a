use std::sync::Arc;
use std::time::Duration;

use crate::canvas::snapshot::decode_image;
use crate::foundation::color::Rgba;
use crate::foundation::core::{Affine, Bitmap, CanvasId};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::protocol::args::{Argument, DType};
use crate::protocol::decode::Command;
use crate::protocol::table::{Opcode, StyleAttribute};
use crate::render::batch::{BatchExecutor, Mode};
use crate::render::primitives::{PrimitiveRenderer, RendererKind};
use crate::render::surface::{
    CompositeOp, DrawingSurface, FillRule, LineCap, LineJoin, Paint, StyleSetting, TextAlign,
    TextBaseline,
};

/// Prefix of a string argument that names another widget model.
pub const MODEL_REF_PREFIX: &str = "IPY_MODEL_";

/// Looks up model-backed resources referenced by commands.
pub trait ResourceResolver {
    /// Gradient or pattern registered under `id`.
    fn paint(&self, id: &str) -> BridgeResult<Paint>;
    /// Pixels of the canvas or image model registered under `id`.
    fn image(&self, id: &str) -> BridgeResult<Arc<Bitmap>>;
}

/// Resolver with no registered resources.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResources;

impl ResourceResolver for NoResources {
    fn paint(&self, id: &str) -> BridgeResult<Paint> {
        Err(BridgeError::resource(format!("no paint registered as '{id}'")))
    }

    fn image(&self, id: &str) -> BridgeResult<Arc<Bitmap>> {
        Err(BridgeError::resource(format!("no image registered as '{id}'")))
    }
}

/// What the caller should do after a command ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep drawing on the same surface.
    Continue,
    /// Route the following commands to another canvas.
    SwitchCanvas(CanvasId),
}

/// Executes decoded commands against a [`DrawingSurface`].
pub struct CommandExecutor {
    renderer: Box<dyn PrimitiveRenderer>,
    honor_sleep: bool,
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("honor_sleep", &self.honor_sleep)
            .finish_non_exhaustive()
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(RendererKind::Standard)
    }
}

impl CommandExecutor {
    /// Executor drawing primitives with the given strategy.
    pub fn new(kind: RendererKind) -> Self {
        Self {
            renderer: kind.build(),
            honor_sleep: false,
        }
    }

    /// Whether `sleep` commands block the calling thread.
    pub fn with_honor_sleep(mut self, honor_sleep: bool) -> Self {
        self.honor_sleep = honor_sleep;
        self
    }

    /// Run one command.
    pub fn execute(
        &self,
        s: &mut dyn DrawingSurface,
        cmd: &Command,
        res: &dyn ResourceResolver,
    ) -> BridgeResult<Flow> {
        let mut batch = BatchExecutor::new(self.renderer.as_ref());
        let r = self.renderer.as_ref();
        let f = |i: usize| cmd.f64_arg(i);
        let a = |i: usize| cmd.arg(i);

        match cmd.opcode {
            Opcode::FillRect => r.fill_rect(s, f(0)?, f(1)?, f(2)?, f(3)?),
            Opcode::StrokeRect => r.stroke_rect(s, f(0)?, f(1)?, f(2)?, f(3)?),
            Opcode::ClearRect => s.clear_rect(f(0)?, f(1)?, f(2)?, f(3)?),
            Opcode::FillRects | Opcode::StrokeRects => {
                let mode = mode_of(cmd.opcode);
                batch.rects(s, mode, a(0)?, a(1)?, a(2)?, cmd.opt_arg(3), None)?;
            }
            Opcode::FillStyledRects | Opcode::StrokeStyledRects => {
                let mode = mode_of(cmd.opcode);
                let style = (a(4)?, a(5)?);
                batch.rects(s, mode, a(0)?, a(1)?, a(2)?, cmd.opt_arg(3), Some(style))?;
            }
            Opcode::FillArc => {
                r.fill_arc(s, f(0)?, f(1)?, f(2)?, f(3)?, f(4)?, flag(cmd, 5)?);
            }
            Opcode::StrokeArc => {
                r.stroke_arc(s, f(0)?, f(1)?, f(2)?, f(3)?, f(4)?, flag(cmd, 5)?);
            }
            Opcode::FillCircle => r.fill_circle(s, f(0)?, f(1)?, f(2)?),
            Opcode::StrokeCircle => r.stroke_circle(s, f(0)?, f(1)?, f(2)?),
            Opcode::FillArcs | Opcode::StrokeArcs => {
                let geometry = [a(0)?, a(1)?, a(2)?, a(3)?, a(4)?];
                batch.arcs(s, mode_of(cmd.opcode), geometry, flag(cmd, 5)?, None)?;
            }
            Opcode::FillStyledArcs | Opcode::StrokeStyledArcs => {
                let geometry = [a(0)?, a(1)?, a(2)?, a(3)?, a(4)?];
                let style = (a(5)?, a(6)?);
                batch.arcs(s, mode_of(cmd.opcode), geometry, flag(cmd, 7)?, Some(style))?;
            }
            Opcode::FillCircles | Opcode::StrokeCircles => {
                batch.circles(s, mode_of(cmd.opcode), a(0)?, a(1)?, a(2)?, None)?;
            }
            Opcode::FillStyledCircles | Opcode::StrokeStyledCircles => {
                let style = (a(3)?, a(4)?);
                batch.circles(s, mode_of(cmd.opcode), a(0)?, a(1)?, a(2)?, Some(style))?;
            }
            Opcode::StrokeLine => r.stroke_line(s, f(0)?, f(1)?, f(2)?, f(3)?),
            Opcode::FillPolygon => batch.polygon(s, Mode::Fill, true, a(0)?)?,
            Opcode::StrokePolygon => batch.polygon(s, Mode::Stroke, true, a(0)?)?,
            Opcode::StrokeLines => batch.polygon(s, Mode::Stroke, false, a(0)?)?,
            Opcode::FillPolygons | Opcode::StrokePolygons | Opcode::StrokeLineSegments => {
                let (mode, closed) = polygon_mode(cmd.opcode);
                batch.polygons(s, mode, closed, a(0)?, a(1)?, None)?;
            }
            Opcode::FillStyledPolygons
            | Opcode::StrokeStyledPolygons
            | Opcode::StrokeStyledLineSegments => {
                let (mode, closed) = polygon_mode(cmd.opcode);
                let style = (a(2)?, a(3)?);
                batch.polygons(s, mode, closed, a(0)?, a(1)?, Some(style))?;
            }

            Opcode::BeginPath => s.begin_path(),
            Opcode::ClosePath => s.close_path(),
            Opcode::Stroke => s.stroke(),
            Opcode::Fill => s.fill(fill_rule(cmd, 0)?),
            Opcode::Clip => s.clip(fill_rule(cmd, 0)?),
            Opcode::MoveTo => s.move_to(f(0)?, f(1)?),
            Opcode::LineTo => s.line_to(f(0)?, f(1)?),
            Opcode::Rect => s.rect(f(0)?, f(1)?, f(2)?, f(3)?),
            Opcode::Arc => s.arc(f(0)?, f(1)?, f(2)?, f(3)?, f(4)?, flag(cmd, 5)?),
            Opcode::Ellipse => s.ellipse(
                f(0)?,
                f(1)?,
                f(2)?,
                f(3)?,
                f(4)?,
                f(5)?,
                f(6)?,
                flag(cmd, 7)?,
            ),
            Opcode::ArcTo => s.arc_to(f(0)?, f(1)?, f(2)?, f(3)?, f(4)?),
            Opcode::QuadraticCurveTo => s.quadratic_curve_to(f(0)?, f(1)?, f(2)?, f(3)?),
            Opcode::BezierCurveTo => {
                s.bezier_curve_to(f(0)?, f(1)?, f(2)?, f(3)?, f(4)?, f(5)?);
            }

            Opcode::FillText => s.fill_text(a(0)?.as_str()?, f(1)?, f(2)?, opt_f64(cmd, 3)?),
            Opcode::StrokeText => {
                s.stroke_text(a(0)?.as_str()?, f(1)?, f(2)?, opt_f64(cmd, 3)?);
            }
            Opcode::SetLineDash => {
                let segments = match a(0)? {
                    Argument::Buffer { data, .. } => data.to_vec(),
                    scalar if scalar.is_null() => Vec::new(),
                    scalar => vec![scalar.as_f64()?],
                };
                s.set_line_dash(&segments);
            }
            Opcode::DrawImage => {
                let image = resolve_image(a(0)?, res)?;
                s.draw_image(&image, f(1)?, f(2)?, opt_f64(cmd, 3)?, opt_f64(cmd, 4)?);
            }
            Opcode::PutImageData => {
                let image = resolve_image(a(0)?, res)?;
                s.put_image_data(&image, f(1)?.round() as i64, f(2)?.round() as i64);
            }

            Opcode::Save => s.save(),
            Opcode::Restore => s.restore(),
            Opcode::Translate => s.translate(f(0)?, f(1)?),
            Opcode::Rotate => s.rotate(f(0)?),
            Opcode::Scale => {
                let x = f(0)?;
                let y = opt_f64(cmd, 1)?.unwrap_or(x);
                s.scale(x, y);
            }
            Opcode::Transform => s.transform(affine_args(cmd)?),
            Opcode::SetTransform => s.set_transform(affine_args(cmd)?),
            Opcode::ResetTransform => s.reset_transform(),

            Opcode::Set => s.apply_style(&style_setting(a(0)?, a(1)?, res)?),
            Opcode::Clear => s.clear(),
            Opcode::Sleep => {
                let ms = f(0)?;
                if self.honor_sleep && ms.is_finite() && ms > 0.0 {
                    std::thread::sleep(Duration::from_secs_f64(ms / 1000.0));
                }
            }
            Opcode::SwitchCanvas => {
                let id = a(0)?.as_str()?;
                let id = id.strip_prefix(MODEL_REF_PREFIX).unwrap_or(id);
                return Ok(Flow::SwitchCanvas(CanvasId::new(id)));
            }
        }
        Ok(Flow::Continue)
    }
}

fn mode_of(op: Opcode) -> Mode {
    match op {
        Opcode::FillRects
        | Opcode::FillStyledRects
        | Opcode::FillArcs
        | Opcode::FillStyledArcs
        | Opcode::FillCircles
        | Opcode::FillStyledCircles => Mode::Fill,
        _ => Mode::Stroke,
    }
}

fn polygon_mode(op: Opcode) -> (Mode, bool) {
    match op {
        Opcode::FillPolygons | Opcode::FillStyledPolygons => (Mode::Fill, true),
        Opcode::StrokePolygons | Opcode::StrokeStyledPolygons => (Mode::Stroke, true),
        _ => (Mode::Stroke, false),
    }
}

fn flag(cmd: &Command, i: usize) -> BridgeResult<bool> {
    cmd.opt_arg(i).map_or(Ok(false), Argument::as_bool)
}

fn opt_f64(cmd: &Command, i: usize) -> BridgeResult<Option<f64>> {
    cmd.opt_arg(i).map(Argument::as_f64).transpose()
}

fn fill_rule(cmd: &Command, i: usize) -> BridgeResult<FillRule> {
    match cmd.opt_arg(i) {
        None => Ok(FillRule::NonZero),
        Some(arg) => FillRule::parse(arg.as_str()?),
    }
}

fn affine_args(cmd: &Command) -> BridgeResult<Affine> {
    let mut c = [0.0; 6];
    for (i, slot) in c.iter_mut().enumerate() {
        *slot = cmd.f64_arg(i)?;
    }
    Ok(Affine::new(c))
}

/// Resolve a `set` command into a typed assignment.
pub fn style_setting(
    attr: &Argument,
    value: &Argument,
    res: &dyn ResourceResolver,
) -> BridgeResult<StyleSetting> {
    let attr = match attr {
        Argument::Scalar(serde_json::Value::String(name)) => StyleAttribute::from_name(name)?,
        other => {
            let v = other.as_f64()?;
            if !v.is_finite() || v < 0.0 || v.fract() != 0.0 {
                return Err(BridgeError::protocol(format!("invalid style attribute {v}")));
            }
            StyleAttribute::from_index(v as u64)?
        }
    };
    let num = || value.as_f64();
    let text = || value.as_str();
    Ok(match attr {
        StyleAttribute::FillStyle => StyleSetting::FillStyle(resolve_paint(text()?, res)?),
        StyleAttribute::StrokeStyle => StyleSetting::StrokeStyle(resolve_paint(text()?, res)?),
        StyleAttribute::GlobalAlpha => StyleSetting::GlobalAlpha(num()?),
        StyleAttribute::Font => StyleSetting::Font(text()?.to_owned()),
        StyleAttribute::TextAlign => StyleSetting::TextAlign(TextAlign::parse(text()?)?),
        StyleAttribute::TextBaseline => StyleSetting::TextBaseline(TextBaseline::parse(text()?)?),
        StyleAttribute::Direction => StyleSetting::Direction(text()?.to_owned()),
        StyleAttribute::GlobalCompositeOperation => {
            StyleSetting::GlobalCompositeOperation(CompositeOp::parse(text()?)?)
        }
        StyleAttribute::LineWidth => StyleSetting::LineWidth(num()?),
        StyleAttribute::LineCap => StyleSetting::LineCap(LineCap::parse(text()?)?),
        StyleAttribute::LineJoin => StyleSetting::LineJoin(LineJoin::parse(text()?)?),
        StyleAttribute::MiterLimit => StyleSetting::MiterLimit(num()?),
        StyleAttribute::LineDashOffset => StyleSetting::LineDashOffset(num()?),
        StyleAttribute::ShadowOffsetX => StyleSetting::ShadowOffsetX(num()?),
        StyleAttribute::ShadowOffsetY => StyleSetting::ShadowOffsetY(num()?),
        StyleAttribute::ShadowBlur => StyleSetting::ShadowBlur(num()?),
        StyleAttribute::ShadowColor => StyleSetting::ShadowColor(parse_color(text()?)?),
        StyleAttribute::Filter => StyleSetting::Filter(text()?.to_owned()),
        StyleAttribute::ImageSmoothingEnabled => {
            StyleSetting::ImageSmoothingEnabled(value.as_bool()?)
        }
    })
}

fn resolve_paint(value: &str, res: &dyn ResourceResolver) -> BridgeResult<Paint> {
    match value.strip_prefix(MODEL_REF_PREFIX) {
        Some(id) => res.paint(id),
        None => Ok(Paint::Color(parse_color(value)?)),
    }
}

fn parse_color(value: &str) -> BridgeResult<Rgba> {
    Rgba::parse(value).map_err(|e| BridgeError::protocol(e.to_string()))
}

/// Turn an image argument into pixels.
///
/// * a model reference string names a canvas or image model;
/// * a buffer with a `[h, w]` or `[h, w, c]` shape holds raw pixels;
/// * a buffer without a shape holds encoded image bytes.
pub fn resolve_image(arg: &Argument, res: &dyn ResourceResolver) -> BridgeResult<Arc<Bitmap>> {
    match arg {
        Argument::Scalar(serde_json::Value::String(s)) => {
            let id = s.strip_prefix(MODEL_REF_PREFIX).unwrap_or(s);
            res.image(id)
        }
        Argument::Buffer {
            data,
            shape: Some(shape),
        } => {
            let (h, w, c) = match shape.as_slice() {
                [h, w] => (*h, *w, 1),
                [h, w, c] => (*h, *w, *c),
                other => {
                    return Err(BridgeError::protocol(format!(
                        "image shape {other:?} is not [h, w] or [h, w, c]"
                    )));
                }
            };
            let dims = |v: usize| {
                u32::try_from(v).map_err(|_| BridgeError::protocol("image dimension overflow"))
            };
            let bytes: Vec<u8> = if data.dtype() == DType::Uint8 {
                data.bytes().to_vec()
            } else {
                data.to_vec()
                    .into_iter()
                    .map(|v| v.clamp(0.0, 255.0).round() as u8)
                    .collect()
            };
            Bitmap::from_channels(dims(w)?, dims(h)?, dims(c)?, &bytes)
                .map(Arc::new)
                .map_err(|e| BridgeError::protocol(e.to_string()))
        }
        Argument::Buffer { data, shape: None } => decode_image(data.bytes()).map(Arc::new),
        Argument::Scalar(other) => Err(BridgeError::protocol(format!(
            "expected an image source, got {other}"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/exec.rs"]
mod tests;
