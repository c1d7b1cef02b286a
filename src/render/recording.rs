use crate::foundation::core::{Affine, Bitmap, CanvasSize};
use crate::render::surface::{DrawingSurface, FillRule, StyleSetting};

/// One recorded surface call.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum SurfaceCall {
    Resize(CanvasSize),
    Style(StyleSetting),
    Save,
    Restore,
    Transform(Affine),
    SetTransform(Affine),
    BeginPath,
    ClosePath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Rect(f64, f64, f64, f64),
    Arc {
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    },
    Ellipse([f64; 7], bool),
    ArcTo([f64; 5]),
    QuadraticCurveTo([f64; 4]),
    BezierCurveTo([f64; 6]),
    Fill(FillRule),
    Stroke,
    Clip(FillRule),
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    ClearRect(f64, f64, f64, f64),
    FillText(String, f64, f64, Option<f64>),
    StrokeText(String, f64, f64, Option<f64>),
    SetLineDash(Vec<f64>),
    DrawImage {
        width: u32,
        height: u32,
        dx: f64,
        dy: f64,
        dw: Option<f64>,
        dh: Option<f64>,
    },
    PutImageData {
        width: u32,
        height: u32,
        dx: i64,
        dy: i64,
    },
    Clear,
}

/// A surface that records every call instead of rasterizing.
///
/// Useful for asserting executor behaviour call-by-call; `read_pixels`
/// returns a transparent bitmap of the current size.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    size: CanvasSize,
    /// Calls in the order they were made.
    pub calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    /// Create a recorder of the given size.
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            calls: Vec::new(),
        }
    }

    /// Borrow the recorded calls.
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Drop recorded calls.
    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Count calls matching a predicate.
    pub fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl DrawingSurface for RecordingSurface {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn resize(&mut self, size: CanvasSize) {
        self.size = size;
        self.calls.push(SurfaceCall::Resize(size));
    }

    fn apply_style(&mut self, setting: &StyleSetting) {
        self.calls.push(SurfaceCall::Style(setting.clone()));
    }

    fn save(&mut self) {
        self.calls.push(SurfaceCall::Save);
    }

    fn restore(&mut self) {
        self.calls.push(SurfaceCall::Restore);
    }

    fn transform(&mut self, m: Affine) {
        self.calls.push(SurfaceCall::Transform(m));
    }

    fn set_transform(&mut self, m: Affine) {
        self.calls.push(SurfaceCall::SetTransform(m));
    }

    fn begin_path(&mut self) {
        self.calls.push(SurfaceCall::BeginPath);
    }

    fn close_path(&mut self) {
        self.calls.push(SurfaceCall::ClosePath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.calls.push(SurfaceCall::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.calls.push(SurfaceCall::LineTo(x, y));
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(SurfaceCall::Rect(x, y, w, h));
    }

    fn arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64, anticlockwise: bool) {
        self.calls.push(SurfaceCall::Arc {
            x,
            y,
            r,
            start,
            end,
            anticlockwise,
        });
    }

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
    ) {
        self.calls.push(SurfaceCall::Ellipse(
            [x, y, rx, ry, rotation, start, end],
            anticlockwise,
        ));
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, r: f64) {
        self.calls.push(SurfaceCall::ArcTo([x1, y1, x2, y2, r]));
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.calls
            .push(SurfaceCall::QuadraticCurveTo([cpx, cpy, x, y]));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.calls
            .push(SurfaceCall::BezierCurveTo([cp1x, cp1y, cp2x, cp2y, x, y]));
    }

    fn fill(&mut self, rule: FillRule) {
        self.calls.push(SurfaceCall::Fill(rule));
    }

    fn stroke(&mut self) {
        self.calls.push(SurfaceCall::Stroke);
    }

    fn clip(&mut self, rule: FillRule) {
        self.calls.push(SurfaceCall::Clip(rule));
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(SurfaceCall::FillRect(x, y, w, h));
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(SurfaceCall::StrokeRect(x, y, w, h));
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.calls.push(SurfaceCall::ClearRect(x, y, w, h));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        self.calls
            .push(SurfaceCall::FillText(text.to_owned(), x, y, max_width));
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        self.calls
            .push(SurfaceCall::StrokeText(text.to_owned(), x, y, max_width));
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        self.calls.push(SurfaceCall::SetLineDash(segments.to_vec()));
    }

    fn draw_image(&mut self, image: &Bitmap, dx: f64, dy: f64, dw: Option<f64>, dh: Option<f64>) {
        self.calls.push(SurfaceCall::DrawImage {
            width: image.width,
            height: image.height,
            dx,
            dy,
            dw,
            dh,
        });
    }

    fn put_image_data(&mut self, image: &Bitmap, dx: i64, dy: i64) {
        self.calls.push(SurfaceCall::PutImageData {
            width: image.width,
            height: image.height,
            dx,
            dy,
        });
    }

    fn clear(&mut self) {
        self.calls.push(SurfaceCall::Clear);
    }

    fn read_pixels(&mut self) -> Bitmap {
        Bitmap::transparent(self.size.width, self.size.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/recording.rs"]
mod tests;
