use std::sync::Arc;

use crate::foundation::color::Rgba;
use crate::foundation::core::{
    Affine, BezPath, Bitmap, CanvasSize, Point, Rect, premultiply_rgba8_in_place,
    unpremultiply_rgba8_in_place,
};
use crate::foundation::error::{BridgeError, BridgeResult};
use crate::render::composite::{composite_in_place, erase_in_place, over_in_place};
use crate::render::path::{PathBuilder, device_rect};
use crate::render::surface::{
    CompositeOp, DrawingSurface, FillRule, LineCap, LineJoin, Paint, StyleSetting, TextAlign,
    TextBaseline,
};
use crate::render::text::{FontSpec, ShapedText, TextEngine};

/// Canvas drawing state saved and restored by `save`/`restore`.
#[derive(Clone, Debug)]
struct DrawState {
    transform: Affine,
    fill: Paint,
    stroke: Paint,
    global_alpha: f64,
    composite: CompositeOp,
    line_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    miter_limit: f64,
    dash: Vec<f64>,
    dash_offset: f64,
    font: FontSpec,
    text_align: TextAlign,
    text_baseline: TextBaseline,
    rtl: bool,
    shadow_offset: (f64, f64),
    shadow_blur: f64,
    shadow_color: Rgba,
    filter: String,
    image_smoothing: bool,
    clip: Option<Arc<Vec<u8>>>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Paint::default(),
            stroke: Paint::default(),
            global_alpha: 1.0,
            composite: CompositeOp::SourceOver,
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: Vec::new(),
            dash_offset: 0.0,
            font: FontSpec::default(),
            text_align: TextAlign::Start,
            text_baseline: TextBaseline::Alphabetic,
            rtl: false,
            shadow_offset: (0.0, 0.0),
            shadow_blur: 0.0,
            shadow_color: Rgba::TRANSPARENT,
            filter: "none".to_owned(),
            image_smoothing: true,
            clip: None,
        }
    }
}

/// How a single draw call reaches the render context.
enum Geometry<'a> {
    Fill(&'a BezPath, FillRule),
    Stroke(&'a BezPath),
    Text(&'a ShapedText, Affine, bool),
    Image(&'a vello_cpu::Image, Affine, u32, u32),
}

/// CPU raster surface backed by `vello_cpu`.
///
/// Pixels live in a premultiplied RGBA8 store. Source-over draws accumulate
/// in the render context and are composited onto the store lazily; any other
/// composite operation, clip change, `clearRect`, `putImageData` or read-back
/// flushes first so the store is always consistent when observed.
pub struct RasterSurface {
    size: CanvasSize,
    ctx: vello_cpu::RenderContext,
    layer: vello_cpu::Pixmap,
    store: Vec<u8>,
    pending: bool,
    state: DrawState,
    stack: Vec<DrawState>,
    path: PathBuilder,
    text: TextEngine,
    warned_no_font: bool,
}

impl std::fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSurface")
            .field("size", &self.size)
            .field("pending", &self.pending)
            .field("stack_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl RasterSurface {
    /// Transparent surface of the given size.
    pub fn new(size: CanvasSize) -> Self {
        let (w, h) = dims(size);
        Self {
            size,
            ctx: vello_cpu::RenderContext::new(w, h),
            layer: vello_cpu::Pixmap::new(w, h),
            store: vec![0; size.pixel_count() * 4],
            pending: false,
            state: DrawState::default(),
            stack: Vec::new(),
            path: PathBuilder::default(),
            text: TextEngine::default(),
            warned_no_font: false,
        }
    }

    /// Make a font available to `fillText`/`strokeText`; returns its family name.
    pub fn register_font(&mut self, bytes: &[u8]) -> BridgeResult<String> {
        self.text.register_font(bytes)
    }

    /// Premultiplied RGBA8 pixels after flushing pending draws.
    pub fn premultiplied(&mut self) -> &[u8] {
        self.flush();
        &self.store
    }

    fn flush(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        let op = self.state.composite;
        self.ctx.flush();
        self.layer.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.layer);
        self.ctx.reset();

        let layer = self.layer.data_as_u8_slice();
        let mask = self.state.clip.as_deref().map(Vec::as_slice);
        let res = match (op, mask) {
            (CompositeOp::SourceOver, None) => over_in_place(&mut self.store, layer, 1.0),
            _ => composite_in_place(op, &mut self.store, layer, mask),
        };
        if let Err(e) = res {
            tracing::warn!(error = %e, "dropping layer that failed to composite");
        }
    }

    /// Coverage of a device-space path as one byte per pixel.
    fn coverage(&mut self, path: &BezPath, rule: FillRule) -> Vec<u8> {
        self.flush();
        self.ctx.reset();
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_fill_rule(fill_rule_to_cpu(rule));
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        self.ctx.fill_path(&bezpath_to_cpu(path));
        self.ctx.flush();
        self.layer.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.layer);
        self.ctx.reset();
        self.layer
            .data_as_u8_slice()
            .chunks_exact(4)
            .map(|px| px[3])
            .collect()
    }

    fn draw(&mut self, geometry: Geometry<'_>, paint: &Paint) {
        if self.state.composite != CompositeOp::SourceOver {
            self.flush();
        }
        let alpha = self.state.global_alpha;
        let geometry_transform = match &geometry {
            Geometry::Fill(..) => Affine::IDENTITY,
            Geometry::Stroke(_) => self.state.transform,
            Geometry::Text(_, m, _) | Geometry::Image(_, m, _, _) => *m,
        };

        let mut layered = false;
        match (&geometry, paint) {
            (Geometry::Image(..), _) => {
                if alpha < 1.0 {
                    self.ctx.push_opacity_layer(alpha as f32);
                    layered = true;
                }
            }
            (_, Paint::Color(c)) => {
                let [r, g, b, a] = c.with_alpha_mul(alpha).to_rgba8();
                self.ctx
                    .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
                self.ctx
                    .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            }
            (_, other) => {
                let region = match &geometry {
                    Geometry::Fill(p, _) => device_bounds(p, self.size),
                    _ => Some(full_bounds(self.size)),
                };
                let Some(region) = region else {
                    return;
                };
                let Some((image, origin)) = self.rasterize_paint(other, region) else {
                    return;
                };
                self.ctx.set_paint(image);
                let inv = invert(geometry_transform).unwrap_or(Affine::IDENTITY);
                self.ctx
                    .set_paint_transform(affine_to_cpu(inv * Affine::translate(origin)));
                if alpha < 1.0 {
                    self.ctx.push_opacity_layer(alpha as f32);
                    layered = true;
                }
            }
        }

        self.ctx.set_transform(affine_to_cpu(geometry_transform));
        match geometry {
            Geometry::Fill(path, rule) => {
                self.ctx.set_fill_rule(fill_rule_to_cpu(rule));
                self.ctx.fill_path(&bezpath_to_cpu(path));
            }
            Geometry::Stroke(path) => {
                self.ctx.set_stroke(self.cpu_stroke());
                self.ctx.stroke_path(&bezpath_to_cpu(path));
            }
            Geometry::Text(shaped, _, stroke) => {
                if stroke {
                    self.ctx.set_stroke(self.cpu_stroke());
                }
                for line in shaped.layout.lines() {
                    for item in line.items() {
                        let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                            continue;
                        };
                        let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        });
                        let builder = self
                            .ctx
                            .glyph_run(&shaped.font)
                            .font_size(run.run().font_size());
                        if stroke {
                            builder.stroke_glyphs(glyphs);
                        } else {
                            builder.fill_glyphs(glyphs);
                        }
                    }
                }
            }
            Geometry::Image(image, _, w, h) => {
                self.ctx.set_paint(image.clone());
                self.ctx
                    .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                self.ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
                self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(w),
                    f64::from(h),
                ));
            }
        }
        if layered {
            self.ctx.pop_layer();
        }
        self.pending = true;
        if self.state.composite != CompositeOp::SourceOver {
            self.flush();
        }
    }

    fn cpu_stroke(&self) -> vello_cpu::kurbo::Stroke {
        let s = &self.state;
        let cap = match s.line_cap {
            LineCap::Butt => vello_cpu::kurbo::Cap::Butt,
            LineCap::Round => vello_cpu::kurbo::Cap::Round,
            LineCap::Square => vello_cpu::kurbo::Cap::Square,
        };
        let join = match s.line_join {
            LineJoin::Miter => vello_cpu::kurbo::Join::Miter,
            LineJoin::Round => vello_cpu::kurbo::Join::Round,
            LineJoin::Bevel => vello_cpu::kurbo::Join::Bevel,
        };
        let stroke = vello_cpu::kurbo::Stroke::new(s.line_width)
            .with_caps(cap)
            .with_join(join)
            .with_miter_limit(s.miter_limit);
        if s.dash.is_empty() {
            stroke
        } else {
            stroke.with_dashes(s.dash_offset, s.dash.iter().copied())
        }
    }

    /// Rasterize a gradient or pattern over a device-space region.
    ///
    /// Paint geometry is interpreted in the user space of the current
    /// transform, so each device pixel centre is mapped back before sampling.
    fn rasterize_paint(&self, paint: &Paint, region: Rect) -> Option<(vello_cpu::Image, (f64, f64))> {
        let inv = invert(self.state.transform)?;
        let (x0, y0) = (region.x0.floor(), region.y0.floor());
        let w = (region.x1.ceil() - x0).max(1.0) as u32;
        let h = (region.y1.ceil() - y0).max(1.0) as u32;
        let mut bytes = vec![0u8; (w as usize) * (h as usize) * 4];
        for py in 0..h {
            for px in 0..w {
                let p = inv
                    * Point::new(x0 + f64::from(px) + 0.5, y0 + f64::from(py) + 0.5);
                let rgba = match paint {
                    Paint::Color(c) => c.to_rgba8(),
                    Paint::Gradient(g) => g
                        .param_at(p.x, p.y)
                        .map_or([0; 4], |t| g.color_at(t).to_rgba8()),
                    Paint::Pattern(pat) => pat.texel_at(p.x, p.y).unwrap_or([0; 4]),
                };
                let i = ((py as usize) * (w as usize) + (px as usize)) * 4;
                bytes[i..i + 4].copy_from_slice(&rgba);
            }
        }
        premultiply_rgba8_in_place(&mut bytes);
        match image_from_premul(&bytes, w, h) {
            Ok(img) => Some((img, (x0, y0))),
            Err(e) => {
                tracing::warn!(error = %e, "paint rasterization failed");
                None
            }
        }
    }

    fn text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>, stroke: bool) {
        if !(x.is_finite() && y.is_finite()) || max_width.is_some_and(|w| !w.is_finite() || w <= 0.0)
        {
            return;
        }
        let font = self.state.font.clone();
        let shaped = match self.text.shape(text, &font) {
            Ok(Some(s)) => s,
            Ok(None) => {
                if !self.warned_no_font {
                    tracing::warn!("no font registered; text commands are not drawn");
                    self.warned_no_font = true;
                }
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "text shaping failed");
                return;
            }
        };

        let width = f64::from(shaped.width);
        let sx = match max_width {
            Some(mw) if width > mw && width > 0.0 => mw / width,
            _ => 1.0,
        };
        let drawn = width * sx;
        let rtl = self.state.rtl;
        let dx = match self.state.text_align {
            TextAlign::Left => 0.0,
            TextAlign::Right => -drawn,
            TextAlign::Center => -drawn / 2.0,
            TextAlign::Start if rtl => -drawn,
            TextAlign::End if !rtl => -drawn,
            TextAlign::Start | TextAlign::End => 0.0,
        };
        let (baseline, ascent, descent) = (
            f64::from(shaped.baseline),
            f64::from(shaped.ascent),
            f64::from(shaped.descent),
        );
        let dy = match self.state.text_baseline {
            TextBaseline::Alphabetic => -baseline,
            TextBaseline::Top | TextBaseline::Hanging => -(baseline - ascent),
            TextBaseline::Middle => -(baseline - (ascent - descent) / 2.0),
            TextBaseline::Ideographic | TextBaseline::Bottom => -(baseline + descent),
        };
        let m = self.state.transform
            * Affine::translate((x + dx, y))
            * Affine::scale_non_uniform(sx, 1.0)
            * Affine::translate((0.0, dy));
        let paint = if stroke {
            self.state.stroke.clone()
        } else {
            self.state.fill.clone()
        };
        self.draw(Geometry::Text(&shaped, m, stroke), &paint);
    }

    fn fill_device_path(&mut self, path: &BezPath, rule: FillRule) {
        let paint = self.state.fill.clone();
        self.draw(Geometry::Fill(path, rule), &paint);
    }

    fn stroke_user_path(&mut self, path: &BezPath) {
        if self.state.line_width <= 0.0 {
            return;
        }
        let paint = self.state.stroke.clone();
        self.draw(Geometry::Stroke(path), &paint);
    }
}

impl DrawingSurface for RasterSurface {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn resize(&mut self, size: CanvasSize) {
        let (w, h) = dims(size);
        tracing::debug!(width = w, height = h, "resizing raster surface");
        self.size = size;
        self.ctx = vello_cpu::RenderContext::new(w, h);
        self.layer = vello_cpu::Pixmap::new(w, h);
        self.store = vec![0; size.pixel_count() * 4];
        self.pending = false;
        self.state = DrawState::default();
        self.stack.clear();
        self.path.clear();
    }

    fn apply_style(&mut self, setting: &StyleSetting) {
        let s = &mut self.state;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        match setting {
            StyleSetting::FillStyle(p) => s.fill = p.clone(),
            StyleSetting::StrokeStyle(p) => s.stroke = p.clone(),
            StyleSetting::GlobalAlpha(a) if (0.0..=1.0).contains(a) => s.global_alpha = *a,
            StyleSetting::Font(css) => match FontSpec::parse(css) {
                Some(spec) => s.font = spec,
                None => tracing::debug!(font = %css, "ignoring unparsable font"),
            },
            StyleSetting::TextAlign(a) => s.text_align = *a,
            StyleSetting::TextBaseline(b) => s.text_baseline = *b,
            StyleSetting::Direction(d) => s.rtl = d == "rtl",
            StyleSetting::GlobalCompositeOperation(op) => {
                if *op != s.composite {
                    self.flush();
                    self.state.composite = *op;
                }
            }
            StyleSetting::LineWidth(w) if positive(*w) => s.line_width = *w,
            StyleSetting::LineCap(c) => s.line_cap = *c,
            StyleSetting::LineJoin(j) => s.line_join = *j,
            StyleSetting::MiterLimit(m) if positive(*m) => s.miter_limit = *m,
            StyleSetting::LineDashOffset(o) if o.is_finite() => s.dash_offset = *o,
            StyleSetting::ShadowOffsetX(v) if v.is_finite() => s.shadow_offset.0 = *v,
            StyleSetting::ShadowOffsetY(v) if v.is_finite() => s.shadow_offset.1 = *v,
            StyleSetting::ShadowBlur(v) if v.is_finite() && *v >= 0.0 => s.shadow_blur = *v,
            StyleSetting::ShadowColor(c) => s.shadow_color = *c,
            StyleSetting::Filter(f) => s.filter = f.clone(),
            StyleSetting::ImageSmoothingEnabled(on) => s.image_smoothing = *on,
            _ => {}
        }
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        let Some(prev) = self.stack.pop() else {
            return;
        };
        let clip_changed = match (&prev.clip, &self.state.clip) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        if clip_changed || prev.composite != self.state.composite {
            self.flush();
        }
        self.state = prev;
    }

    fn transform(&mut self, m: Affine) {
        if m.as_coeffs().iter().all(|v| v.is_finite()) {
            self.state.transform = self.state.transform * m;
        }
    }

    fn set_transform(&mut self, m: Affine) {
        if m.as_coeffs().iter().all(|v| v.is_finite()) {
            self.state.transform = m;
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn close_path(&mut self) {
        self.path.close_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to(self.state.transform, x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.path.line_to(self.state.transform, x, y);
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.path.rect(self.state.transform, x, y, w, h);
    }

    fn arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64, anticlockwise: bool) {
        self.path
            .arc(self.state.transform, x, y, r, start, end, anticlockwise);
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
        self.path.ellipse(
            self.state.transform,
            x,
            y,
            rx,
            ry,
            rotation,
            start,
            end,
            anticlockwise,
        );
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, r: f64) {
        self.path.arc_to(self.state.transform, x1, y1, x2, y2, r);
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.path
            .quadratic_curve_to(self.state.transform, cpx, cpy, x, y);
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.path
            .bezier_curve_to(self.state.transform, cp1x, cp1y, cp2x, cp2y, x, y);
    }

    fn fill(&mut self, rule: FillRule) {
        if self.path.is_empty() {
            return;
        }
        let path = self.path.device_path().clone();
        self.fill_device_path(&path, rule);
    }

    fn stroke(&mut self) {
        if self.path.is_empty() {
            return;
        }
        let Some(user) = self.path.user_path(self.state.transform) else {
            return;
        };
        self.stroke_user_path(&user);
    }

    fn clip(&mut self, rule: FillRule) {
        let path = self.path.device_path().clone();
        let mut mask = self.coverage(&path, rule);
        if let Some(prev) = &self.state.clip {
            for (m, p) in mask.iter_mut().zip(prev.iter()) {
                *m = crate::foundation::math::mul_div255_u8(u16::from(*m), u16::from(*p));
            }
        }
        self.state.clip = Some(Arc::new(mask));
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if ![x, y, w, h].iter().all(|v| v.is_finite()) || w == 0.0 || h == 0.0 {
            return;
        }
        let path = device_rect(self.state.transform, x, y, w, h);
        self.fill_device_path(&path, FillRule::NonZero);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            return;
        }
        let mut path = BezPath::new();
        path.move_to((x, y));
        path.line_to((x + w, y));
        path.line_to((x + w, y + h));
        path.line_to((x, y + h));
        path.close_path();
        self.stroke_user_path(&path);
    }

    fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        if ![x, y, w, h].iter().all(|v| v.is_finite()) || w == 0.0 || h == 0.0 {
            return;
        }
        let path = device_rect(self.state.transform, x, y, w, h);
        let mut mask = self.coverage(&path, FillRule::NonZero);
        if let Some(clip) = &self.state.clip {
            for (m, c) in mask.iter_mut().zip(clip.iter()) {
                *m = crate::foundation::math::mul_div255_u8(u16::from(*m), u16::from(*c));
            }
        }
        if let Err(e) = erase_in_place(&mut self.store, &mask) {
            tracing::warn!(error = %e, "clearRect failed");
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        self.text(text, x, y, max_width, false);
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64, max_width: Option<f64>) {
        self.text(text, x, y, max_width, true);
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        if segments.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return;
        }
        let mut dash = segments.to_vec();
        if dash.len() % 2 == 1 {
            dash.extend_from_slice(segments);
        }
        if dash.iter().all(|v| *v == 0.0) {
            dash.clear();
        }
        self.state.dash = dash;
    }

    fn draw_image(&mut self, image: &Bitmap, dx: f64, dy: f64, dw: Option<f64>, dh: Option<f64>) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let (iw, ih) = (f64::from(image.width), f64::from(image.height));
        let (dw, dh) = (dw.unwrap_or(iw), dh.unwrap_or(ih));
        if ![dx, dy, dw, dh].iter().all(|v| v.is_finite()) || dw == 0.0 || dh == 0.0 {
            return;
        }
        let mut premul = image.data.clone();
        premultiply_rgba8_in_place(&mut premul);
        let paint = match image_from_premul(&premul, image.width, image.height) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "drawImage source rejected");
                return;
            }
        };
        let m = self.state.transform
            * Affine::translate((dx, dy))
            * Affine::scale_non_uniform(dw / iw, dh / ih);
        // The image carries its own paint; the fill style is unused.
        let unused = Paint::default();
        self.draw(
            Geometry::Image(&paint, m, image.width, image.height),
            &unused,
        );
    }

    fn put_image_data(&mut self, image: &Bitmap, dx: i64, dy: i64) {
        self.flush();
        let (cw, ch) = (i64::from(self.size.width), i64::from(self.size.height));
        let (iw, ih) = (i64::from(image.width), i64::from(image.height));
        // Offsets past these bounds draw nothing; clamping keeps the index math in range.
        let dx = dx.clamp(-iw, cw);
        let dy = dy.clamp(-ih, ch);
        let x_lo = (-dx).max(0);
        let x_hi = (cw - dx).min(iw);
        if x_lo >= x_hi {
            return;
        }
        let len = ((x_hi - x_lo) * 4) as usize;
        for sy in 0..ih {
            let ty = dy + sy;
            if !(0..ch).contains(&ty) {
                continue;
            }
            let src = ((sy * iw + x_lo) * 4) as usize;
            let dst = ((ty * cw + dx + x_lo) * 4) as usize;
            let row = &mut self.store[dst..dst + len];
            row.copy_from_slice(&image.data[src..src + len]);
            premultiply_rgba8_in_place(row);
        }
    }

    fn clear(&mut self) {
        self.ctx.reset();
        self.pending = false;
        self.store.fill(0);
    }

    fn read_pixels(&mut self) -> Bitmap {
        self.flush();
        let mut data = self.store.clone();
        unpremultiply_rgba8_in_place(&mut data);
        Bitmap {
            width: self.size.width,
            height: self.size.height,
            data,
        }
    }
}

fn dims(size: CanvasSize) -> (u16, u16) {
    // CanvasSize guarantees both sides fit in u16.
    (
        u16::try_from(size.width).unwrap_or(u16::MAX),
        u16::try_from(size.height).unwrap_or(u16::MAX),
    )
}

fn invert(m: Affine) -> Option<Affine> {
    (m.determinant().abs() > f64::EPSILON).then(|| m.inverse())
}

fn full_bounds(size: CanvasSize) -> Rect {
    Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height))
}

fn device_bounds(path: &BezPath, size: CanvasSize) -> Option<Rect> {
    use kurbo::Shape;
    let b = path.bounding_box();
    let clipped = b.intersect(full_bounds(size));
    (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped)
}

fn fill_rule_to_cpu(rule: FillRule) -> vello_cpu::peniko::Fill {
    match rule {
        FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
        FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_from_premul(bytes: &[u8], width: u32, height: u32) -> BridgeResult<vello_cpu::Image> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BridgeError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BridgeError::validation("image height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(BridgeError::validation("image byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
        .collect::<Vec<_>>();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
