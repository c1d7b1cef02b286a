use std::f64::consts::TAU;

use crate::foundation::core::Point;
use crate::foundation::math::{Rng64, seed_from};
use crate::render::surface::{DrawingSurface, FillRule};

/// Single-item drawing strategy used by the batch executor.
///
/// The executor owns iteration and styling; a renderer only decides how one
/// rectangle, arc, circle, line or polygon becomes surface calls.
pub trait PrimitiveRenderer: Send + Sync {
    /// Filled rectangle.
    fn fill_rect(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, w: f64, h: f64);
    /// Outlined rectangle.
    fn stroke_rect(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, w: f64, h: f64);
    /// Pie slice: centre, radius to the arc start, the arc, back to the centre.
    #[allow(clippy::too_many_arguments)]
    fn fill_arc(
        &self,
        s: &mut dyn DrawingSurface,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    );
    /// Arc outline only, no radii.
    #[allow(clippy::too_many_arguments)]
    fn stroke_arc(
        &self,
        s: &mut dyn DrawingSurface,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    );
    /// Filled circle.
    fn fill_circle(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, r: f64);
    /// Outlined circle.
    fn stroke_circle(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, r: f64);
    /// One straight line.
    fn stroke_line(&self, s: &mut dyn DrawingSurface, x1: f64, y1: f64, x2: f64, y2: f64);
    /// Closed polygon, filled.
    fn fill_polygon(&self, s: &mut dyn DrawingSurface, points: &[Point]);
    /// Closed polygon, outlined.
    fn stroke_polygon(&self, s: &mut dyn DrawingSurface, points: &[Point]);
    /// Open polyline.
    fn stroke_polyline(&self, s: &mut dyn DrawingSurface, points: &[Point]);
}

/// Which primitive strategy a canvas uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RendererKind {
    /// Exact Canvas2D geometry.
    #[default]
    Standard,
    /// Hand-drawn look with deterministic jitter.
    Sketchy,
}

impl RendererKind {
    /// Instantiate the strategy.
    pub fn build(self) -> Box<dyn PrimitiveRenderer> {
        match self {
            Self::Standard => Box::new(StandardRenderer),
            Self::Sketchy => Box::new(SketchyRenderer::default()),
        }
    }
}

fn trace_polyline(s: &mut dyn DrawingSurface, points: &[Point]) -> bool {
    let Some((first, rest)) = points.split_first() else {
        return false;
    };
    s.begin_path();
    s.move_to(first.x, first.y);
    for p in rest {
        s.line_to(p.x, p.y);
    }
    true
}

/// Plain Canvas2D primitives.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardRenderer;

impl PrimitiveRenderer for StandardRenderer {
    fn fill_rect(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, w: f64, h: f64) {
        s.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, w: f64, h: f64) {
        s.stroke_rect(x, y, w, h);
    }

    fn fill_arc(
        &self,
        s: &mut dyn DrawingSurface,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        s.begin_path();
        s.move_to(x, y);
        s.line_to(x + r * start.cos(), y + r * start.sin());
        s.arc(x, y, r, start, end, anticlockwise);
        s.line_to(x, y);
        s.fill(FillRule::NonZero);
    }

    fn stroke_arc(
        &self,
        s: &mut dyn DrawingSurface,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        s.begin_path();
        s.arc(x, y, r, start, end, anticlockwise);
        s.stroke();
    }

    fn fill_circle(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, r: f64) {
        s.begin_path();
        s.arc(x, y, r, 0.0, TAU, false);
        s.fill(FillRule::NonZero);
    }

    fn stroke_circle(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, r: f64) {
        s.begin_path();
        s.arc(x, y, r, 0.0, TAU, false);
        s.stroke();
    }

    fn stroke_line(&self, s: &mut dyn DrawingSurface, x1: f64, y1: f64, x2: f64, y2: f64) {
        s.begin_path();
        s.move_to(x1, y1);
        s.line_to(x2, y2);
        s.stroke();
    }

    fn fill_polygon(&self, s: &mut dyn DrawingSurface, points: &[Point]) {
        if trace_polyline(s, points) {
            s.close_path();
            s.fill(FillRule::NonZero);
        }
    }

    fn stroke_polygon(&self, s: &mut dyn DrawingSurface, points: &[Point]) {
        if trace_polyline(s, points) {
            s.close_path();
            s.stroke();
        }
    }

    fn stroke_polyline(&self, s: &mut dyn DrawingSurface, points: &[Point]) {
        if trace_polyline(s, points) {
            s.stroke();
        }
    }
}

/// Hand-drawn primitives: every outline is traced twice with small
/// deterministic offsets, and curves become wobbly polylines.
///
/// Jitter is seeded from the geometry itself, so replaying the same commands
/// produces the same pixels.
#[derive(Clone, Copy, Debug)]
pub struct SketchyRenderer {
    /// Maximum offset in user-space units.
    pub roughness: f64,
    /// Outline passes per shape.
    pub passes: u32,
}

impl Default for SketchyRenderer {
    fn default() -> Self {
        Self {
            roughness: 1.5,
            passes: 2,
        }
    }
}

impl SketchyRenderer {
    fn wobble(&self, rng: &mut Rng64, p: Point) -> Point {
        Point::new(
            p.x + rng.jitter(self.roughness),
            p.y + rng.jitter(self.roughness),
        )
    }

    fn sketch_edges(&self, s: &mut dyn DrawingSurface, points: &[Point], closed: bool) {
        if points.len() < 2 {
            return;
        }
        let seed = seed_from(&[points[0].x, points[0].y, points.len() as f64]);
        for pass in 0..self.passes {
            let mut rng = Rng64::new(seed ^ u64::from(pass));
            s.begin_path();
            let first = self.wobble(&mut rng, points[0]);
            s.move_to(first.x, first.y);
            for p in &points[1..] {
                let q = self.wobble(&mut rng, *p);
                s.line_to(q.x, q.y);
            }
            if closed {
                let q = self.wobble(&mut rng, points[0]);
                s.line_to(q.x, q.y);
            }
            s.stroke();
        }
    }

    fn arc_points(x: f64, y: f64, r: f64, start: f64, end: f64, anticlockwise: bool) -> Vec<Point> {
        let sweep = sweep_angle(start, end, anticlockwise);
        let steps = ((sweep.abs() * r.abs()) / 6.0).ceil().clamp(8.0, 96.0) as usize;
        (0..=steps)
            .map(|i| {
                let a = start + sweep * (i as f64) / (steps as f64);
                Point::new(x + r * a.cos(), y + r * a.sin())
            })
            .collect()
    }
}

/// Canvas2D arc sweep: clockwise goes from `start` up to `end`, anticlockwise
/// goes down, and a difference of at least a full turn draws a full circle.
pub(crate) fn sweep_angle(start: f64, end: f64, anticlockwise: bool) -> f64 {
    let diff = end - start;
    if !anticlockwise {
        if diff >= TAU {
            TAU
        } else {
            diff.rem_euclid(TAU)
        }
    } else if -diff >= TAU {
        -TAU
    } else {
        -((-diff).rem_euclid(TAU))
    }
}

impl PrimitiveRenderer for SketchyRenderer {
    fn fill_rect(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, w: f64, h: f64) {
        s.fill_rect(x, y, w, h);
        self.stroke_rect(s, x, y, w, h);
    }

    fn stroke_rect(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, w: f64, h: f64) {
        let pts = [
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ];
        self.sketch_edges(s, &pts, true);
    }

    fn fill_arc(
        &self,
        s: &mut dyn DrawingSurface,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        StandardRenderer.fill_arc(s, x, y, r, start, end, anticlockwise);
        let mut pts = vec![Point::new(x, y)];
        pts.extend(Self::arc_points(x, y, r, start, end, anticlockwise));
        self.sketch_edges(s, &pts, true);
    }

    fn stroke_arc(
        &self,
        s: &mut dyn DrawingSurface,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        let pts = Self::arc_points(x, y, r, start, end, anticlockwise);
        self.sketch_edges(s, &pts, false);
    }

    fn fill_circle(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, r: f64) {
        StandardRenderer.fill_circle(s, x, y, r);
        self.stroke_circle(s, x, y, r);
    }

    fn stroke_circle(&self, s: &mut dyn DrawingSurface, x: f64, y: f64, r: f64) {
        let pts = Self::arc_points(x, y, r, 0.0, TAU, false);
        self.sketch_edges(s, &pts, true);
    }

    fn stroke_line(&self, s: &mut dyn DrawingSurface, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.sketch_edges(s, &[Point::new(x1, y1), Point::new(x2, y2)], false);
    }

    fn fill_polygon(&self, s: &mut dyn DrawingSurface, points: &[Point]) {
        StandardRenderer.fill_polygon(s, points);
        self.sketch_edges(s, points, true);
    }

    fn stroke_polygon(&self, s: &mut dyn DrawingSurface, points: &[Point]) {
        self.sketch_edges(s, points, true);
    }

    fn stroke_polyline(&self, s: &mut dyn DrawingSurface, points: &[Point]) {
        self.sketch_edges(s, points, false);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/primitives.rs"]
mod tests;
