use kurbo::{Arc as ArcSeg, PathEl, Shape, Vec2};

use crate::foundation::core::{Affine, BezPath, Point};
use crate::render::primitives::sweep_angle;

const ARC_TOLERANCE: f64 = 0.1;

/// Canvas2D current path, accumulated in device space.
///
/// Every point is mapped through the transform in effect when it is added,
/// so later transform changes do not move already-built geometry.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathBuilder {
    path: BezPath,
    current: Option<Point>,
    start: Option<Point>,
}

impl PathBuilder {
    pub(crate) fn clear(&mut self) {
        self.path = BezPath::new();
        self.current = None;
        self.start = None;
    }

    pub(crate) fn device_path(&self) -> &BezPath {
        &self.path
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.path.elements().is_empty()
    }

    pub(crate) fn move_to(&mut self, m: Affine, x: f64, y: f64) {
        if !finite(&[x, y]) {
            return;
        }
        let p = m * Point::new(x, y);
        self.path.move_to(p);
        self.current = Some(p);
        self.start = Some(p);
    }

    pub(crate) fn line_to(&mut self, m: Affine, x: f64, y: f64) {
        if !finite(&[x, y]) {
            return;
        }
        if self.current.is_none() {
            self.move_to(m, x, y);
            return;
        }
        let p = m * Point::new(x, y);
        self.path.line_to(p);
        self.current = Some(p);
    }

    pub(crate) fn close_path(&mut self) {
        if self.current.is_some() {
            self.path.close_path();
            self.current = self.start;
        }
    }

    pub(crate) fn rect(&mut self, m: Affine, x: f64, y: f64, w: f64, h: f64) {
        if !finite(&[x, y, w, h]) {
            return;
        }
        self.move_to(m, x, y);
        self.line_to(m, x + w, y);
        self.line_to(m, x + w, y + h);
        self.line_to(m, x, y + h);
        self.close_path();
    }

    pub(crate) fn quadratic_curve_to(&mut self, m: Affine, cpx: f64, cpy: f64, x: f64, y: f64) {
        if !finite(&[cpx, cpy, x, y]) {
            return;
        }
        if self.current.is_none() {
            self.move_to(m, cpx, cpy);
        }
        let p = m * Point::new(x, y);
        self.path.quad_to(m * Point::new(cpx, cpy), p);
        self.current = Some(p);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn bezier_curve_to(
        &mut self,
        m: Affine,
        cp1x: f64,
        cp1y: f64,
        cp2x: f64,
        cp2y: f64,
        x: f64,
        y: f64,
    ) {
        if !finite(&[cp1x, cp1y, cp2x, cp2y, x, y]) {
            return;
        }
        if self.current.is_none() {
            self.move_to(m, cp1x, cp1y);
        }
        let p = m * Point::new(x, y);
        self.path
            .curve_to(m * Point::new(cp1x, cp1y), m * Point::new(cp2x, cp2y), p);
        self.current = Some(p);
    }

    /// Elliptical arc; a negative radius leaves the path untouched.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn ellipse(
        &mut self,
        m: Affine,
        x: f64,
        y: f64,
        rx: f64,
        ry: f64,
        rotation: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        if !finite(&[x, y, rx, ry, rotation, start, end]) || rx < 0.0 || ry < 0.0 {
            return;
        }
        let sweep = sweep_angle(start, end, anticlockwise);
        let arc = ArcSeg {
            center: Point::new(x, y),
            radii: Vec2::new(rx, ry),
            start_angle: start,
            sweep_angle: sweep,
            x_rotation: rotation,
        };
        let first = arc_point(&arc, start);
        if self.current.is_some() {
            self.line_to(m, first.x, first.y);
        } else {
            self.move_to(m, first.x, first.y);
        }
        let mut last = first;
        for el in arc.append_iter(ARC_TOLERANCE) {
            if let PathEl::CurveTo(_, _, p) = el {
                last = p;
            }
            self.path.push(m * el);
        }
        self.current = Some(m * last);
    }

    pub(crate) fn arc(
        &mut self,
        m: Affine,
        x: f64,
        y: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        self.ellipse(m, x, y, r, r, 0.0, start, end, anticlockwise);
    }

    /// Tangent arc from the current point towards `(x1, y1)` then `(x2, y2)`.
    pub(crate) fn arc_to(&mut self, m: Affine, x1: f64, y1: f64, x2: f64, y2: f64, r: f64) {
        if !finite(&[x1, y1, x2, y2, r]) || r < 0.0 {
            return;
        }
        let Some(current) = self.current else {
            self.move_to(m, x1, y1);
            return;
        };
        // Work in user space; the current point is stored in device space.
        let p0 = if m.determinant().abs() > f64::EPSILON {
            m.inverse() * current
        } else {
            current
        };
        let p1 = Point::new(x1, y1);
        let p2 = Point::new(x2, y2);
        let v1 = p0 - p1;
        let v2 = p2 - p1;
        let cross = v1.x * v2.y - v1.y * v2.x;
        if p0 == p1 || p1 == p2 || r == 0.0 || cross.abs() < 1e-12 {
            self.line_to(m, x1, y1);
            return;
        }
        let (l1, l2) = (v1.hypot(), v2.hypot());
        let angle = (v1.dot(v2) / (l1 * l2)).clamp(-1.0, 1.0).acos();
        let tangent = r / (angle / 2.0).tan();
        let t1 = p1 + v1 * (tangent / l1);
        let t2 = p1 + v2 * (tangent / l2);
        let bisector = (v1 / l1 + v2 / l2).normalize();
        let center = p1 + bisector * (r / (angle / 2.0).sin());
        let a0 = (t1.y - center.y).atan2(t1.x - center.x);
        let a1 = (t2.y - center.y).atan2(t2.x - center.x);
        self.line_to(m, t1.x, t1.y);
        self.arc(m, center.x, center.y, r, a0, a1, cross > 0.0);
    }

    /// Copy of the path mapped back into the user space of `m`, or `None`
    /// when `m` cannot be inverted.
    pub(crate) fn user_path(&self, m: Affine) -> Option<BezPath> {
        if m.determinant().abs() <= f64::EPSILON {
            return None;
        }
        let inv = m.inverse();
        Some(self.path.iter().map(|el| inv * el).collect())
    }
}

fn arc_point(arc: &ArcSeg, angle: f64) -> Point {
    let local = Point::new(arc.radii.x * angle.cos(), arc.radii.y * angle.sin());
    arc.center + (Affine::rotate(arc.x_rotation) * local).to_vec2()
}

fn finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Device-space outline of a user-space rectangle.
pub(crate) fn device_rect(m: Affine, x: f64, y: f64, w: f64, h: f64) -> BezPath {
    let r = kurbo::Rect::new(x, y, x + w, y + h);
    m * r.to_path(ARC_TOLERANCE)
}

#[cfg(test)]
#[path = "../../tests/unit/render/path.rs"]
mod tests;
