use super::*;
use crate::render::recording::{RecordingSurface, SurfaceCall};

#[test]
fn fill_arc_draws_pie_slice_radii() {
    let mut s = RecordingSurface::default();
    StandardRenderer.fill_arc(&mut s, 10.0, 20.0, 5.0, 0.0, 1.0, false);
    let calls = s.calls();
    assert_eq!(calls[0], SurfaceCall::BeginPath);
    assert_eq!(calls[1], SurfaceCall::MoveTo(10.0, 20.0));
    assert_eq!(calls[2], SurfaceCall::LineTo(15.0, 20.0));
    assert!(matches!(calls[3], SurfaceCall::Arc { r, .. } if r == 5.0));
    assert_eq!(calls[4], SurfaceCall::LineTo(10.0, 20.0));
    assert_eq!(calls[5], SurfaceCall::Fill(FillRule::NonZero));
}

#[test]
fn stroke_arc_has_no_radii() {
    let mut s = RecordingSurface::default();
    StandardRenderer.stroke_arc(&mut s, 0.0, 0.0, 5.0, 0.0, 1.0, true);
    assert_eq!(s.count(|c| matches!(c, SurfaceCall::MoveTo(..) | SurfaceCall::LineTo(..))), 0);
    assert_eq!(s.calls().last(), Some(&SurfaceCall::Stroke));
}

#[test]
fn polygon_closes_before_fill_and_polyline_stays_open() {
    let pts = [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 4.0)];
    let mut s = RecordingSurface::default();
    StandardRenderer.fill_polygon(&mut s, &pts);
    assert_eq!(s.count(|c| *c == SurfaceCall::ClosePath), 1);

    let mut s = RecordingSurface::default();
    StandardRenderer.stroke_polyline(&mut s, &pts);
    assert_eq!(s.count(|c| *c == SurfaceCall::ClosePath), 0);
    assert_eq!(s.count(|c| matches!(c, SurfaceCall::LineTo(..))), 2);

    let mut s = RecordingSurface::default();
    StandardRenderer.fill_polygon(&mut s, &[]);
    assert!(s.calls().is_empty());
}

#[test]
fn sweep_follows_canvas_rules() {
    use std::f64::consts::PI;
    assert!((sweep_angle(0.0, PI / 2.0, false) - PI / 2.0).abs() < 1e-12);
    assert!((sweep_angle(0.0, PI / 2.0, true) + 3.0 * PI / 2.0).abs() < 1e-12);
    assert_eq!(sweep_angle(0.0, 3.0 * TAU, false), TAU);
    assert_eq!(sweep_angle(0.0, -3.0 * TAU, true), -TAU);
    assert_eq!(sweep_angle(1.0, 1.0, false), 0.0);
}

#[test]
fn sketchy_is_deterministic_and_multi_pass() {
    let sketchy = SketchyRenderer::default();
    let mut a = RecordingSurface::default();
    let mut b = RecordingSurface::default();
    sketchy.stroke_rect(&mut a, 1.0, 2.0, 30.0, 40.0);
    sketchy.stroke_rect(&mut b, 1.0, 2.0, 30.0, 40.0);
    assert_eq!(a.calls(), b.calls());
    assert_eq!(a.count(|c| *c == SurfaceCall::Stroke), sketchy.passes as usize);
    assert!(a.calls().iter().any(|c| matches!(c, SurfaceCall::MoveTo(x, _) if *x != 1.0)));
}

#[test]
fn renderer_kind_builds_strategies() {
    let mut s = RecordingSurface::default();
    RendererKind::Standard.build().fill_circle(&mut s, 0.0, 0.0, 1.0);
    assert_eq!(s.calls().len(), 3);

    let mut s = RecordingSurface::default();
    RendererKind::Sketchy.build().fill_circle(&mut s, 0.0, 0.0, 1.0);
    assert!(s.calls().len() > 3);
}
