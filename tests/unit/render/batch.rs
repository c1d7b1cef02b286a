use super::*;
use crate::foundation::core::CanvasSize;
use crate::render::primitives::StandardRenderer;
use crate::render::recording::{RecordingSurface, SurfaceCall};

fn buf(values: &[f64]) -> Argument {
    Argument::Buffer {
        data: TypedBuffer::from_f64s(values),
        shape: None,
    }
}

fn surface() -> RecordingSurface {
    RecordingSurface::new(CanvasSize::new(100, 100).unwrap())
}

#[test]
fn item_count_is_max_and_short_fields_broadcast() {
    let mut s = surface();
    let mut exec = BatchExecutor::new(&StandardRenderer);
    let n = exec
        .rects(
            &mut s,
            Mode::Fill,
            &buf(&[0.0, 1.0, 2.0, 3.0, 4.0]),
            &buf(&[7.0]),
            &Argument::number(2.0),
            Some(&Argument::number(3.0)),
            None,
        )
        .unwrap();
    assert_eq!(n, 5);
    let rects: Vec<_> = s
        .calls()
        .iter()
        .filter_map(|c| match c {
            SurfaceCall::FillRect(x, y, w, h) => Some((*x, *y, *w, *h)),
            _ => None,
        })
        .collect();
    assert_eq!(rects.len(), 5);
    assert_eq!(rects[4], (4.0, 7.0, 2.0, 3.0));
}

#[test]
fn missing_height_reuses_width() {
    let mut s = surface();
    BatchExecutor::new(&StandardRenderer)
        .rects(
            &mut s,
            Mode::Stroke,
            &Argument::number(1.0),
            &Argument::number(1.0),
            &buf(&[4.0, 6.0]),
            None,
            None,
        )
        .unwrap();
    assert_eq!(s.calls()[1], SurfaceCall::StrokeRect(1.0, 1.0, 6.0, 6.0));
}

#[test]
fn partial_numeric_field_is_rejected_before_drawing() {
    let mut s = surface();
    let err = BatchExecutor::new(&StandardRenderer)
        .circles(
            &mut s,
            Mode::Fill,
            &buf(&[0.0, 1.0, 2.0]),
            &buf(&[0.0, 1.0]),
            &Argument::number(1.0),
            None,
        )
        .unwrap_err();
    assert!(err.is_protocol());
    assert!(s.calls().is_empty());
}

#[test]
fn styled_items_set_style_before_each_draw() {
    let mut s = surface();
    let color = buf(&[255.0, 0.0, 0.0, 0.0, 0.0, 255.0]);
    let alpha = Argument::number(1.0);
    let n = BatchExecutor::new(&StandardRenderer)
        .circles(
            &mut s,
            Mode::Stroke,
            &buf(&[10.0, 20.0, 30.0]),
            &Argument::number(5.0),
            &Argument::number(2.0),
            Some((&color, &alpha)),
        )
        .unwrap();
    assert_eq!(n, 3);

    let calls = s.calls();
    let style_at: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, SurfaceCall::Style(_)))
        .map(|(i, _)| i)
        .collect();
    let strokes_at: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == SurfaceCall::Stroke)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(style_at.len(), 3);
    for (st, sk) in style_at.iter().zip(&strokes_at) {
        assert!(st < sk);
    }
    // Third item is past the two declared colours and reuses the first.
    match &calls[style_at[2]] {
        SurfaceCall::Style(StyleSetting::StrokeStyle(Paint::Color(c))) => {
            assert_eq!((c.r, c.b), (255.0, 0.0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn fill_arcs_are_pie_slices() {
    let mut s = surface();
    let zero = Argument::number(0.0);
    let one = Argument::number(1.0);
    let xs = buf(&[10.0, 50.0]);
    BatchExecutor::new(&StandardRenderer)
        .arcs(&mut s, Mode::Fill, [&xs, &zero, &one, &zero, &one], false, None)
        .unwrap();
    assert_eq!(s.count(|c| matches!(c, SurfaceCall::Arc { .. })), 2);
    assert_eq!(s.count(|c| *c == SurfaceCall::Fill(crate::render::surface::FillRule::NonZero)), 2);
    assert_eq!(s.calls()[1], SurfaceCall::MoveTo(10.0, 0.0));
}

#[test]
fn polygon_scan_offsets_accumulate() {
    let counts = buf(&[3.0, 2.0, 4.0]);
    let acc = counts.numbers().unwrap();
    let ranges: Vec<_> = PolygonScan::new(acc, 3).collect();
    assert_eq!(ranges, vec![0..6, 6..10, 10..18]);
    assert_eq!(PolygonScan::total(acc, 3).unwrap(), 18);
}

#[test]
fn polygons_draw_per_item_vertex_lists() {
    let coords: Vec<f64> = (0..18).map(f64::from).collect();
    let mut s = surface();
    let n = BatchExecutor::new(&StandardRenderer)
        .polygons(
            &mut s,
            Mode::Fill,
            true,
            &buf(&coords),
            &buf(&[3.0, 2.0, 4.0]),
            None,
        )
        .unwrap();
    assert_eq!(n, 3);
    let moves: Vec<_> = s
        .calls()
        .iter()
        .filter_map(|c| match c {
            SurfaceCall::MoveTo(x, y) => Some((*x, *y)),
            _ => None,
        })
        .collect();
    assert_eq!(moves, vec![(0.0, 1.0), (6.0, 7.0), (10.0, 11.0)]);
    assert_eq!(s.count(|c| matches!(c, SurfaceCall::LineTo(..))), 2 + 1 + 3);
}

#[test]
fn polygons_reject_short_point_buffer() {
    let mut s = surface();
    let err = BatchExecutor::new(&StandardRenderer)
        .polygons(
            &mut s,
            Mode::Stroke,
            false,
            &buf(&[0.0; 6]),
            &buf(&[2.0, 2.0]),
            None,
        )
        .unwrap_err();
    assert!(err.is_protocol());
    assert!(s.calls().is_empty());
}

#[test]
fn polygons_reject_huge_vertex_counts() {
    for counts in [[1e19, 1.0], [9_223_372_036_854_775_808.0, 2.0]] {
        let mut s = surface();
        let err = BatchExecutor::new(&StandardRenderer)
            .polygons(
                &mut s,
                Mode::Fill,
                true,
                &buf(&[0.0; 4]),
                &buf(&counts),
                None,
            )
            .unwrap_err();
        assert!(err.is_protocol());
        assert!(s.calls().is_empty());
    }
    assert!(PolygonScan::total(buf(&[1e19]).numbers().unwrap(), 1).is_err());
}

#[test]
fn single_polygon_uses_all_points() {
    let mut s = surface();
    BatchExecutor::new(&StandardRenderer)
        .polygon(&mut s, Mode::Stroke, false, &buf(&[0.0, 0.0, 1.0, 1.0, 2.0, 0.0]))
        .unwrap();
    assert_eq!(s.count(|c| matches!(c, SurfaceCall::LineTo(..))), 2);
    assert!(
        BatchExecutor::new(&StandardRenderer)
            .polygon(&mut s, Mode::Fill, true, &buf(&[0.0, 1.0, 2.0]))
            .is_err()
    );
}
