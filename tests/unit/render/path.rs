use super::*;
use std::f64::consts::PI;

fn points(b: &PathBuilder) -> Vec<PathEl> {
    b.device_path().elements().to_vec()
}

#[test]
fn line_without_current_point_starts_a_subpath() {
    let mut b = PathBuilder::default();
    b.line_to(Affine::IDENTITY, 3.0, 4.0);
    assert_eq!(points(&b), vec![PathEl::MoveTo(Point::new(3.0, 4.0))]);
}

#[test]
fn points_are_fixed_in_device_space() {
    let mut b = PathBuilder::default();
    b.move_to(Affine::translate((10.0, 0.0)), 0.0, 0.0);
    b.line_to(Affine::IDENTITY, 5.0, 5.0);
    assert_eq!(
        points(&b),
        vec![
            PathEl::MoveTo(Point::new(10.0, 0.0)),
            PathEl::LineTo(Point::new(5.0, 5.0)),
        ]
    );
}

#[test]
fn rect_is_closed_and_non_finite_is_ignored() {
    let mut b = PathBuilder::default();
    b.rect(Affine::IDENTITY, 0.0, 0.0, 2.0, 2.0);
    assert_eq!(points(&b).len(), 5);
    assert_eq!(points(&b)[4], PathEl::ClosePath);
    b.rect(Affine::IDENTITY, f64::NAN, 0.0, 2.0, 2.0);
    assert_eq!(points(&b).len(), 5);
    b.clear();
    assert!(b.is_empty());
}

#[test]
fn arc_joins_current_point_with_a_line() {
    let mut b = PathBuilder::default();
    b.move_to(Affine::IDENTITY, 0.0, 0.0);
    b.arc(Affine::IDENTITY, 10.0, 0.0, 5.0, 0.0, PI, false);
    let els = points(&b);
    assert_eq!(els[1], PathEl::LineTo(Point::new(15.0, 0.0)));
    let bbox = b.device_path().bounding_box();
    assert!((bbox.max_y() - 5.0).abs() < 1e-6);
    assert!(bbox.min_y().abs() < 1e-6);
}

#[test]
fn negative_radius_is_ignored() {
    let mut b = PathBuilder::default();
    b.arc(Affine::IDENTITY, 0.0, 0.0, -1.0, 0.0, PI, false);
    assert!(b.is_empty());
}

#[test]
fn arc_to_rounds_a_corner() {
    let mut b = PathBuilder::default();
    b.move_to(Affine::IDENTITY, 0.0, 0.0);
    b.arc_to(Affine::IDENTITY, 10.0, 0.0, 10.0, 10.0, 5.0);
    match points(&b)[1] {
        PathEl::LineTo(p) => assert!((p.x - 5.0).abs() < 1e-9 && p.y.abs() < 1e-9),
        ref other => panic!("unexpected {other:?}"),
    }
    let bbox = b.device_path().bounding_box();
    assert!((bbox.max_x() - 10.0).abs() < 1e-6);
    assert!((bbox.max_y() - 5.0).abs() < 1e-6);
}

#[test]
fn collinear_arc_to_degrades_to_line() {
    let mut b = PathBuilder::default();
    b.move_to(Affine::IDENTITY, 0.0, 0.0);
    b.arc_to(Affine::IDENTITY, 5.0, 0.0, 10.0, 0.0, 2.0);
    assert_eq!(points(&b)[1], PathEl::LineTo(Point::new(5.0, 0.0)));
}

#[test]
fn user_path_inverts_the_transform() {
    let m = Affine::scale(2.0);
    let mut b = PathBuilder::default();
    b.move_to(m, 1.0, 1.0);
    let user = b.user_path(m).unwrap();
    assert_eq!(user.elements()[0], PathEl::MoveTo(Point::new(1.0, 1.0)));
    assert!(b.user_path(Affine::scale(0.0)).is_none());
}
