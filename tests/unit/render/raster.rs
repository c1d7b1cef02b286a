use super::*;
use crate::render::surface::{Gradient, GradientKind, GradientStop};

fn surface(w: u32, h: u32) -> RasterSurface {
    RasterSurface::new(CanvasSize::new(w, h).unwrap())
}

fn red() -> StyleSetting {
    StyleSetting::FillStyle(Paint::Color(Rgba::new(255.0, 0.0, 0.0, 1.0)))
}

fn px(s: &mut RasterSurface, x: u32, y: u32) -> [u8; 4] {
    s.read_pixels().pixel(x, y).unwrap()
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(&b).all(|(x, y)| x.abs_diff(*y) <= 1)
}

#[test]
fn fill_rect_covers_interior_only() {
    let mut s = surface(20, 20);
    s.apply_style(&red());
    s.fill_rect(2.0, 2.0, 10.0, 10.0);
    assert_eq!(px(&mut s, 5, 5), [255, 0, 0, 255]);
    assert_eq!(px(&mut s, 15, 15), [0, 0, 0, 0]);
}

#[test]
fn transform_moves_later_geometry() {
    let mut s = surface(20, 20);
    s.translate(10.0, 10.0);
    s.fill_rect(0.0, 0.0, 5.0, 5.0);
    assert_eq!(px(&mut s, 2, 2)[3], 0);
    assert_eq!(px(&mut s, 12, 12), [0, 0, 0, 255]);
}

#[test]
fn global_alpha_scales_coverage() {
    let mut s = surface(8, 8);
    s.apply_style(&red());
    s.apply_style(&StyleSetting::GlobalAlpha(0.5));
    s.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert!(close(px(&mut s, 4, 4), [255, 0, 0, 128]));
    // Out-of-range alpha is ignored.
    s.apply_style(&StyleSetting::GlobalAlpha(3.0));
    s.fill_rect(0.0, 0.0, 8.0, 8.0);
    assert!(close(px(&mut s, 4, 4), [255, 0, 0, 192]));
}

#[test]
fn clear_rect_erases_a_region() {
    let mut s = surface(10, 10);
    s.fill_rect(0.0, 0.0, 10.0, 10.0);
    s.clear_rect(0.0, 0.0, 5.0, 10.0);
    assert_eq!(px(&mut s, 2, 5), [0, 0, 0, 0]);
    assert_eq!(px(&mut s, 7, 5), [0, 0, 0, 255]);
}

#[test]
fn put_image_data_is_exact_and_clipped_to_the_canvas() {
    let mut s = surface(4, 4);
    let img = Bitmap::from_rgba(2, 2, vec![
        10, 20, 30, 255, 40, 50, 60, 255, //
        70, 80, 90, 255, 100, 110, 120, 255,
    ])
    .unwrap();
    s.put_image_data(&img, 1, 1);
    assert_eq!(px(&mut s, 1, 1), [10, 20, 30, 255]);
    assert_eq!(px(&mut s, 2, 2), [100, 110, 120, 255]);

    s.put_image_data(&img, -1, 3);
    assert_eq!(px(&mut s, 0, 3), [40, 50, 60, 255]);

    // Fully outside is a no-op.
    s.put_image_data(&img, 10, 10);
}

#[test]
fn put_image_data_tolerates_extreme_offsets() {
    let mut s = surface(4, 4);
    s.fill_rect(0.0, 0.0, 4.0, 4.0);
    let img = Bitmap::from_rgba(2, 2, vec![255; 16]).unwrap();
    let far = (-1e30f64).round() as i64;
    s.put_image_data(&img, far, 0);
    s.put_image_data(&img, 0, i64::MAX);
    s.put_image_data(&img, i64::MAX, i64::MIN);
    assert_eq!(px(&mut s, 0, 0), [0, 0, 0, 255]);
    assert_eq!(px(&mut s, 3, 3), [0, 0, 0, 255]);
}

#[test]
fn put_image_data_ignores_transform_alpha_and_compositing() {
    let mut s = surface(2, 1);
    s.fill_rect(0.0, 0.0, 2.0, 1.0);
    s.scale(5.0, 5.0);
    s.apply_style(&StyleSetting::GlobalAlpha(0.1));
    let img = Bitmap::from_rgba(1, 1, vec![0, 0, 0, 0]).unwrap();
    s.put_image_data(&img, 1, 0);
    assert_eq!(px(&mut s, 1, 0), [0, 0, 0, 0]);
    assert_eq!(px(&mut s, 0, 0), [0, 0, 0, 255]);
}

#[test]
fn resize_discards_pixels_and_state() {
    let mut s = surface(4, 4);
    s.apply_style(&red());
    s.fill_rect(0.0, 0.0, 4.0, 4.0);
    s.resize(CanvasSize::new(8, 6).unwrap());
    let bmp = s.read_pixels();
    assert_eq!((bmp.width, bmp.height), (8, 6));
    assert!(bmp.data.iter().all(|v| *v == 0));
    s.fill_rect(0.0, 0.0, 1.0, 1.0);
    assert_eq!(px(&mut s, 0, 0), [0, 0, 0, 255]);
}

#[test]
fn save_restore_round_trips_style_and_transform() {
    let mut s = surface(10, 10);
    s.save();
    s.apply_style(&red());
    s.translate(5.0, 0.0);
    s.restore();
    s.fill_rect(0.0, 0.0, 2.0, 2.0);
    assert_eq!(px(&mut s, 1, 1), [0, 0, 0, 255]);
    // Unbalanced restore is ignored.
    s.restore();
}

#[test]
fn clip_limits_later_draws_until_restore() {
    let mut s = surface(10, 10);
    s.save();
    s.begin_path();
    s.rect(0.0, 0.0, 5.0, 10.0);
    s.clip(FillRule::NonZero);
    s.fill_rect(0.0, 0.0, 10.0, 10.0);
    assert_eq!(px(&mut s, 2, 2)[3], 255);
    assert_eq!(px(&mut s, 7, 2)[3], 0);
    s.restore();
    s.fill_rect(0.0, 0.0, 10.0, 10.0);
    assert_eq!(px(&mut s, 7, 2)[3], 255);
}

#[test]
fn path_fill_and_stroke() {
    let mut s = surface(20, 20);
    s.begin_path();
    s.move_to(2.0, 2.0);
    s.line_to(18.0, 2.0);
    s.line_to(18.0, 18.0);
    s.close_path();
    s.fill(FillRule::NonZero);
    assert_eq!(px(&mut s, 15, 5)[3], 255);
    assert_eq!(px(&mut s, 4, 15)[3], 0);

    let mut s = surface(20, 20);
    s.apply_style(&StyleSetting::LineWidth(2.0));
    s.stroke_rect(5.0, 5.0, 10.0, 10.0);
    assert_eq!(px(&mut s, 5, 10)[3], 255);
    assert_eq!(px(&mut s, 10, 10)[3], 0);
}

#[test]
fn composite_copy_replaces_everything() {
    let mut s = surface(10, 10);
    s.fill_rect(0.0, 0.0, 10.0, 10.0);
    s.apply_style(&StyleSetting::GlobalCompositeOperation(CompositeOp::Copy));
    s.apply_style(&red());
    s.fill_rect(0.0, 0.0, 5.0, 5.0);
    assert_eq!(px(&mut s, 2, 2), [255, 0, 0, 255]);
    assert_eq!(px(&mut s, 8, 8), [0, 0, 0, 0]);
}

#[test]
fn linear_gradient_interpolates_in_user_space() {
    let mut s = surface(100, 4);
    let g = Gradient::new(
        GradientKind::Linear {
            x0: 0.0,
            y0: 0.0,
            x1: 100.0,
            y1: 0.0,
        },
        vec![
            GradientStop {
                offset: 0.0,
                color: Rgba::new(255.0, 0.0, 0.0, 1.0),
            },
            GradientStop {
                offset: 1.0,
                color: Rgba::new(0.0, 0.0, 255.0, 1.0),
            },
        ],
    );
    s.apply_style(&StyleSetting::FillStyle(Paint::Gradient(Arc::new(g))));
    s.fill_rect(0.0, 0.0, 100.0, 4.0);
    let left = px(&mut s, 2, 2);
    let right = px(&mut s, 97, 2);
    assert!(left[0] > 240 && left[2] < 15);
    assert!(right[2] > 240 && right[0] < 15);
}

#[test]
fn draw_image_scales_into_destination() {
    let mut s = surface(10, 10);
    let img = Bitmap::from_rgba(1, 1, vec![0, 255, 0, 255]).unwrap();
    s.draw_image(&img, 2.0, 2.0, Some(4.0), Some(4.0));
    assert_eq!(px(&mut s, 4, 4), [0, 255, 0, 255]);
    assert_eq!(px(&mut s, 8, 8)[3], 0);
}

#[test]
fn text_without_fonts_draws_nothing() {
    let mut s = surface(10, 10);
    s.fill_text("hello", 1.0, 8.0, None);
    assert!(s.read_pixels().data.iter().all(|v| *v == 0));
}

#[test]
fn line_dash_rejects_negative_segments() {
    let mut s = surface(4, 4);
    s.set_line_dash(&[1.0, 2.0, 3.0]);
    assert_eq!(s.state.dash, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    s.set_line_dash(&[-1.0]);
    assert_eq!(s.state.dash.len(), 6);
    s.set_line_dash(&[]);
    assert!(s.state.dash.is_empty());
}
