use super::*;

#[test]
fn canvas_size_rejects_zero_and_oversized() {
    assert!(CanvasSize::new(0, 10).is_err());
    assert!(CanvasSize::new(10, 0).is_err());
    assert!(CanvasSize::new(70_000, 10).is_err());
    let s = CanvasSize::new(300, 150).unwrap();
    assert_eq!(s.pixel_count(), 45_000);
}

#[test]
fn bitmap_from_channels_expands_gray_and_rgb() {
    let gray = Bitmap::from_channels(2, 1, 1, &[10, 20]).unwrap();
    assert_eq!(gray.data, vec![10, 10, 10, 255, 20, 20, 20, 255]);

    let rgb = Bitmap::from_channels(1, 1, 3, &[1, 2, 3]).unwrap();
    assert_eq!(rgb.pixel(0, 0), Some([1, 2, 3, 255]));

    assert!(Bitmap::from_channels(2, 2, 3, &[0; 5]).is_err());
    assert!(Bitmap::from_channels(1, 1, 2, &[0; 2]).is_err());
}

#[test]
fn bitmap_pixel_out_of_bounds_is_none() {
    let b = Bitmap::transparent(2, 2);
    assert_eq!(b.pixel(1, 1), Some([0, 0, 0, 0]));
    assert_eq!(b.pixel(2, 0), None);
}

#[test]
fn premultiply_then_unpremultiply_keeps_opaque_exact() {
    let mut px = vec![200, 100, 50, 255, 200, 100, 50, 128, 9, 9, 9, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[0..4], &[200, 100, 50, 255]);
    assert_eq!(&px[8..12], &[0, 0, 0, 0]);
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[0..4], &[200, 100, 50, 255]);
    for (got, want) in px[4..7].iter().zip([200u8, 100, 50]) {
        assert!((i16::from(*got) - i16::from(want)).abs() <= 1);
    }
}
