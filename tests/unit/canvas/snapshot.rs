use super::*;

fn sample() -> Bitmap {
    Bitmap::from_rgba(2, 1, vec![1, 2, 3, 255, 200, 100, 50, 128]).unwrap()
}

#[test]
fn png_round_trip_is_lossless() {
    let bmp = sample();
    let snap = Snapshot::encode(&bmp).unwrap();
    assert_eq!((snap.width, snap.height), (2, 1));
    assert_eq!(&snap.png[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(snap.decode().unwrap(), bmp);
}

#[test]
fn fingerprint_tracks_pixels_and_size() {
    let a = sample();
    let mut b = sample();
    assert_eq!(fingerprint(&a), fingerprint(&b));
    b.data[0] = 9;
    assert_ne!(fingerprint(&a), fingerprint(&b));
    let wide = Bitmap::transparent(2, 1);
    let tall = Bitmap::transparent(1, 2);
    assert_ne!(fingerprint(&wide), fingerprint(&tall));
}

#[test]
fn garbage_bytes_are_a_resource_error() {
    let err = decode_image(b"definitely not an image").unwrap_err();
    assert!(matches!(err, BridgeError::Resource(_)));
}
