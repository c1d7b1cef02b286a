use super::*;
use crate::protocol::decode::Decoder;

#[test]
fn buffer_indices_are_local_to_each_command() {
    let mut b = CommandBuilder::new();
    b.push(Opcode::FillCircles, [Arg::F64(vec![1.0, 2.0]), Arg::F64(vec![3.0, 4.0]), 5.0.into()]);
    b.push(Opcode::StrokeRects, [Arg::I32(vec![7]), 0.0.into(), 1.0.into(), 1.0.into()]);
    let (msg, buffers) = b.finish();

    assert_eq!(buffers.len(), 3);
    assert_eq!(msg[0][2], 2);
    assert_eq!(msg[1][1][0]["idx"], 0);
    assert_eq!(msg[1][1][0]["dtype"], "int32");
    assert_eq!(msg[1][2], 1);
}

#[test]
fn polygon_geometry_survives_encode_decode() {
    let points: Vec<f32> = (0..18).map(|v| v as f32).collect();
    let mut b = CommandBuilder::new();
    b.push(
        Opcode::FillPolygons,
        [Arg::F32(points.clone()), Arg::I32(vec![3, 2, 4])],
    );
    let (msg, buffers) = b.finish();

    let mut decoded = None;
    let report = Decoder::default().run(&msg, &buffers, |c| {
        decoded = Some((
            c.arg(0)?.as_buffer()?.to_vec(),
            c.arg(1)?.as_buffer()?.to_vec(),
        ));
        Ok(())
    });
    assert!(report.is_clean());
    let (pts, counts) = decoded.unwrap();
    assert_eq!(counts, vec![3.0, 2.0, 4.0]);
    assert_eq!(pts, points.iter().map(|v| f64::from(*v)).collect::<Vec<_>>());
}

#[test]
fn set_uses_attribute_index() {
    let mut b = CommandBuilder::new();
    b.set(StyleAttribute::LineWidth, 3.0);
    assert_eq!(b.len(), 1);
    let (msg, buffers) = b.finish();
    assert!(buffers.is_empty());
    assert_eq!(msg[0][0], 40);
    assert_eq!(msg[0][1][0], 8);
    assert_eq!(msg[0][1][1], 3.0);
}

#[test]
fn shaped_pixels_carry_their_shape() {
    let mut b = CommandBuilder::new();
    b.push(
        Opcode::PutImageData,
        [
            Arg::U8 {
                data: vec![0; 2 * 3 * 4],
                shape: Some(vec![2, 3, 4]),
            },
            0.0.into(),
            0.0.into(),
        ],
    );
    let (msg, _) = b.finish();
    assert_eq!(msg[0][1][0]["shape"], serde_json::json!([2, 3, 4]));
}
