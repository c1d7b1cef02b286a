use super::*;

fn f32_buffer(values: &[f32]) -> TypedBuffer {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    TypedBuffer::new(DType::Float32, bytes.into()).unwrap()
}

#[test]
fn dtype_names_and_widths() {
    for name in [
        "int8", "uint8", "int16", "uint16", "int32", "uint32", "float32", "float64",
    ] {
        assert_eq!(DType::parse(name).unwrap().name(), name);
    }
    assert_eq!(DType::Int16.width(), 2);
    assert_eq!(DType::Float64.width(), 8);
    assert!(DType::parse("int64").unwrap_err().is_protocol());
}

#[test]
fn typed_buffer_rejects_ragged_bytes() {
    let err = TypedBuffer::new(DType::Int32, vec![0u8; 6].into()).unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn typed_buffer_reads_little_endian_values() {
    let bytes: Vec<u8> = [-3i16, 500].iter().flat_map(|v| v.to_le_bytes()).collect();
    let b = TypedBuffer::new(DType::Int16, bytes.into()).unwrap();
    assert_eq!(b.len(), 2);
    assert_eq!(b.get(0), Some(-3.0));
    assert_eq!(b.get(1), Some(500.0));
    assert_eq!(b.get(2), None);

    let b = TypedBuffer::new(DType::Int8, vec![0xff_u8].into()).unwrap();
    assert_eq!(b.get(0), Some(-1.0));
    let b = TypedBuffer::new(DType::Uint8, vec![0xff_u8].into()).unwrap();
    assert_eq!(b.get(0), Some(255.0));
}

#[test]
fn buffered_accessor_returns_raw_elements() {
    let raw = [1.5f32, -2.0, 7.25, 0.0];
    let arg = Argument::Buffer {
        data: f32_buffer(&raw),
        shape: None,
    };
    let acc = arg.numbers().unwrap();
    assert_eq!(acc.len(), 4);
    for (i, v) in raw.iter().enumerate() {
        assert_eq!(acc.get(i), f64::from(*v));
    }
}

#[test]
fn length_one_buffer_and_scalar_broadcast() {
    let arg = Argument::Buffer {
        data: f32_buffer(&[42.0]),
        shape: None,
    };
    let acc = arg.numbers().unwrap();
    assert!(matches!(acc, NumberAccessor::Broadcast(_)));
    for (i, j) in [(0, 1), (3, 1000), (7, 99)] {
        assert_eq!(acc.get(i), acc.get(j));
    }

    let scalar = Argument::number(3.0);
    let acc = scalar.numbers().unwrap();
    assert_eq!(acc.len(), 1);
    assert_eq!(acc.get(0), acc.get(12345));
}

#[test]
fn scalar_conversions() {
    assert_eq!(
        Argument::Scalar(serde_json::json!(true)).as_f64().unwrap(),
        1.0
    );
    assert!(Argument::Scalar(serde_json::json!(0)).as_bool().is_ok_and(|b| !b));
    assert!(Argument::Scalar(serde_json::Value::Null).is_null());
    assert_eq!(
        Argument::Scalar(serde_json::json!("red")).as_str().unwrap(),
        "red"
    );
    assert!(Argument::number(1.0).as_str().unwrap_err().is_protocol());
    assert!(
        Argument::Scalar(serde_json::json!("x"))
            .as_f64()
            .unwrap_err()
            .is_protocol()
    );
}

#[test]
fn inline_values_become_float64() {
    let b = TypedBuffer::from_f64s(&[1.0, 2.5]);
    assert_eq!(b.dtype(), DType::Float64);
    assert_eq!(b.to_vec(), vec![1.0, 2.5]);
}
