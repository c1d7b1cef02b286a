use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        BridgeError::protocol("x")
            .to_string()
            .contains("protocol error:")
    );
    assert!(
        BridgeError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        BridgeError::delivery("x")
            .to_string()
            .contains("bridge delivery error:")
    );
    assert!(
        BridgeError::unsupported_pattern_source("x")
            .to_string()
            .contains("unsupported pattern source:")
    );
    assert!(
        BridgeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        BridgeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = BridgeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn json_errors_map_to_serde_variant() {
    let err: BridgeError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, BridgeError::Serde(_)));
    assert!(!err.is_protocol());
    assert!(BridgeError::protocol("bad opcode").is_protocol());
}
