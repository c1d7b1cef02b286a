use super::*;

#[test]
fn font_shorthand_extracts_size_and_families() {
    let spec = FontSpec::parse("italic bold 16px/1.2 \"Open Sans\", serif").unwrap();
    assert_eq!(spec.size_px, 16.0);
    assert_eq!(spec.families, vec!["Open Sans".to_owned(), "serif".to_owned()]);

    let pt = FontSpec::parse("12pt monospace").unwrap();
    assert!((pt.size_px - 16.0).abs() < 1e-4);
}

#[test]
fn unparsable_font_is_rejected() {
    assert!(FontSpec::parse("bold serif").is_none());
    assert!(FontSpec::parse("12px").is_none());
    assert!(FontSpec::parse("-3px serif").is_none());
    assert_eq!(FontSpec::default().size_px, 10.0);
}

#[test]
fn shaping_without_fonts_yields_nothing() {
    let mut engine = TextEngine::default();
    assert!(!engine.has_fonts());
    assert!(engine.shape("hi", &FontSpec::default()).unwrap().is_none());
}

#[test]
fn garbage_font_bytes_are_a_resource_error() {
    let mut engine = TextEngine::default();
    let err = engine.register_font(b"not a font").unwrap_err();
    assert!(matches!(err, BridgeError::Resource(_)));
}
