use super::*;

#[test]
fn linear_gradient_param_and_colour() {
    let g = Gradient::new(
        GradientKind::Linear {
            x0: 0.0,
            y0: 0.0,
            x1: 10.0,
            y1: 0.0,
        },
        vec![
            GradientStop {
                offset: 1.0,
                color: Rgba::new(255.0, 255.0, 255.0, 1.0),
            },
            GradientStop {
                offset: 0.0,
                color: Rgba::BLACK,
            },
        ],
    );
    assert_eq!(g.stops[0].offset, 0.0);
    assert_eq!(g.param_at(5.0, 3.0), Some(0.5));
    let mid = g.color_at(0.5);
    assert!((mid.r - 127.5).abs() < 1e-9);
    assert_eq!(g.color_at(-1.0), Rgba::BLACK);
    assert_eq!(g.color_at(2.0).r, 255.0);
}

#[test]
fn radial_gradient_param_grows_with_distance() {
    let g = Gradient::new(
        GradientKind::Radial {
            x0: 0.0,
            y0: 0.0,
            r0: 0.0,
            x1: 0.0,
            y1: 0.0,
            r1: 10.0,
        },
        Vec::new(),
    );
    let t = g.param_at(5.0, 0.0).unwrap();
    assert!((t - 0.5).abs() < 1e-9);
    assert_eq!(g.color_at(0.3), Rgba::TRANSPARENT);
}

#[test]
fn pattern_tiling_modes() {
    let mut img = Bitmap::transparent(2, 1);
    img.data[0..4].copy_from_slice(&[255, 0, 0, 255]);
    img.data[4..8].copy_from_slice(&[0, 255, 0, 255]);
    let image = Arc::new(img);

    let repeat = Pattern {
        image: Arc::clone(&image),
        repetition: Repetition::Repeat,
    };
    assert_eq!(repeat.texel_at(2.5, 7.0), Some([255, 0, 0, 255]));
    assert_eq!(repeat.texel_at(-0.5, 0.0), Some([0, 255, 0, 255]));

    let once = Pattern {
        image,
        repetition: Repetition::parse("no-repeat").unwrap(),
    };
    assert_eq!(once.texel_at(1.5, 0.5), Some([0, 255, 0, 255]));
    assert_eq!(once.texel_at(2.5, 0.5), None);
    assert!(Repetition::parse("sideways").is_err());
}

#[test]
fn keyword_parsers() {
    assert_eq!(CompositeOp::parse("xor").unwrap(), CompositeOp::Xor);
    assert!(CompositeOp::parse("blend").unwrap_err().is_protocol());
    assert_eq!(FillRule::parse("evenodd").unwrap(), FillRule::EvenOdd);
    assert_eq!(Paint::default(), Paint::Color(Rgba::BLACK));
}

#[test]
fn line_and_text_keywords_parse() {
    assert_eq!(LineCap::parse("round").unwrap(), LineCap::Round);
    assert_eq!(LineJoin::parse("bevel").unwrap(), LineJoin::Bevel);
    assert_eq!(TextAlign::parse("center").unwrap(), TextAlign::Center);
    assert_eq!(TextBaseline::parse("middle").unwrap(), TextBaseline::Middle);
    assert!(LineCap::parse("pointy").unwrap_err().is_protocol());
    assert!(TextBaseline::parse("").is_err());
}
