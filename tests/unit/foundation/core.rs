use super::*;

#[test]
fn canvas_rejects_zero_sides() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    let c = Canvas::new(1920, 1080).unwrap();
    assert!((c.aspect_ratio() - 16.0 / 9.0).abs() < 1e-12);
}

#[test]
fn path_precision_rounds_and_validates() {
    let p = PathPrecision::default();
    assert_eq!(p.decimals(), 2);
    assert_eq!(p.round(1.23456), 1.23);
    assert!(PathPrecision::new(9).is_err());
    assert_eq!(PathPrecision::new(0).unwrap().round(2.6), 3.0);
}

#[test]
fn color_parse_forms() {
    assert_eq!(Rgba8::parse("#fff"), Some(Rgba8::WHITE));
    assert_eq!(Rgba8::parse("#FF0000"), Some(Rgba8::rgb(255, 0, 0)));
    assert_eq!(
        Rgba8::parse("#00000080"),
        Some(Rgba8 {
            r: 0,
            g: 0,
            b: 0,
            a: 128
        })
    );
    assert_eq!(Rgba8::parse("rgb(10, 20, 30)"), Some(Rgba8::rgb(10, 20, 30)));
    assert_eq!(
        Rgba8::parse("rgba(10,20,30,0.5)").map(|c| c.a),
        Some(128)
    );
    assert_eq!(Rgba8::parse("Navy"), Some(Rgba8::rgb(0, 0, 128)));
    assert_eq!(Rgba8::parse("none"), None);
    assert_eq!(Rgba8::parse("#12"), None);
}

#[test]
fn color_serde_is_hex_string() {
    let c = Rgba8::rgb(1, 2, 3);
    let json = serde_json::to_string(&c).unwrap();
    assert_eq!(json, "\"#010203\"");
    let back: Rgba8 = serde_json::from_str(&json).unwrap();
    assert_eq!(back, c);
}

#[test]
fn premul_rounds_half_up() {
    let p = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(p.to_array(), [128, 64, 0, 128]);
}
