use super::*;
use kurbo::Point;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn decompose_pure_scale_translate() {
    let p = decompose_transform(Affine::new([2.0, 0.0, 0.0, 3.0, 5.0, 6.0]));
    assert_eq!((p.scale_x, p.scale_y), (2.0, 3.0));
    assert_eq!((p.translate_x, p.translate_y), (5.0, 6.0));
    assert!(!p.has_rotation());
}

#[test]
fn decompose_rotation() {
    let m = Affine::translate((4.0, 2.0)) * Affine::rotate(30f64.to_radians()) * Affine::scale(2.0);
    let p = decompose_transform(m);
    assert!(approx(p.angle_degrees, 30.0));
    assert!(approx(p.scale_x, 2.0));
    assert!(approx(p.scale_y, 2.0));
    assert!(p.has_rotation());
    assert_eq!((p.translate_x, p.translate_y), (4.0, 2.0));
}

#[test]
fn mirror_is_not_rotation() {
    let p = decompose_transform(Affine::scale_non_uniform(-1.0, 1.0));
    assert!(!p.has_rotation());
    assert_eq!(p.scale_x, -1.0);
    assert_eq!(p.without_rotation(), Affine::scale_non_uniform(-1.0, 1.0));
}

#[test]
fn parse_transform_lists_compose_left_to_right() {
    let m = parse_transform("translate(10,20) scale(2)").unwrap();
    assert_eq!(m * Point::new(1.0, 1.0), Point::new(12.0, 22.0));

    let r = parse_transform("rotate(90 50 50)").unwrap();
    let p = r * Point::new(100.0, 50.0);
    assert!(approx(p.x, 50.0) && approx(p.y, 100.0), "{p:?}");

    assert_eq!(
        parse_transform("matrix(1 0 0 1 5 5)").unwrap(),
        Affine::translate((5.0, 5.0))
    );
    assert_eq!(parse_transform("").unwrap(), Affine::IDENTITY);
}

#[test]
fn parse_transform_rejects_malformed() {
    assert!(parse_transform("scale(").is_none());
    assert!(parse_transform("spin(3)").is_none());
    assert!(parse_transform("translate(a,b)").is_none());
    assert!(parse_transform("matrix(1 2 3)").is_none());
}

#[test]
fn identity_check() {
    assert!(is_identity(Affine::IDENTITY));
    assert!(!is_identity(Affine::translate((0.1, 0.0))));
}
