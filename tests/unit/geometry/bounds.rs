use super::*;
use crate::foundation::core::PathPrecision;
use crate::geometry::path::transform_path;

#[test]
fn scaled_and_translated_square_bounds() {
    let d = transform_path(
        "M0 0L100 0L100 100L0 100Z",
        Affine::new([2.0, 0.0, 0.0, 2.0, 10.0, 10.0]),
        PathPrecision::default(),
    );
    assert_eq!(bounds_of_path(&d), BoundingBox::new(10.0, 10.0, 200.0, 200.0));
}

#[test]
fn control_points_are_included() {
    assert_eq!(
        bounds_of_path("M0 0C0 100 100 100 100 0"),
        BoundingBox::new(0.0, 0.0, 100.0, 100.0)
    );
}

#[test]
fn empty_and_malformed_yield_zero_box() {
    assert_eq!(bounds_of_path(""), BoundingBox::ZERO);
    assert_eq!(bounds_of_path("M1 2 L"), BoundingBox::ZERO);
    assert_eq!(bounds_of_path("nonsense"), BoundingBox::ZERO);
}

#[test]
fn close_returns_to_subpath_start() {
    let b = bounds_of_path("M10 10l10 0l0 10z m5 5 l1 1");
    assert_eq!(b, BoundingBox::new(10.0, 10.0, 10.0, 10.0));
}

#[test]
fn every_point_lies_inside_bounds() {
    for d in [
        "M5 5C-20 40 80 -30 60 60Q100 20 10 90Z",
        "m0 0 l10 -5 c1 2 3 4 5 6 s-7 8 9 10 t4 4 h-30 v-2z",
        "M0 0A30 10 45 1 0 40 40",
    ] {
        let bp = parse_bez(d);
        let b = bounds_of_bez(&bp);
        for p in path_points(&bp) {
            assert!(b.contains(p), "{p:?} outside {b:?} for {d}");
        }
    }
}

#[test]
fn union_and_transform() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, -5.0, 10.0, 10.0);
    assert_eq!(a.union(&b), BoundingBox::new(0.0, -5.0, 15.0, 15.0));
    let t = a.transform(Affine::translate((3.0, 4.0)) * Affine::scale(2.0));
    assert_eq!(t, BoundingBox::new(3.0, 4.0, 20.0, 20.0));
    assert_eq!(BoundingBox::from_rect(a.to_rect()), a);
    assert_eq!(a.center(), Point::new(5.0, 5.0));
}
