use super::*;
use crate::geometry::bounds::{BoundingBox, bounds_of_bez};
use kurbo::PathEl;

#[test]
fn ellipse_stays_inside_its_box() {
    let b = bounds_of_bez(&ellipse_path(10.0, 20.0, 100.0, 50.0));
    assert_eq!(b, BoundingBox::new(10.0, 20.0, 100.0, 50.0));
    let curves = ellipse_path(0.0, 0.0, 1.0, 1.0)
        .elements()
        .iter()
        .filter(|e| matches!(e, PathEl::CurveTo(..)))
        .count();
    assert_eq!(curves, 4);
}

#[test]
fn star_starts_at_top_with_ten_vertices() {
    let bp = star_path(0.0, 0.0, 100.0, 100.0);
    let els = bp.elements();
    assert_eq!(els[0], PathEl::MoveTo(Point::new(50.0, 0.0)));
    let lines = els.iter().filter(|e| matches!(e, PathEl::LineTo(_))).count();
    assert_eq!(lines, 9);
    let PathEl::LineTo(inner) = els[1] else {
        panic!("expected line");
    };
    let r = ((inner.x - 50.0).powi(2) + (inner.y - 50.0).powi(2)).sqrt();
    assert!((r - 50.0 * STAR_INNER_RATIO).abs() < 1e-9);
}

#[test]
fn polygon_vertex_count_follows_sides() {
    let bp = polygon_path(0.0, 0.0, 10.0, 10.0, 6);
    let verts = bp
        .elements()
        .iter()
        .filter(|e| matches!(e, PathEl::MoveTo(_) | PathEl::LineTo(_)))
        .count();
    assert_eq!(verts, 6);
    let tri = polygon_path(0.0, 0.0, 10.0, 10.0, 1);
    assert_eq!(tri.elements().len(), 4);
}

#[test]
fn names_resolve_to_primitives() {
    assert_eq!(Primitive::from_name("Rectangle", None), Some(Primitive::Rectangle));
    assert_eq!(Primitive::from_name("hexagon", None), Some(Primitive::Polygon(6)));
    assert_eq!(Primitive::from_name("polygon", Some(7)), Some(Primitive::Polygon(7)));
    assert_eq!(Primitive::from_name("blob", None), None);
    assert!(Primitive::Arrow.is_stroked());
    assert!(!Primitive::Star.is_stroked());
}

#[test]
fn arrow_is_open() {
    let bp = arrow_path(0.0, 0.0, 100.0, 20.0);
    assert!(!bp.elements().iter().any(|e| matches!(e, PathEl::ClosePath)));
}

#[test]
fn zero_radius_rounded_rect_is_rect() {
    assert_eq!(
        rounded_rect_path(1.0, 2.0, 3.0, 4.0, 0.0),
        rect_path(1.0, 2.0, 3.0, 4.0)
    );
    let b = bounds_of_bez(&rounded_rect_path(0.0, 0.0, 40.0, 20.0, 5.0));
    assert_eq!(b, BoundingBox::new(0.0, 0.0, 40.0, 20.0));
}
