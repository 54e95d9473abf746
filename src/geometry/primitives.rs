//! Closed-form path generators for the built-in shape primitives, parametrized by a box.

use std::f64::consts::PI;

use crate::foundation::core::{BezPath, Point};

/// Bézier circle approximation constant for a 4-segment ellipse.
pub const ELLIPSE_KAPPA: f64 = 0.552_284_8;

/// Inner/outer radius ratio of the five-pointed star.
pub const STAR_INNER_RATIO: f64 = 0.382;

/// Built-in shape named by a clip's `shape` identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    /// Axis-aligned rectangle filling the box.
    Rectangle,
    /// Ellipse inscribed in the box.
    Circle,
    /// Isosceles triangle pointing up.
    Triangle,
    /// Five-pointed star.
    Star,
    /// Regular polygon with the given side count.
    Polygon(u32),
    /// Horizontal arrow, stroked rather than filled.
    Arrow,
}

impl Primitive {
    /// Resolve a shape identifier. Unknown names return `None` and are treated as custom paths or
    /// external sources by the caller.
    pub fn from_name(name: &str, sides: Option<u32>) -> Option<Self> {
        let p = match name.trim().to_ascii_lowercase().as_str() {
            "rect" | "rectangle" | "square" => Self::Rectangle,
            "circle" | "ellipse" | "oval" => Self::Circle,
            "triangle" => Self::Triangle,
            "star" => Self::Star,
            "polygon" => Self::Polygon(sides.unwrap_or(6).max(3)),
            "pentagon" => Self::Polygon(5),
            "hexagon" => Self::Polygon(6),
            "octagon" => Self::Polygon(8),
            "arrow" | "line" => Self::Arrow,
            _ => return None,
        };
        Some(p)
    }

    /// Whether the primitive is drawn as a stroke instead of a fill.
    pub fn is_stroked(self) -> bool {
        matches!(self, Self::Arrow)
    }

    /// Path of this primitive inside `(x, y, w, h)`.
    pub fn path(self, x: f64, y: f64, w: f64, h: f64) -> BezPath {
        match self {
            Self::Rectangle => rect_path(x, y, w, h),
            Self::Circle => ellipse_path(x, y, w, h),
            Self::Triangle => triangle_path(x, y, w, h),
            Self::Star => star_path(x, y, w, h),
            Self::Polygon(sides) => polygon_path(x, y, w, h, sides),
            Self::Arrow => arrow_path(x, y, w, h),
        }
    }
}

/// Closed rectangle.
pub fn rect_path(x: f64, y: f64, w: f64, h: f64) -> BezPath {
    closed_polyline(&[
        Point::new(x, y),
        Point::new(x + w, y),
        Point::new(x + w, y + h),
        Point::new(x, y + h),
    ])
}

/// Closed rectangle with corner radius `r` (clamped to half the shorter side).
pub fn rounded_rect_path(x: f64, y: f64, w: f64, h: f64, r: f64) -> BezPath {
    let r = r.clamp(0.0, 0.5 * w.min(h));
    if r <= 0.0 {
        return rect_path(x, y, w, h);
    }
    let k = r * (1.0 - ELLIPSE_KAPPA);
    let mut bp = BezPath::new();
    bp.move_to((x + r, y));
    bp.line_to((x + w - r, y));
    bp.curve_to((x + w - k, y), (x + w, y + k), (x + w, y + r));
    bp.line_to((x + w, y + h - r));
    bp.curve_to((x + w, y + h - k), (x + w - k, y + h), (x + w - r, y + h));
    bp.line_to((x + r, y + h));
    bp.curve_to((x + k, y + h), (x, y + h - k), (x, y + h - r));
    bp.line_to((x, y + r));
    bp.curve_to((x, y + k), (x + k, y), (x + r, y));
    bp.close_path();
    bp
}

/// Ellipse inscribed in the box, four cubic segments using [`ELLIPSE_KAPPA`].
pub fn ellipse_path(x: f64, y: f64, w: f64, h: f64) -> BezPath {
    let (rx, ry) = (w * 0.5, h * 0.5);
    let (cx, cy) = (x + rx, y + ry);
    let (ox, oy) = (rx * ELLIPSE_KAPPA, ry * ELLIPSE_KAPPA);
    let mut bp = BezPath::new();
    bp.move_to((cx, y));
    bp.curve_to((cx + ox, y), (x + w, cy - oy), (x + w, cy));
    bp.curve_to((x + w, cy + oy), (cx + ox, y + h), (cx, y + h));
    bp.curve_to((cx - ox, y + h), (x, cy + oy), (x, cy));
    bp.curve_to((x, cy - oy), (cx - ox, y), (cx, y));
    bp.close_path();
    bp
}

/// Apex at top center, base along the bottom edge.
pub fn triangle_path(x: f64, y: f64, w: f64, h: f64) -> BezPath {
    closed_polyline(&[
        Point::new(x + w * 0.5, y),
        Point::new(x + w, y + h),
        Point::new(x, y + h),
    ])
}

/// Five-pointed star: ten vertices at multiples of `π/5`, starting at the top, alternating outer
/// and inner radius ([`STAR_INNER_RATIO`]).
pub fn star_path(x: f64, y: f64, w: f64, h: f64) -> BezPath {
    let (rx, ry) = (w * 0.5, h * 0.5);
    let (cx, cy) = (x + rx, y + ry);
    let pts: Vec<Point> = (0..10)
        .map(|i| {
            let angle = f64::from(i) * PI / 5.0 - PI / 2.0;
            let k = if i % 2 == 0 { 1.0 } else { STAR_INNER_RATIO };
            Point::new(cx + rx * k * angle.cos(), cy + ry * k * angle.sin())
        })
        .collect();
    closed_polyline(&pts)
}

/// Regular polygon with `sides` vertices (at least 3), first vertex at the top.
pub fn polygon_path(x: f64, y: f64, w: f64, h: f64, sides: u32) -> BezPath {
    let n = sides.max(3);
    let (rx, ry) = (w * 0.5, h * 0.5);
    let (cx, cy) = (x + rx, y + ry);
    let pts: Vec<Point> = (0..n)
        .map(|i| {
            let angle = f64::from(i) * 2.0 * PI / f64::from(n) - PI / 2.0;
            Point::new(cx + rx * angle.cos(), cy + ry * angle.sin())
        })
        .collect();
    closed_polyline(&pts)
}

/// Open arrow along the vertical center: shaft plus two head strokes.
pub fn arrow_path(x: f64, y: f64, w: f64, h: f64) -> BezPath {
    let cy = y + h * 0.5;
    let tip = x + w;
    let head = (w * 0.25).min(h * 0.5).max(0.0);
    let mut bp = BezPath::new();
    bp.move_to((x, cy));
    bp.line_to((tip, cy));
    bp.move_to((tip - head, cy - head));
    bp.line_to((tip, cy));
    bp.line_to((tip - head, cy + head));
    bp
}

fn closed_polyline(pts: &[Point]) -> BezPath {
    let mut bp = BezPath::new();
    for (i, &p) in pts.iter().enumerate() {
        if i == 0 {
            bp.move_to(p);
        } else {
            bp.line_to(p);
        }
    }
    bp.close_path();
    bp
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/primitives.rs"]
mod tests;
