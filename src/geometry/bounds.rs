use kurbo::PathEl;

use crate::foundation::core::{Affine, BezPath, Point, Rect};
use crate::geometry::path::parse_bez;

/// Axis-aligned box `{x, y, width, height}` in some coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width (never negative).
    pub width: f64,
    /// Height (never negative).
    pub height: f64,
}

impl BoundingBox {
    /// Empty box at the origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Box from origin and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in it {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Right edge.
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Box center.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Whether the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Closed containment test (edges included).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.max_x() && p.y >= self.y && p.y <= self.max_y()
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Self) -> Self {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.max_x().max(other.max_x());
        let y1 = self.max_y().max(other.max_y());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Box of the four transformed corners.
    pub fn transform(&self, m: Affine) -> Self {
        let corners = [
            Point::new(self.x, self.y),
            Point::new(self.max_x(), self.y),
            Point::new(self.x, self.max_y()),
            Point::new(self.max_x(), self.max_y()),
        ];
        Self::from_points(corners.map(|p| m * p)).unwrap_or(Self::ZERO)
    }

    /// Convert to a `kurbo::Rect`.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.max_x(), self.max_y())
    }

    /// Convert from a `kurbo::Rect` (normalized).
    pub fn from_rect(r: Rect) -> Self {
        let r = r.abs();
        Self::new(r.x0, r.y0, r.width(), r.height())
    }
}

/// Every anchor and control point of an absolute path.
pub fn path_points(path: &BezPath) -> impl Iterator<Item = Point> + '_ {
    path.elements().iter().flat_map(|el| {
        let pts: Vec<Point> = match *el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => vec![p],
            PathEl::QuadTo(c, p) => vec![c, p],
            PathEl::CurveTo(c1, c2, p) => vec![c1, c2, p],
            PathEl::ClosePath => Vec::new(),
        };
        pts
    })
}

/// Loose box of an absolute path: min/max over every anchor and control point.
pub fn bounds_of_bez(path: &BezPath) -> BoundingBox {
    BoundingBox::from_points(path_points(path)).unwrap_or(BoundingBox::ZERO)
}

/// Loose box of path data. Control points are included, so curves are never clipped by the
/// result. Empty or malformed input yields [`BoundingBox::ZERO`].
pub fn bounds_of_path(d: &str) -> BoundingBox {
    bounds_of_bez(&parse_bez(d))
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/bounds.rs"]
mod tests;
