use crate::foundation::core::{Affine, Vec2};

/// Scale / rotation / translation parts of an affine matrix.
///
/// Skew is not represented; for skewed matrices `scale_y` absorbs the determinant so the area
/// scale stays correct.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParts {
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale (negative for a mirrored matrix).
    pub scale_y: f64,
    /// Horizontal translation (`e`).
    pub translate_x: f64,
    /// Vertical translation (`f`).
    pub translate_y: f64,
    /// Rotation in degrees, counter-clockwise in y-down space as SVG defines it.
    pub angle_degrees: f64,
}

impl TransformParts {
    const ANGLE_EPS: f64 = 1e-6;

    /// Whether the matrix rotates its input.
    pub fn has_rotation(&self) -> bool {
        let a = self.angle_degrees.rem_euclid(360.0);
        a > Self::ANGLE_EPS && (360.0 - a) > Self::ANGLE_EPS
    }

    /// Rebuild the matrix without its rotation (`translate * scale`).
    pub fn without_rotation(&self) -> Affine {
        Affine::translate((self.translate_x, self.translate_y))
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }
}

/// Split `matrix` into scale, rotation and translation.
///
/// Axis-aligned matrices (`b == c == 0`) report their diagonal directly, so mirrors stay mirrors
/// instead of turning into 180° rotations.
pub fn decompose_transform(matrix: Affine) -> TransformParts {
    let [a, b, c, d, e, f] = matrix.as_coeffs();
    if b.abs() < 1e-12 && c.abs() < 1e-12 {
        return TransformParts {
            scale_x: a,
            scale_y: d,
            translate_x: e,
            translate_y: f,
            angle_degrees: 0.0,
        };
    }
    let scale_x = (a * a + b * b).sqrt();
    let angle = b.atan2(a);
    let scale_y = if scale_x > 0.0 {
        (a * d - b * c) / scale_x
    } else {
        (c * c + d * d).sqrt()
    };
    TransformParts {
        scale_x,
        scale_y,
        translate_x: e,
        translate_y: f,
        angle_degrees: angle.to_degrees(),
    }
}

/// Whether `m` is the identity within `1e-9`.
pub fn is_identity(m: Affine) -> bool {
    m.as_coeffs()
        .iter()
        .zip(Affine::IDENTITY.as_coeffs())
        .all(|(x, y)| (x - y).abs() < 1e-9)
}

/// Parse an SVG `transform` attribute into a single matrix.
///
/// Supports `matrix`, `translate`, `scale`, `rotate(a[, cx, cy])`, `skewX` and `skewY`, composed
/// left to right as SVG specifies. Returns `None` when the list is malformed.
pub fn parse_transform(s: &str) -> Option<Affine> {
    let mut out = Affine::IDENTITY;
    let mut rest = s.trim();
    while !rest.is_empty() {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        let open = rest.find('(')?;
        let close = rest[open..].find(')')? + open;
        let name = rest[..open].trim();
        let args = parse_args(&rest[open + 1..close])?;
        out = out * transform_fn(name, &args)?;
        rest = &rest[close + 1..];
    }
    Some(out)
}

fn parse_args(s: &str) -> Option<Vec<f64>> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

fn transform_fn(name: &str, args: &[f64]) -> Option<Affine> {
    let m = match (name, args) {
        ("matrix", &[a, b, c, d, e, f]) => Affine::new([a, b, c, d, e, f]),
        ("translate", &[tx]) => Affine::translate((tx, 0.0)),
        ("translate", &[tx, ty]) => Affine::translate((tx, ty)),
        ("scale", &[s]) => Affine::scale(s),
        ("scale", &[sx, sy]) => Affine::scale_non_uniform(sx, sy),
        ("rotate", &[deg]) => Affine::rotate(deg.to_radians()),
        ("rotate", &[deg, cx, cy]) => {
            let pivot = Vec2::new(cx, cy);
            Affine::translate(pivot) * Affine::rotate(deg.to_radians()) * Affine::translate(-pivot)
        }
        ("skewX", &[deg]) => Affine::new([1.0, 0.0, deg.to_radians().tan(), 1.0, 0.0, 0.0]),
        ("skewY", &[deg]) => Affine::new([1.0, deg.to_radians().tan(), 0.0, 1.0, 0.0, 0.0]),
        _ => return None,
    };
    Some(m)
}

/// Serialize a matrix as an SVG `matrix(...)` function.
pub fn format_matrix(m: Affine) -> String {
    let [a, b, c, d, e, f] = m.as_coeffs();
    format!("matrix({a} {b} {c} {d} {e} {f})")
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/transform.rs"]
mod tests;
