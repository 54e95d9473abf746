//! SVG path data: parsing into [`PathCommand`]s, absolutizing into a [`BezPath`], matrix
//! application and precision-bounded re-serialization.

use kurbo::{PathEl, Point, Vec2};

use crate::foundation::core::{Affine, BezPath, PathPrecision};

/// One path-data command as written in the source, with absolute or relative operands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    /// `M` / `m`.
    MoveTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// Target point.
        to: Point,
    },
    /// `L` / `l`.
    LineTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// Target point.
        to: Point,
    },
    /// `H` / `h`.
    Horizontal {
        /// Operand is relative to the current point.
        rel: bool,
        /// Target x.
        x: f64,
    },
    /// `V` / `v`.
    Vertical {
        /// Operand is relative to the current point.
        rel: bool,
        /// Target y.
        y: f64,
    },
    /// `C` / `c`.
    CubicTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// First control point.
        c1: Point,
        /// Second control point.
        c2: Point,
        /// End point.
        to: Point,
    },
    /// `S` / `s`: first control point is the reflection of the previous cubic's second one.
    SmoothCubicTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// Second control point.
        c2: Point,
        /// End point.
        to: Point,
    },
    /// `Q` / `q`.
    QuadTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// Control point.
        c: Point,
        /// End point.
        to: Point,
    },
    /// `T` / `t`: control point is the reflection of the previous quadratic's one.
    SmoothQuadTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// End point.
        to: Point,
    },
    /// `A` / `a`.
    ArcTo {
        /// Operands are relative to the current point.
        rel: bool,
        /// Ellipse radii.
        radii: Vec2,
        /// X-axis rotation in degrees.
        x_rotation_deg: f64,
        /// Large-arc flag.
        large_arc: bool,
        /// Sweep flag.
        sweep: bool,
        /// End point.
        to: Point,
    },
    /// `Z` / `z`.
    Close,
}

#[derive(Debug)]
struct Malformed;

struct Lexer<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            s: s.as_bytes(),
            pos: 0,
        }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.s.get(self.pos) {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_separators();
        self.pos >= self.s.len()
    }

    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn number(&mut self) -> Result<f64, Malformed> {
        self.skip_separators();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut digits = 0usize;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
            digits += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            self.pos = start;
            return Err(Malformed);
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let exp_start = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            let mut exp_digits = 0usize;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
                exp_digits += 1;
            }
            if exp_digits == 0 {
                self.pos = exp_start;
            }
        }
        std::str::from_utf8(&self.s[start..self.pos])
            .ok()
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or(Malformed)
    }

    fn flag(&mut self) -> Result<bool, Malformed> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(Malformed),
        }
    }

    fn point(&mut self) -> Result<Point, Malformed> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Point::new(x, y))
    }
}

fn is_finite_point(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Parse path data into commands.
///
/// Malformed syntax (unknown letters, missing operands, data not starting with a move) yields an
/// empty list. Commands whose operands overflow to non-finite values are dropped individually.
pub fn parse_path(d: &str) -> Vec<PathCommand> {
    parse_path_inner(d).unwrap_or_default()
}

fn parse_path_inner(d: &str) -> Result<Vec<PathCommand>, Malformed> {
    let mut lx = Lexer::new(d);
    let mut out = Vec::new();
    let mut cmd: Option<u8> = None;

    while !lx.at_end() {
        let Some(b) = lx.peek() else { break };
        if b.is_ascii_alphabetic() {
            lx.pos += 1;
            if b == b'z' || b == b'Z' {
                if out.is_empty() {
                    return Err(Malformed);
                }
                out.push(PathCommand::Close);
                cmd = None;
                continue;
            }
            if out.is_empty() && b != b'M' && b != b'm' {
                return Err(Malformed);
            }
            cmd = Some(b);
        }
        let Some(c) = cmd else {
            return Err(Malformed);
        };

        let rel = c.is_ascii_lowercase();
        let parsed = match c.to_ascii_uppercase() {
            b'M' => {
                let to = lx.point()?;
                // Extra coordinate pairs after a move are implicit line-tos.
                cmd = Some(if rel { b'l' } else { b'L' });
                is_finite_point(to).then_some(PathCommand::MoveTo { rel, to })
            }
            b'L' => {
                let to = lx.point()?;
                is_finite_point(to).then_some(PathCommand::LineTo { rel, to })
            }
            b'H' => {
                let x = lx.number()?;
                x.is_finite().then_some(PathCommand::Horizontal { rel, x })
            }
            b'V' => {
                let y = lx.number()?;
                y.is_finite().then_some(PathCommand::Vertical { rel, y })
            }
            b'C' => {
                let c1 = lx.point()?;
                let c2 = lx.point()?;
                let to = lx.point()?;
                [c1, c2, to]
                    .into_iter()
                    .all(is_finite_point)
                    .then_some(PathCommand::CubicTo { rel, c1, c2, to })
            }
            b'S' => {
                let c2 = lx.point()?;
                let to = lx.point()?;
                (is_finite_point(c2) && is_finite_point(to))
                    .then_some(PathCommand::SmoothCubicTo { rel, c2, to })
            }
            b'Q' => {
                let c = lx.point()?;
                let to = lx.point()?;
                (is_finite_point(c) && is_finite_point(to))
                    .then_some(PathCommand::QuadTo { rel, c, to })
            }
            b'T' => {
                let to = lx.point()?;
                is_finite_point(to).then_some(PathCommand::SmoothQuadTo { rel, to })
            }
            b'A' => {
                let rx = lx.number()?;
                let ry = lx.number()?;
                let x_rotation_deg = lx.number()?;
                let large_arc = lx.flag()?;
                let sweep = lx.flag()?;
                let to = lx.point()?;
                (rx.is_finite() && ry.is_finite() && x_rotation_deg.is_finite()
                    && is_finite_point(to))
                .then_some(PathCommand::ArcTo {
                    rel,
                    radii: Vec2::new(rx.abs(), ry.abs()),
                    x_rotation_deg,
                    large_arc,
                    sweep,
                    to,
                })
            }
            _ => return Err(Malformed),
        };
        if let Some(p) = parsed {
            out.push(p);
        }
    }

    Ok(out)
}

/// Resolve commands into an absolute [`BezPath`] made only of move/line/quad/cubic/close.
///
/// Relative operands are resolved against the current point, horizontal/vertical lines become
/// full line-tos, smooth curves get their reflected control point, and arcs become cubics.
pub fn absolutize(commands: &[PathCommand]) -> BezPath {
    let mut bp = BezPath::new();
    let mut cur = Point::ZERO;
    let mut start = Point::ZERO;
    let mut last_cubic_ctrl: Option<Point> = None;
    let mut last_quad_ctrl: Option<Point> = None;

    let abs = |rel: bool, cur: Point, p: Point| if rel { cur + p.to_vec2() } else { p };
    let reflect = |ctrl: Option<Point>, cur: Point| match ctrl {
        Some(c) => Point::new(2.0 * cur.x - c.x, 2.0 * cur.y - c.y),
        None => cur,
    };

    for &cmd in commands {
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;
        match cmd {
            PathCommand::MoveTo { rel, to } => {
                let p = abs(rel, cur, to);
                bp.move_to(p);
                cur = p;
                start = p;
            }
            PathCommand::LineTo { rel, to } => {
                let p = abs(rel, cur, to);
                bp.line_to(p);
                cur = p;
            }
            PathCommand::Horizontal { rel, x } => {
                let p = Point::new(if rel { cur.x + x } else { x }, cur.y);
                bp.line_to(p);
                cur = p;
            }
            PathCommand::Vertical { rel, y } => {
                let p = Point::new(cur.x, if rel { cur.y + y } else { y });
                bp.line_to(p);
                cur = p;
            }
            PathCommand::CubicTo { rel, c1, c2, to } => {
                let (c1, c2, p) = (abs(rel, cur, c1), abs(rel, cur, c2), abs(rel, cur, to));
                bp.curve_to(c1, c2, p);
                cubic_ctrl = Some(c2);
                cur = p;
            }
            PathCommand::SmoothCubicTo { rel, c2, to } => {
                let c1 = reflect(last_cubic_ctrl, cur);
                let (c2, p) = (abs(rel, cur, c2), abs(rel, cur, to));
                bp.curve_to(c1, c2, p);
                cubic_ctrl = Some(c2);
                cur = p;
            }
            PathCommand::QuadTo { rel, c, to } => {
                let (c, p) = (abs(rel, cur, c), abs(rel, cur, to));
                bp.quad_to(c, p);
                quad_ctrl = Some(c);
                cur = p;
            }
            PathCommand::SmoothQuadTo { rel, to } => {
                let c = reflect(last_quad_ctrl, cur);
                let p = abs(rel, cur, to);
                bp.quad_to(c, p);
                quad_ctrl = Some(c);
                cur = p;
            }
            PathCommand::ArcTo {
                rel,
                radii,
                x_rotation_deg,
                large_arc,
                sweep,
                to,
            } => {
                let p = abs(rel, cur, to);
                let svg_arc = kurbo::SvgArc {
                    from: cur,
                    to: p,
                    radii,
                    x_rotation: x_rotation_deg.to_radians(),
                    large_arc,
                    sweep,
                };
                match kurbo::Arc::from_svg_arc(&svg_arc) {
                    Some(arc) => {
                        for el in arc.append_iter(0.1) {
                            bp.push(el);
                        }
                    }
                    // Degenerate arcs (zero radius or coincident ends) are straight lines.
                    None => bp.line_to(p),
                }
                cur = p;
            }
            PathCommand::Close => {
                bp.close_path();
                cur = start;
            }
        }
        last_cubic_ctrl = cubic_ctrl;
        last_quad_ctrl = quad_ctrl;
    }

    bp
}

/// Parse and absolutize path data in one step. Malformed input yields an empty path.
pub fn parse_bez(d: &str) -> BezPath {
    absolutize(&parse_path(d))
}

fn push_num(out: &mut String, v: f64, precision: PathPrecision) {
    let r = precision.round(v);
    if r == 0.0 || !r.is_finite() {
        out.push('0');
        return;
    }
    let mut s = format!("{:.*}", usize::from(precision.decimals()), r);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    out.push_str(&s);
}

fn push_points(out: &mut String, cmd: char, pts: &[Point], precision: PathPrecision) {
    out.push(cmd);
    for (i, p) in pts.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        push_num(out, p.x, precision);
        out.push(' ');
        push_num(out, p.y, precision);
    }
}

/// Serialize an absolute path as `M x y L x y C … Q … Z` with numbers rounded to `precision`.
pub fn serialize_path(path: &BezPath, precision: PathPrecision) -> String {
    let mut out = String::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => push_points(&mut out, 'M', &[p], precision),
            PathEl::LineTo(p) => push_points(&mut out, 'L', &[p], precision),
            PathEl::QuadTo(c, p) => push_points(&mut out, 'Q', &[c, p], precision),
            PathEl::CurveTo(c1, c2, p) => push_points(&mut out, 'C', &[c1, c2, p], precision),
            PathEl::ClosePath => out.push('Z'),
        }
    }
    out
}

/// Re-express path data through `matrix`.
///
/// Every command is reparsed and absolutized (so later rotation stays valid), every anchor and
/// control point is mapped through the matrix, and the result is re-serialized at `precision`.
/// Malformed input yields an empty string.
pub fn transform_path(d: &str, matrix: Affine, precision: PathPrecision) -> String {
    let mut bp = parse_bez(d);
    bp.apply_affine(matrix);
    serialize_path(&bp, precision)
}

/// Parse a `points` attribute (`"x,y x,y …"`). A trailing odd coordinate is dropped.
pub fn parse_points(s: &str) -> Vec<Point> {
    let mut lx = Lexer::new(s);
    let mut out = Vec::new();
    while !lx.at_end() {
        match lx.point() {
            Ok(p) if is_finite_point(p) => out.push(p),
            Ok(_) => {}
            Err(_) => break,
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/path.rs"]
mod tests;
