//! Folding nested coordinate transforms into literal element geometry.

use crate::foundation::core::{Affine, BezPath, PathPrecision, Point};
use crate::geometry::path::{parse_bez, parse_points, serialize_path};
use crate::geometry::primitives::{ellipse_path, rect_path, rounded_rect_path};
use crate::geometry::transform::{format_matrix, is_identity, parse_transform};
use crate::markup::document::{Document, NodeId, parse_length};
use crate::timeline::clip::ShapeGeometry;

/// Default CSS font size.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

const AXIS_EPS: f64 = 1e-9;

/// Elements that never paint and are left untouched by flattening and measurement.
pub fn is_non_rendering(name: &str) -> bool {
    matches!(
        name,
        "defs"
            | "clipPath"
            | "mask"
            | "pattern"
            | "marker"
            | "symbol"
            | "linearGradient"
            | "radialGradient"
            | "filter"
            | "style"
            | "script"
            | "title"
            | "desc"
            | "metadata"
    )
}

/// Basic shape elements with a path equivalent.
pub fn is_shape_kind(name: &str) -> bool {
    matches!(
        name,
        "rect" | "circle" | "ellipse" | "line" | "polyline" | "polygon" | "path"
    )
}

/// Elements that take `fill`: basic shapes and text content.
pub fn is_paintable(name: &str) -> bool {
    is_shape_kind(name) || matches!(name, "text" | "tspan" | "textPath")
}

/// Local `transform` attribute of `node`, identity when absent or malformed.
pub fn local_transform(doc: &Document, node: NodeId) -> Affine {
    doc.attr(node, "transform")
        .and_then(parse_transform)
        .unwrap_or(Affine::IDENTITY)
}

/// Product of the local transforms of every ancestor of `node`, outermost first.
///
/// The root `<svg>` contributes nothing; its view box is handled by the project matrix.
pub fn ancestor_transform(doc: &Document, node: NodeId) -> Affine {
    let mut chain = Vec::new();
    let mut cur = doc.parent(node);
    while let Some(n) = cur {
        if n == doc.root() {
            break;
        }
        chain.push(n);
        cur = doc.parent(n);
    }
    chain
        .iter()
        .rev()
        .fold(Affine::IDENTITY, |acc, &n| acc * local_transform(doc, n))
}

/// Product of the local transforms strictly below `top` down to and including `node`.
pub fn transform_between(doc: &Document, top: NodeId, node: NodeId) -> Affine {
    let mut chain = Vec::new();
    let mut cur = Some(node);
    while let Some(n) = cur {
        if n == top {
            break;
        }
        chain.push(n);
        cur = doc.parent(n);
    }
    chain
        .iter()
        .rev()
        .fold(Affine::IDENTITY, |acc, &n| acc * local_transform(doc, n))
}

/// Presentation property looked up on `node` and then its ancestors.
pub fn inherited_presentation(doc: &Document, node: NodeId, prop: &str) -> Option<String> {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if let Some(v) = doc.presentation(n, prop) {
            let v = v.trim();
            if !v.is_empty() && v != "inherit" {
                return Some(v.to_string());
            }
        }
        cur = doc.parent(n);
    }
    None
}

/// Presentation properties that inherit into descendants.
const INHERITED_PROPERTIES: &[&str] = &[
    "fill",
    "fill-opacity",
    "fill-rule",
    "stroke",
    "stroke-width",
    "stroke-opacity",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-dasharray",
    "stroke-dashoffset",
    "clip-rule",
    "color",
    "visibility",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "text-anchor",
    "letter-spacing",
];

/// Copy every inheritable property `node` receives from its ancestors onto `node` itself, so
/// the subtree keeps its look once detached from them.
pub fn pin_inherited_presentation(doc: &mut Document, node: NodeId) {
    let Some(parent) = doc.parent(node) else {
        return;
    };
    for &prop in INHERITED_PROPERTIES {
        let own = doc
            .presentation(node, prop)
            .is_some_and(|v| !v.trim().is_empty() && v.trim() != "inherit");
        if own {
            continue;
        }
        if let Some(v) = inherited_presentation(doc, parent, prop) {
            doc.remove_style_property(node, prop);
            doc.set_attr(node, prop, v);
        }
    }
}

/// Effective font size in the element's own user units.
pub fn effective_font_size(doc: &Document, node: NodeId) -> f64 {
    inherited_presentation(doc, node, "font-size")
        .and_then(|v| parse_length(&v))
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE)
}

/// First family of the inherited `font-family` list, unquoted.
pub fn effective_font_family(doc: &Document, node: NodeId) -> Option<String> {
    let list = inherited_presentation(doc, node, "font-family")?;
    list.split(',')
        .map(|f| f.trim().trim_matches(['"', '\'']).trim().to_string())
        .find(|f| !f.is_empty())
}

fn num(doc: &Document, node: NodeId, name: &str) -> f64 {
    doc.attr_f64(node, name).unwrap_or(0.0)
}

/// Source geometry and path of a basic shape element in its own user space (transform not
/// applied). `None` for non-shape elements and degenerate geometry.
pub fn element_geometry(doc: &Document, node: NodeId) -> Option<(ShapeGeometry, BezPath)> {
    let name = doc.name(node)?;
    let out = match name {
        "rect" => {
            let (x, y) = (num(doc, node, "x"), num(doc, node, "y"));
            let (w, h) = (num(doc, node, "width"), num(doc, node, "height"));
            if w <= 0.0 || h <= 0.0 {
                return None;
            }
            let rx = doc
                .attr_f64(node, "rx")
                .or_else(|| doc.attr_f64(node, "ry"))
                .unwrap_or(0.0)
                .max(0.0);
            let path = if rx > 0.0 {
                rounded_rect_path(x, y, w, h, rx)
            } else {
                rect_path(x, y, w, h)
            };
            (
                ShapeGeometry::Rect {
                    x,
                    y,
                    width: w,
                    height: h,
                    rx,
                },
                path,
            )
        }
        "circle" => {
            let (cx, cy, r) = (num(doc, node, "cx"), num(doc, node, "cy"), num(doc, node, "r"));
            if r <= 0.0 {
                return None;
            }
            (
                ShapeGeometry::Circle { cx, cy, r },
                ellipse_path(cx - r, cy - r, 2.0 * r, 2.0 * r),
            )
        }
        "ellipse" => {
            let (cx, cy) = (num(doc, node, "cx"), num(doc, node, "cy"));
            let (rx, ry) = (num(doc, node, "rx"), num(doc, node, "ry"));
            if rx <= 0.0 || ry <= 0.0 {
                return None;
            }
            (
                ShapeGeometry::Ellipse { cx, cy, rx, ry },
                ellipse_path(cx - rx, cy - ry, 2.0 * rx, 2.0 * ry),
            )
        }
        "line" => {
            let a = Point::new(num(doc, node, "x1"), num(doc, node, "y1"));
            let b = Point::new(num(doc, node, "x2"), num(doc, node, "y2"));
            let mut bp = BezPath::new();
            bp.move_to(a);
            bp.line_to(b);
            (
                ShapeGeometry::Polygon {
                    points: vec![[a.x, a.y], [b.x, b.y]],
                },
                bp,
            )
        }
        "polyline" | "polygon" => {
            let pts = parse_points(doc.attr(node, "points").unwrap_or_default());
            if pts.len() < 2 {
                return None;
            }
            let mut bp = BezPath::new();
            for (i, &p) in pts.iter().enumerate() {
                if i == 0 {
                    bp.move_to(p);
                } else {
                    bp.line_to(p);
                }
            }
            if name == "polygon" {
                bp.close_path();
            }
            (
                ShapeGeometry::Polygon {
                    points: pts.iter().map(|p| [p.x, p.y]).collect(),
                },
                bp,
            )
        }
        "path" => {
            let bp = parse_bez(doc.attr(node, "d").unwrap_or_default());
            if bp.elements().is_empty() {
                return None;
            }
            (ShapeGeometry::Path, bp)
        }
        _ => return None,
    };
    Some(out)
}

/// Whether `node` carries a `clip-path` or `mask` reference.
pub fn has_clip_or_mask(doc: &Document, node: NodeId) -> bool {
    ["clip-path", "mask"].iter().any(|p| {
        doc.presentation(node, p)
            .is_some_and(|v| v.trim() != "none" && !v.trim().is_empty())
    })
}

fn is_axis_aligned(m: Affine) -> bool {
    let [_, b, c, _, _, _] = m.as_coeffs();
    b.abs() < AXIS_EPS && c.abs() < AXIS_EPS
}

fn fmt(v: f64, precision: PathPrecision) -> String {
    let r = precision.round(v);
    if r == 0.0 { "0".to_string() } else { r.to_string() }
}

/// Scale explicit `stroke-width` values (attribute and inline style) by the matrix area factor.
fn scale_stroke_width(doc: &mut Document, node: NodeId, m: Affine, precision: PathPrecision) {
    let k = m.determinant().abs().sqrt();
    if (k - 1.0).abs() < AXIS_EPS {
        return;
    }
    if let Some(w) = doc.attr_f64(node, "stroke-width") {
        doc.set_attr(node, "stroke-width", fmt(w * k, precision));
    }
    if let Some(w) = doc
        .style_property(node, "stroke-width")
        .and_then(|v| parse_length(&v))
    {
        doc.remove_style_property(node, "stroke-width");
        doc.set_attr(node, "stroke-width", fmt(w * k, precision));
    }
}

fn keep_matrix(doc: &mut Document, node: NodeId, m: Affine) {
    if is_identity(m) {
        doc.remove_attr(node, "transform");
    } else {
        doc.set_attr(node, "transform", format_matrix(m));
    }
}

fn to_path_element(
    doc: &mut Document,
    node: NodeId,
    path: BezPath,
    m: Affine,
    precision: PathPrecision,
) {
    let mut path = path;
    path.apply_affine(m);
    for attr in [
        "x", "y", "width", "height", "rx", "ry", "cx", "cy", "r", "x1", "y1", "x2", "y2",
        "points",
    ] {
        doc.remove_attr(node, attr);
    }
    doc.rename(node, "path");
    doc.set_attr(node, "d", serialize_path(&path, precision));
}

/// Fold `m` into the geometry of `node` and its descendants.
///
/// `m` maps the node's user space (its own `transform` already included and removed) into the
/// target space. Axis-aligned matrices are baked into `x`/`y`/`width`/`height`, radii, points and
/// font sizes; other matrices turn basic shapes into paths. Elements whose coordinates cannot be
/// rewritten (`use`, rotated images and text, anything carrying `clip-path` or `mask`) keep an
/// explicit `matrix(...)` and are not descended into.
pub fn flatten_subtree(doc: &mut Document, node: NodeId, m: Affine, precision: PathPrecision) {
    let Some(name) = doc.name(node).map(str::to_string) else {
        return;
    };
    if is_non_rendering(&name) {
        return;
    }
    if is_identity(m) {
        doc.remove_attr(node, "transform");
        let children: Vec<NodeId> = doc.element_children(node).collect();
        for child in children {
            flatten_child(doc, child, m, precision);
        }
        return;
    }
    if has_clip_or_mask(doc, node) {
        keep_matrix(doc, node, m);
        return;
    }

    let aligned = is_axis_aligned(m);
    let [a, _, _, d, e, f] = m.as_coeffs();
    match name.as_str() {
        "path" => {
            let bp = parse_bez(doc.attr(node, "d").unwrap_or_default());
            to_path_element(doc, node, bp, m, precision);
            scale_stroke_width(doc, node, m, precision);
        }
        "rect" if aligned => {
            let (x, y) = (num(doc, node, "x"), num(doc, node, "y"));
            let (w, h) = (num(doc, node, "width") * a.abs(), num(doc, node, "height") * d.abs());
            let nx = if a < 0.0 { a * x + e - w } else { a * x + e };
            let ny = if d < 0.0 { d * y + f - h } else { d * y + f };
            doc.set_attr(node, "x", fmt(nx, precision));
            doc.set_attr(node, "y", fmt(ny, precision));
            doc.set_attr(node, "width", fmt(w, precision));
            doc.set_attr(node, "height", fmt(h, precision));
            if let Some(rx) = doc.attr_f64(node, "rx") {
                doc.set_attr(node, "rx", fmt(rx * a.abs(), precision));
            }
            if let Some(ry) = doc.attr_f64(node, "ry") {
                doc.set_attr(node, "ry", fmt(ry * d.abs(), precision));
            }
            scale_stroke_width(doc, node, m, precision);
        }
        "circle" if aligned => {
            let (cx, cy, r) = (num(doc, node, "cx"), num(doc, node, "cy"), num(doc, node, "r"));
            doc.set_attr(node, "cx", fmt(a * cx + e, precision));
            doc.set_attr(node, "cy", fmt(d * cy + f, precision));
            if (a.abs() - d.abs()).abs() < AXIS_EPS {
                doc.set_attr(node, "r", fmt(r * a.abs(), precision));
            } else {
                doc.remove_attr(node, "r");
                doc.rename(node, "ellipse");
                doc.set_attr(node, "rx", fmt(r * a.abs(), precision));
                doc.set_attr(node, "ry", fmt(r * d.abs(), precision));
            }
            scale_stroke_width(doc, node, m, precision);
        }
        "ellipse" if aligned => {
            let (cx, cy) = (num(doc, node, "cx"), num(doc, node, "cy"));
            let (rx, ry) = (num(doc, node, "rx"), num(doc, node, "ry"));
            doc.set_attr(node, "cx", fmt(a * cx + e, precision));
            doc.set_attr(node, "cy", fmt(d * cy + f, precision));
            doc.set_attr(node, "rx", fmt(rx * a.abs(), precision));
            doc.set_attr(node, "ry", fmt(ry * d.abs(), precision));
            scale_stroke_width(doc, node, m, precision);
        }
        "rect" | "circle" | "ellipse" => {
            if let Some((_, bp)) = element_geometry(doc, node) {
                to_path_element(doc, node, bp, m, precision);
                scale_stroke_width(doc, node, m, precision);
            } else {
                keep_matrix(doc, node, m);
            }
        }
        "line" => {
            for (ax, ay) in [("x1", "y1"), ("x2", "y2")] {
                let p = m * Point::new(num(doc, node, ax), num(doc, node, ay));
                doc.set_attr(node, ax, fmt(p.x, precision));
                doc.set_attr(node, ay, fmt(p.y, precision));
            }
            scale_stroke_width(doc, node, m, precision);
        }
        "polyline" | "polygon" => {
            let pts: Vec<String> = parse_points(doc.attr(node, "points").unwrap_or_default())
                .into_iter()
                .map(|p| {
                    let q = m * p;
                    format!("{},{}", fmt(q.x, precision), fmt(q.y, precision))
                })
                .collect();
            doc.set_attr(node, "points", pts.join(" "));
            scale_stroke_width(doc, node, m, precision);
        }
        "image" if aligned && a > 0.0 && d > 0.0 => {
            let (x, y) = (num(doc, node, "x"), num(doc, node, "y"));
            doc.set_attr(node, "x", fmt(a * x + e, precision));
            doc.set_attr(node, "y", fmt(d * y + f, precision));
            for (attr, k) in [("width", a), ("height", d)] {
                if let Some(v) = doc.attr_f64(node, attr) {
                    doc.set_attr(node, attr, fmt(v * k, precision));
                }
            }
        }
        "text" if aligned && a > 0.0 && (a - d).abs() < AXIS_EPS => {
            flatten_text(doc, node, a, e, f, precision);
        }
        "image" | "text" | "use" | "svg" | "foreignObject" => keep_matrix(doc, node, m),
        _ => {
            doc.remove_attr(node, "transform");
            scale_stroke_width(doc, node, m, precision);
            let children: Vec<NodeId> = doc.element_children(node).collect();
            for child in children {
                flatten_child(doc, child, m, precision);
            }
        }
    }
}

fn flatten_child(doc: &mut Document, child: NodeId, m: Affine, precision: PathPrecision) {
    if doc.name(child).is_some_and(is_non_rendering) {
        return;
    }
    let child_m = m * local_transform(doc, child);
    doc.remove_attr(child, "transform");
    flatten_subtree(doc, child, child_m, precision);
}

/// Uniform positive scale `k` plus translation `(e, f)` on a text element and its spans.
fn flatten_text(
    doc: &mut Document,
    node: NodeId,
    k: f64,
    e: f64,
    f: f64,
    precision: PathPrecision,
) {
    let size = effective_font_size(doc, node);
    doc.remove_attr(node, "transform");
    for n in doc.descendants(node) {
        if !doc.is_element(n) {
            continue;
        }
        for (attr, offset) in [("x", e), ("y", f)] {
            if let Some(list) = doc.attr(n, attr).map(str::to_string) {
                doc.set_attr(n, attr, map_coord_list(&list, k, offset, precision));
            }
        }
        for attr in ["dx", "dy"] {
            if let Some(list) = doc.attr(n, attr).map(str::to_string) {
                doc.set_attr(n, attr, map_coord_list(&list, k, 0.0, precision));
            }
        }
        let own_size = doc
            .presentation(n, "font-size")
            .and_then(|v| parse_length(&v));
        if let (true, Some(s)) = (n != node, own_size) {
            doc.remove_style_property(n, "font-size");
            doc.set_attr(n, "font-size", fmt(s * k, precision));
        }
        scale_stroke_width(doc, n, Affine::scale(k), precision);
    }
    if doc.attr(node, "x").is_none() {
        doc.set_attr(node, "x", fmt(e, precision));
    }
    if doc.attr(node, "y").is_none() {
        doc.set_attr(node, "y", fmt(f, precision));
    }
    doc.remove_style_property(node, "font-size");
    doc.set_attr(node, "font-size", fmt(size * k, precision));
}

fn map_coord_list(list: &str, k: f64, offset: f64, precision: PathPrecision) -> String {
    list.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .filter_map(parse_length)
        .map(|v| fmt(v * k + offset, precision))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "../../tests/unit/template/flatten.rs"]
mod tests;
