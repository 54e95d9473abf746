use crate::foundation::core::{Affine, PathPrecision};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::geometry::bounds::BoundingBox;
use crate::geometry::path::serialize_path;
use crate::markup::document::{Document, NodeId};
use crate::template::flatten::{element_geometry, local_transform, transform_between};
use crate::timeline::clip::{ShapeDescriptor, ShapeGeometry, TemplateEntry};

/// First node of `element`'s subtree (itself included) carrying a `clip-path` reference.
fn clipped_node(doc: &Document, element: NodeId) -> Option<(NodeId, String)> {
    doc.descendants(element).into_iter().find_map(|n| {
        let v = doc.presentation(n, "clip-path")?;
        let v = v.trim();
        (v != "none" && !v.is_empty()).then(|| (n, v.to_string()))
    })
}

/// Resolve the shape behind a clip path: the first painted child of the `<clipPath>`, followed
/// through one `<use>` indirection. Returns the shape node and the transform from the shape's
/// own user space into the `<clipPath>` user space.
fn clip_shape(doc: &Document, clip_path: NodeId) -> Option<(NodeId, Affine)> {
    for child in doc.element_children(clip_path) {
        match doc.name(child)? {
            "use" => {
                let target = doc.href(child).and_then(|h| doc.resolve_reference(h))?;
                let x = doc.attr_f64(child, "x").unwrap_or(0.0);
                let y = doc.attr_f64(child, "y").unwrap_or(0.0);
                let m = local_transform(doc, child)
                    * Affine::translate((x, y))
                    * local_transform(doc, target);
                return Some((target, m));
            }
            "title" | "desc" | "metadata" => continue,
            _ => return Some((child, local_transform(doc, child))),
        }
    }
    None
}

/// Extract the mask shape of a mask clip.
///
/// `content` maps `element`'s inner user space (below its own `transform`) to the un-rotated
/// clip space, and `bbox` is the element's measured box in that space. The shape path composes,
/// innermost first: the shape's local transform, the `<use>` placement, the `<clipPath>`
/// transform, the transforms between the element and the clipped node, the project content
/// matrix, and finally the shift to the clip box origin.
pub fn mask_entry(
    doc: &Document,
    element: NodeId,
    content: Affine,
    bbox: BoundingBox,
    precision: PathPrecision,
) -> TesseraResult<TemplateEntry> {
    let (clipped, reference) = clipped_node(doc, element)
        .ok_or_else(|| TesseraError::unresolved("element has no clip-path"))?;
    let clip_path = doc
        .resolve_reference(&reference)
        .filter(|&n| doc.name(n) == Some("clipPath"))
        .ok_or_else(|| TesseraError::unresolved(format!("clip-path '{reference}' is dangling")))?;
    let (shape, shape_m) = clip_shape(doc, clip_path).ok_or_else(|| {
        TesseraError::unresolved(format!("clip-path '{reference}' has no resolvable shape"))
    })?;
    let (geometry, mut path) = element_geometry(doc, shape).ok_or_else(|| {
        TesseraError::unresolved(format!("clip-path '{reference}' does not end in a basic shape"))
    })?;

    let between = if clipped == element {
        Affine::IDENTITY
    } else {
        transform_between(doc, element, clipped)
    };
    let full = Affine::translate((-bbox.x, -bbox.y))
        * content
        * between
        * local_transform(doc, clip_path)
        * shape_m;
    path.apply_affine(full);

    let sides = match &geometry {
        ShapeGeometry::Polygon { points } if doc.name(shape) == Some("polygon") => {
            u32::try_from(points.len()).ok()
        }
        _ => None,
    };
    Ok(TemplateEntry {
        element_id: doc.attr(shape, "id").unwrap_or_default().to_string(),
        shape: Some(ShapeDescriptor {
            geometry,
            d: serialize_path(&path, precision),
            sides,
        }),
        overrides: None,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/template/mask.rs"]
mod tests;
