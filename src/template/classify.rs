use crate::markup::document::{Document, NodeId};
use crate::template::annotation::AnnotationItem;
use crate::template::flatten::{is_non_rendering, is_shape_kind};
use crate::timeline::clip::ClipType;

/// Clip type of an annotated element, or `None` when it cannot become a clip.
///
/// - `text` elements become text clips;
/// - an `image` declaring its own id as `image_id` becomes a mask clip;
/// - a group carrying an `image_id` (wrapped or cropped image) becomes a mask clip;
/// - a basic shape declaring its own id as `shapes_id` becomes a shape clip;
/// - any other painted element becomes an icon.
pub fn classify(doc: &Document, node: NodeId, id: &str, item: &AnnotationItem) -> Option<ClipType> {
    let name = doc.name(node)?;
    if node == doc.root() || is_non_rendering(name) {
        return None;
    }
    let kind = match name {
        "text" => ClipType::Text,
        "image" if item.image_id() == Some(id) => ClipType::Mask,
        "g" if item.image_id().is_some() => ClipType::Mask,
        n if is_shape_kind(n) && item.shapes_id() == Some(id) => ClipType::Shape,
        "tspan" | "textPath" | "stop" => return None,
        _ => ClipType::Icon,
    };
    Some(kind)
}

#[cfg(test)]
#[path = "../../tests/unit/template/classify.rs"]
mod tests;
