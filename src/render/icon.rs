use crate::foundation::core::Rgba8;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::markup::document::{Document, NodeId};
use crate::template::flatten::{inherited_presentation, is_paintable};
use crate::timeline::clip::{ElementOverride, TemplateEntry};

fn set_paint(doc: &mut Document, node: NodeId, prop: &str, color: Rgba8) {
    doc.remove_style_property(node, prop);
    doc.set_attr(node, prop, color.to_hex());
}

/// Recolor every paintable element to `color`, leaving explicitly unfilled ones alone.
pub fn recolor(doc: &mut Document, color: Rgba8) {
    let targets: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.name(n).is_some_and(is_paintable))
        .filter(|&n| inherited_presentation(doc, n, "fill").as_deref() != Some("none"))
        .collect();
    for n in targets {
        set_paint(doc, n, "fill", color);
    }
}

fn apply_override(doc: &mut Document, node: NodeId, o: &ElementOverride) {
    if let Some(text) = &o.text {
        doc.set_text(node, text);
    }
    if let Some(fill) = o.fill {
        set_paint(doc, node, "fill", fill);
    }
    if let Some(stroke) = o.stroke {
        set_paint(doc, node, "stroke", stroke);
    }
    if let Some(opacity) = o.opacity.filter(|v| v.is_finite()) {
        doc.remove_style_property(node, "opacity");
        doc.set_attr(node, "opacity", opacity.clamp(0.0, 1.0).to_string());
    }
}

/// Icon markup ready for rasterization: recolored to `color` (when set), then with every
/// `templateData` override applied to the element it names.
pub fn prepare_icon_markup(
    svg: &str,
    color: Option<Rgba8>,
    entries: &[TemplateEntry],
) -> TesseraResult<String> {
    let mut doc =
        Document::parse(svg).map_err(|e| TesseraError::draw(format!("icon markup: {e}")))?;
    if let Some(c) = color {
        recolor(&mut doc, c);
    }
    for entry in entries {
        let Some(o) = &entry.overrides else {
            continue;
        };
        match doc.element_by_id(&entry.element_id) {
            Some(node) => apply_override(&mut doc, node, o),
            None => tracing::debug!(element_id = %entry.element_id, "override target not in icon"),
        }
    }
    Ok(doc.to_svg_string())
}

#[cfg(test)]
#[path = "../../tests/unit/render/icon.rs"]
mod tests;
