use std::collections::HashMap;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{TesseraError, TesseraResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color carried through Parley layouts.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
///
/// Fonts are registered once per `font_key`; later layouts reuse the registered family.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    families: HashMap<String, String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
        }
    }

    fn family_for(&mut self, font_key: &str, font_bytes: &[u8]) -> TesseraResult<String> {
        if let Some(name) = self.families.get(font_key) {
            return Ok(name.clone());
        }
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| TesseraError::draw("no font families registered from font bytes"))?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| TesseraError::draw("registered font family has no name"))?
            .to_string();
        self.families.insert(font_key.to_owned(), name.clone());
        Ok(name)
    }

    /// Shape and lay out `text` on one line per `\n`-separated segment, without wrapping.
    pub(crate) fn layout_lines(
        &mut self,
        text: &str,
        font_key: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> TesseraResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(TesseraError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let family_name = self.family_for(font_key, font_bytes)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Horizontal offsets centering each line inside `box_w`, plus the vertical offset centering the
/// whole block inside `box_h`.
pub(crate) fn centered_offsets(
    layout: &parley::Layout<TextBrushRgba8>,
    box_w: f32,
    box_h: f32,
) -> (Vec<f32>, f32) {
    let xs = layout
        .lines()
        .map(|line| (box_w - line.metrics().advance) * 0.5)
        .collect();
    (xs, (box_h - layout.height()) * 0.5)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;
