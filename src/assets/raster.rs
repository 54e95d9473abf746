use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::Affine;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Largest raster edge produced from vector content.
pub const MAX_RASTER_DIM: u32 = 16_384;

#[derive(Clone, Debug)]
/// Decoded raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Wrap already premultiplied pixels, checking the buffer length.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> TesseraResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if rgba8_premul.len() != expected {
            return Err(TesseraError::draw(format!(
                "pixel buffer is {} bytes, expected {expected} for {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }
}

/// Decode a raster image (PNG, JPEG, GIF, WebP, ...) and premultiply it.
pub fn decode_image(bytes: &[u8]) -> TesseraResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse SVG bytes into a `usvg` tree with the given options.
pub fn parse_svg(bytes: &[u8], opts: &usvg::Options<'_>) -> TesseraResult<Arc<usvg::Tree>> {
    let tree = usvg::Tree::from_data(bytes, opts).context("parse svg tree")?;
    Ok(Arc::new(tree))
}

/// Raster size for drawing `tree` under `transform` without blurry upscaling.
///
/// Returns `(width, height, transform_adjust)`: rasterize into `width x height`, then draw the
/// image with `transform_adjust` instead of `transform`.
pub fn svg_raster_params(
    tree: &usvg::Tree,
    transform: Affine,
) -> TesseraResult<(u32, u32, Affine)> {
    let size = tree.size();
    let base_w = to_px(size.width())?;
    let base_h = to_px(size.height())?;

    let [a, b, c, d, _e, _f] = transform.as_coeffs();
    let sx = (a * a + b * b).sqrt().max(1e-6);
    let sy = (c * c + d * d).sqrt().max(1e-6);

    let w = ((base_w as f64) * sx).ceil().max(1.0) as u32;
    let h = ((base_h as f64) * sy).ceil().max(1.0) as u32;
    check_dims(w, h)?;

    let inv = Affine::scale_non_uniform(
        base_w as f64 / w as f64,
        base_h as f64 / h as f64,
    );
    Ok((w, h, transform * inv))
}

/// Rasterize `tree` stretched to exactly `width x height` pixels (premultiplied RGBA8).
pub fn rasterize_svg_to_premul_rgba8(
    tree: &usvg::Tree,
    width: u32,
    height: u32,
) -> TesseraResult<PreparedImage> {
    check_dims(width, height)?;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| TesseraError::draw("failed to allocate svg pixmap"))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    PreparedImage::from_premul(width, height, pixmap.take())
}

fn to_px(v: f32) -> TesseraResult<u32> {
    if !v.is_finite() || v <= 0.0 {
        return Err(TesseraError::draw("svg has invalid width/height"));
    }
    Ok((v.ceil() as u32).max(1))
}

fn check_dims(w: u32, h: u32) -> TesseraResult<()> {
    if w == 0 || h == 0 {
        return Err(TesseraError::draw("raster size must be non-zero"));
    }
    if w > MAX_RASTER_DIM || h > MAX_RASTER_DIM {
        return Err(TesseraError::draw(format!(
            "svg raster size too large: {w}x{h} (max {MAX_RASTER_DIM}x{MAX_RASTER_DIM})"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/raster.rs"]
mod tests;
