//! Per-frame compositing of timeline clips onto a CPU [`Surface`].
//!
//! A [`Compositor`] is reusable across frames: decoded stills, parsed vector sources, rasters,
//! font faces, text layouts and directly seeked video frames are cached by source so that
//! consecutive frames only pay for what changed. A failure while preparing one clip is logged and
//! the clip is skipped; the rest of the frame still draws.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use usvg::fontdb;

use crate::assets::data_uri::{decode_data_uri, guess_mime, is_data_uri};
use crate::assets::fetch::{AssetFetcher, FsAssetFetcher};
use crate::assets::fonts::{bold_face, build_fontdb, usvg_options};
use crate::assets::raster::{
    decode_image, parse_svg, rasterize_svg_to_premul_rgba8, svg_raster_params,
};
use crate::assets::text::{TextBrushRgba8, TextLayoutEngine, centered_offsets};
use crate::foundation::core::{Affine, BezPath, Canvas, Rgba8, Vec2};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::foundation::math::Fnv1a64;
use crate::geometry::path::parse_bez;
use crate::geometry::primitives::{Primitive, ellipse_path, rect_path, rounded_rect_path};
use crate::media::prefetch::{VideoFrameCache, time_key};
use crate::media::service::{FrameSeeker, NoSeek};
use crate::render::frame::FrameRGBA;
use crate::render::icon::prepare_icon_markup;
use crate::render::paint::{
    Surface, affine_to_cpu, bezpath_to_cpu, color_to_cpu, image_paint, image_paint_size,
};
use crate::template::flatten::DEFAULT_FONT_SIZE;
use crate::timeline::clip::{Clip, ClipType, CropShape};
use crate::timeline::model::TimelineSnapshot;

/// Default number of directly seeked video frames kept per compositor.
pub const DEFAULT_VIDEO_FRAME_CAPACITY: usize = 64;

fn video_frame_capacity_from_env() -> usize {
    std::env::var("TESSERA_VIDEO_CACHE_CAPACITY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_VIDEO_FRAME_CAPACITY)
}

/// Compositor configuration.
#[derive(Clone, Debug)]
pub struct CompositorOpts {
    /// Color filled under every frame.
    pub background: Rgba8,
    /// Capacity of the direct-seek frame cache (`TESSERA_VIDEO_CACHE_CAPACITY`).
    pub video_frame_capacity: usize,
    /// Directory relative sources are resolved against.
    pub base_dir: PathBuf,
    /// Extra font directories for text clips.
    pub font_dirs: Vec<PathBuf>,
    /// Whether system fonts are loaded for text clips.
    pub system_fonts: bool,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            background: Rgba8::BLACK,
            video_frame_capacity: video_frame_capacity_from_env(),
            base_dir: PathBuf::from("."),
            font_dirs: Vec::new(),
            system_fonts: true,
        }
    }
}

impl CompositorOpts {
    /// Set the background color.
    pub fn with_background(mut self, background: Rgba8) -> Self {
        self.background = background;
        self
    }

    /// Set the direct-seek cache capacity (at least one frame).
    pub fn with_video_frame_capacity(mut self, capacity: usize) -> Self {
        self.video_frame_capacity = capacity.max(1);
        self
    }

    /// Set the directory relative sources are resolved against.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Set extra font directories.
    pub fn with_font_dirs(mut self, font_dirs: Vec<PathBuf>) -> Self {
        self.font_dirs = font_dirs;
        self
    }

    /// Toggle loading of system fonts.
    pub fn with_system_fonts(mut self, on: bool) -> Self {
        self.system_fonts = on;
        self
    }
}

/// What happened to the active clips of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Clips drawn.
    pub drawn: usize,
    /// Clips skipped because preparing them failed.
    pub skipped: usize,
}

/// Matrix mapping a mask descriptor from its declared view box into clip-local pixels:
/// `scale(width / vbw, height / vbh) * translate(-vbx, -vby)`.
///
/// Descriptors without a view box are already in clip-local pixels.
pub fn mask_shape_matrix(clip: &Clip) -> Affine {
    let Some(vb) = clip.view_box.filter(|vb| vb.width > 0.0 && vb.height > 0.0) else {
        return Affine::IDENTITY;
    };
    Affine::scale_non_uniform(clip.width / vb.width, clip.height / vb.height)
        * Affine::translate((-vb.x, -vb.y))
}

/// Union of the clip's mask descriptors in canvas coordinates (before rotation).
fn mask_region(clip: &Clip) -> Option<BezPath> {
    let m = Affine::translate((clip.x, clip.y)) * mask_shape_matrix(clip);
    let mut union = BezPath::new();
    for shape in clip.mask_shapes() {
        let mut p = parse_bez(&shape.d);
        p.apply_affine(m);
        union.extend(p.elements().iter().copied());
    }
    (!union.elements().is_empty()).then_some(union)
}

fn crop_region(clip: &Clip, shape: CropShape, corner_radius: f64) -> BezPath {
    match shape {
        CropShape::Ellipse => ellipse_path(clip.x, clip.y, clip.width, clip.height),
        CropShape::Rect if corner_radius > 0.0 => {
            rounded_rect_path(clip.x, clip.y, clip.width, clip.height, corner_radius)
        }
        CropShape::Rect => rect_path(clip.x, clip.y, clip.width, clip.height),
    }
}

/// Zoom mapping the crop sub-rectangle of the content onto the full clip box.
fn crop_zoom(clip: &Clip, cx: f64, cy: f64, cw: f64, ch: f64) -> Affine {
    let sw = clip.width * cw / 100.0;
    let sh = clip.height * ch / 100.0;
    if sw <= 0.0 || sh <= 0.0 {
        return Affine::IDENTITY;
    }
    let sx = clip.x + clip.width * cx / 100.0;
    let sy = clip.y + clip.height * cy / 100.0;
    Affine::translate((clip.x, clip.y))
        * Affine::scale_non_uniform(clip.width / sw, clip.height / sh)
        * Affine::translate((-sx, -sy))
}

fn flip_matrix(clip: &Clip) -> Affine {
    if !clip.flip_h && !clip.flip_v {
        return Affine::IDENTITY;
    }
    let c = clip.center().to_vec2();
    let sx = if clip.flip_h { -1.0 } else { 1.0 };
    let sy = if clip.flip_v { -1.0 } else { 1.0 };
    Affine::translate(c) * Affine::scale_non_uniform(sx, sy) * Affine::translate(-c)
}

/// Where a clip draws: the rotation about its own center, the optional clip region (in canvas
/// coordinates under `base`), and the transform applied to its content.
#[derive(Clone, Debug)]
struct Placement {
    base: Affine,
    region: Option<BezPath>,
    content: Affine,
}

impl Placement {
    fn of(clip: &Clip) -> Self {
        let c: Vec2 = clip.center().to_vec2();
        let base =
            Affine::translate(c)
                * Affine::rotate(clip.rotation.to_radians())
                * Affine::translate(-c);

        let mut content = base;
        let mut region = None;
        if clip.kind != ClipType::Shape {
            region = mask_region(clip);
        }
        if region.is_none()
            && let Some(crop) = clip.crop.filter(|c| !c.is_full())
        {
            region = Some(crop_region(clip, crop.shape, crop.corner_radius));
            content = content * crop_zoom(clip, crop.x, crop.y, crop.width, crop.height);
        }
        content = content * flip_matrix(clip);
        Self {
            base,
            region,
            content,
        }
    }
}

/// Prepared drawing for one clip.
enum Content {
    Image {
        paint: vello_cpu::Image,
        transform: Affine,
        width: f64,
        height: f64,
    },
    Fill {
        path: BezPath,
        color: Rgba8,
    },
    Stroke {
        path: BezPath,
        color: Rgba8,
        width: f64,
    },
    Text {
        font: vello_cpu::peniko::FontData,
        layout: Arc<parley::Layout<TextBrushRgba8>>,
        origin: Affine,
        line_x: Vec<f32>,
        y: f32,
    },
    Empty,
}

struct FontFace {
    key: String,
    bytes: Arc<Vec<u8>>,
    font: vello_cpu::peniko::FontData,
}

/// Small LRU of directly seeked frames keyed by `(source hash, source time ms)`.
struct SeekCache {
    capacity: usize,
    frames: HashMap<(u64, u64), vello_cpu::Image>,
    order: VecDeque<(u64, u64)>,
}

impl SeekCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            frames: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&mut self, key: (u64, u64)) -> Option<vello_cpu::Image> {
        let hit = self.frames.get(&key).cloned()?;
        if let Some(pos) = self.order.iter().position(|k| *k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key);
        Some(hit)
    }

    fn insert(&mut self, key: (u64, u64), image: vello_cpu::Image) {
        if self.frames.insert(key, image).is_none() {
            self.order.push_back(key);
        }
        while self.frames.len() > self.capacity {
            let Some(old) = self.order.pop_front() else {
                break;
            };
            self.frames.remove(&old);
        }
    }
}

fn hash_str(s: &str) -> u64 {
    let mut h = Fnv1a64::new_default();
    h.write_str(s);
    h.finish()
}

/// Clip compositor with its decoded-asset caches.
pub struct Compositor {
    opts: CompositorOpts,
    seeker: Arc<dyn FrameSeeker>,
    fetcher: Arc<dyn AssetFetcher>,
    fontdb: Option<Arc<fontdb::Database>>,
    faces: HashMap<String, Option<Arc<FontFace>>>,
    text: TextLayoutEngine,
    layouts: HashMap<u64, Arc<parley::Layout<TextBrushRgba8>>>,
    images: HashMap<u64, vello_cpu::Image>,
    svg_trees: HashMap<u64, Arc<usvg::Tree>>,
    svg_rasters: HashMap<(u64, u32, u32), vello_cpu::Image>,
    seeks: SeekCache,
}

impl Compositor {
    /// Compositor without direct seeking, resolving sources against `opts.base_dir`.
    pub fn new(opts: CompositorOpts) -> Self {
        let fetcher = Arc::new(FsAssetFetcher::new(opts.base_dir.clone()));
        let seeks = SeekCache::new(opts.video_frame_capacity);
        Self {
            opts,
            seeker: Arc::new(NoSeek),
            fetcher,
            fontdb: None,
            faces: HashMap::new(),
            text: TextLayoutEngine::new(),
            layouts: HashMap::new(),
            images: HashMap::new(),
            svg_trees: HashMap::new(),
            svg_rasters: HashMap::new(),
            seeks,
        }
    }

    /// Use `seeker` on prefetch cache misses.
    pub fn with_seeker(mut self, seeker: Arc<dyn FrameSeeker>) -> Self {
        self.seeker = seeker;
        self
    }

    /// Fetch non-inline sources through `fetcher`.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Share an already loaded font database instead of building one on first use.
    pub fn with_fontdb(mut self, db: Arc<fontdb::Database>) -> Self {
        self.fontdb = Some(db);
        self
    }

    /// Options this compositor was built with.
    pub fn opts(&self) -> &CompositorOpts {
        &self.opts
    }

    /// Draw the frame at project time `t` onto `surface`.
    ///
    /// Active clips draw in descending track order so track 0 ends up on top. `frame_index` and
    /// `frames` select prefetched video frames; on a miss the seeker is asked directly.
    #[tracing::instrument(skip_all, fields(t))]
    pub fn render_frame(
        &mut self,
        surface: &mut Surface,
        t: f64,
        snapshot: &TimelineSnapshot,
        frame_index: Option<u64>,
        frames: Option<&VideoFrameCache>,
    ) -> FrameOutcome {
        let (w, h) = (surface.width(), surface.height());
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color_to_cpu(self.opts.background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

        let mut outcome = FrameOutcome::default();
        for (track, clip) in snapshot.active_clips(t) {
            if clip.kind == ClipType::Audio || clip.width <= 0.0 || clip.height <= 0.0 {
                continue;
            }
            let placement = Placement::of(clip);
            match self.prepare(clip, &placement, t, frame_index, frames) {
                Ok(content) => {
                    draw_clip(&mut ctx, clip, &placement, &content);
                    outcome.drawn += 1;
                }
                Err(e) => {
                    tracing::warn!(clip_id = %clip.id, track, error = %e, "skipping clip");
                    outcome.skipped += 1;
                }
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(surface.pixmap_mut());
        outcome
    }

    /// Render the frame at `t` into a fresh surface sized to `canvas`.
    pub fn render_frame_rgba(
        &mut self,
        canvas: Canvas,
        t: f64,
        snapshot: &TimelineSnapshot,
    ) -> TesseraResult<FrameRGBA> {
        let mut surface = Surface::new(canvas)?;
        self.render_frame(&mut surface, t, snapshot, None, None);
        Ok(surface.to_frame())
    }

    fn prepare(
        &mut self,
        clip: &Clip,
        placement: &Placement,
        t: f64,
        frame_index: Option<u64>,
        frames: Option<&VideoFrameCache>,
    ) -> TesseraResult<Content> {
        match clip.kind {
            ClipType::Mask => self.prepare_mask(clip, placement.content, t, frame_index, frames),
            ClipType::Icon => self.prepare_icon(clip, placement.content),
            ClipType::Shape => self.prepare_shape(clip, placement.content),
            ClipType::Text => self.prepare_text(clip, placement.content),
            ClipType::Audio => Ok(Content::Empty),
        }
    }

    fn prepare_mask(
        &mut self,
        clip: &Clip,
        content: Affine,
        t: f64,
        frame_index: Option<u64>,
        frames: Option<&VideoFrameCache>,
    ) -> TesseraResult<Content> {
        let src = clip
            .src
            .as_deref()
            .ok_or_else(|| TesseraError::draw("mask clip has no source"))?;
        if clip.is_video()
            && let Some(paint) = self.video_frame(clip, src, t, frame_index, frames)?
        {
            return boxed_image(clip, content, paint);
        }
        self.still_content(clip, src, content)
    }

    fn video_frame(
        &mut self,
        clip: &Clip,
        src: &str,
        t: f64,
        frame_index: Option<u64>,
        frames: Option<&VideoFrameCache>,
    ) -> TesseraResult<Option<vello_cpu::Image>> {
        let source_time = clip.source_time(t);
        if let (Some(index), Some(cache)) = (frame_index, frames)
            && let Some(img) = cache.get(src, index, source_time)
        {
            return image_paint(&img).map(Some);
        }

        let key = (hash_str(src), time_key(source_time));
        if let Some(hit) = self.seeks.get(key) {
            return Ok(Some(hit));
        }
        match self.seeker.seek(src, source_time) {
            Ok(img) => {
                let paint = image_paint(&img)?;
                self.seeks.insert(key, paint.clone());
                Ok(Some(paint))
            }
            Err(e) => {
                tracing::debug!(
                    clip_id = %clip.id,
                    source_time,
                    error = %e,
                    "seek failed, trying still"
                );
                Ok(None)
            }
        }
    }

    fn source_bytes(&self, src: &str) -> TesseraResult<(String, Vec<u8>)> {
        if is_data_uri(src) {
            return decode_data_uri(src)
                .ok_or_else(|| TesseraError::draw("malformed data URI source"));
        }
        let bytes = self
            .fetcher
            .fetch(src)
            .map_err(|e| TesseraError::draw(format!("fetch '{src}': {e}")))?;
        Ok((guess_mime(&bytes, src), bytes))
    }

    /// Still image or vector source drawn to fill the clip box.
    fn still_content(&mut self, clip: &Clip, src: &str, content: Affine) -> TesseraResult<Content> {
        let key = hash_str(src);
        if let Some(paint) = self.images.get(&key).cloned() {
            return boxed_image(clip, content, paint);
        }
        let (mime, bytes) = self.source_bytes(src)?;
        if mime.contains("svg") {
            let markup = String::from_utf8(bytes)
                .map_err(|_| TesseraError::draw("vector source is not UTF-8"))?;
            return self.svg_content(clip, &markup, content);
        }
        let img = decode_image(&bytes).map_err(|e| TesseraError::draw(e.to_string()))?;
        let paint = image_paint(&img)?;
        self.images.insert(key, paint.clone());
        boxed_image(clip, content, paint)
    }

    fn prepare_icon(&mut self, clip: &Clip, content: Affine) -> TesseraResult<Content> {
        let src = clip
            .src
            .as_deref()
            .ok_or_else(|| TesseraError::draw("icon clip has no source"))?;
        let (_, bytes) = self.source_bytes(src)?;
        let markup =
            String::from_utf8(bytes).map_err(|_| TesseraError::draw("icon source is not UTF-8"))?;
        let prepared = prepare_icon_markup(&markup, clip.color, &clip.template_data)?;
        self.svg_content(clip, &prepared, content)
    }

    fn fontdb(&mut self) -> Arc<fontdb::Database> {
        self.fontdb
            .get_or_insert_with(|| build_fontdb(&self.opts.font_dirs, self.opts.system_fonts))
            .clone()
    }

    /// Rasterize `markup` at the resolution it lands on the canvas and place it over the box.
    fn svg_content(
        &mut self,
        clip: &Clip,
        markup: &str,
        content: Affine,
    ) -> TesseraResult<Content> {
        let key = hash_str(markup);
        let tree = match self.svg_trees.get(&key) {
            Some(tree) => tree.clone(),
            None => {
                let opts = usvg_options(self.fontdb());
                let tree = parse_svg(markup.as_bytes(), &opts)
                    .map_err(|e| TesseraError::draw(e.to_string()))?;
                self.svg_trees.insert(key, tree.clone());
                tree
            }
        };

        let size = tree.size();
        let tw = f64::from(size.width()).ceil().max(1.0);
        let th = f64::from(size.height()).ceil().max(1.0);
        let draw = content
            * Affine::translate((clip.x, clip.y))
            * Affine::scale_non_uniform(clip.width / tw, clip.height / th);
        let (rw, rh, adjust) = svg_raster_params(&tree, draw)?;

        let paint = match self.svg_rasters.get(&(key, rw, rh)) {
            Some(paint) => paint.clone(),
            None => {
                let img = rasterize_svg_to_premul_rgba8(&tree, rw, rh)?;
                let paint = image_paint(&img)?;
                self.svg_rasters.insert((key, rw, rh), paint.clone());
                paint
            }
        };
        Ok(Content::Image {
            paint,
            transform: adjust,
            width: f64::from(rw),
            height: f64::from(rh),
        })
    }

    fn prepare_shape(&mut self, clip: &Clip, content: Affine) -> TesseraResult<Content> {
        let color = clip.color.unwrap_or(Rgba8::BLACK);
        let sides = clip.mask_shapes().find_map(|s| s.sides);
        if let Some(primitive) = clip
            .shape
            .as_deref()
            .and_then(|name| Primitive::from_name(name, sides))
        {
            let path = primitive.path(clip.x, clip.y, clip.width, clip.height);
            return Ok(if primitive.is_stroked() {
                Content::Stroke {
                    path,
                    color,
                    width: arrow_stroke_width(clip),
                }
            } else {
                Content::Fill { path, color }
            });
        }
        if let Some(path) = mask_region(clip) {
            return Ok(Content::Fill { path, color });
        }
        if let Some(src) = clip.src.as_deref() {
            return self.still_content(clip, src, content);
        }
        Err(TesseraError::draw(
            "shape clip has no primitive, path or source",
        ))
    }

    fn face(&mut self, family: Option<&str>) -> TesseraResult<Arc<FontFace>> {
        let family_key = family.map(str::trim).unwrap_or_default().to_string();
        if let Some(face) = self.faces.get(&family_key) {
            return face
                .clone()
                .ok_or_else(|| TesseraError::draw("no font face available"));
        }
        let db = self.fontdb();
        let face = bold_face(&db, family).map(|data| {
            let font = vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(data.bytes.as_ref().clone()),
                data.index,
            );
            Arc::new(FontFace {
                key: format!("{family_key}#{}", data.index),
                bytes: data.bytes,
                font,
            })
        });
        self.faces.insert(family_key, face.clone());
        face.ok_or_else(|| TesseraError::draw("no font face available"))
    }

    fn prepare_text(&mut self, clip: &Clip, content: Affine) -> TesseraResult<Content> {
        let Some(text) = clip.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            return Ok(Content::Empty);
        };
        let size = clip.font_size.unwrap_or(DEFAULT_FONT_SIZE) as f32;
        let color = clip.color.unwrap_or(Rgba8::BLACK);
        let face = self.face(clip.font_family.as_deref())?;

        let mut h = Fnv1a64::new_default();
        h.write_str(text);
        h.write_str(&face.key);
        h.write_u32(size.to_bits());
        h.write_bytes(&[color.r, color.g, color.b, color.a]);
        let key = h.finish();

        let layout = match self.layouts.get(&key) {
            Some(layout) => layout.clone(),
            None => {
                let layout = Arc::new(self.text.layout_lines(
                    text,
                    &face.key,
                    &face.bytes,
                    size,
                    color.into(),
                )?);
                self.layouts.insert(key, layout.clone());
                layout
            }
        };
        let (line_x, y) = centered_offsets(&layout, clip.width as f32, clip.height as f32);
        Ok(Content::Text {
            font: face.font.clone(),
            layout,
            origin: content * Affine::translate((clip.x, clip.y)),
            line_x,
            y,
        })
    }
}

fn arrow_stroke_width(clip: &Clip) -> f64 {
    (clip.width.min(clip.height) * 0.08).max(2.0)
}

fn boxed_image(clip: &Clip, content: Affine, paint: vello_cpu::Image) -> TesseraResult<Content> {
    let (iw, ih) = image_paint_size(&paint)?;
    Ok(Content::Image {
        paint,
        transform: content
            * Affine::translate((clip.x, clip.y))
            * Affine::scale_non_uniform(clip.width / iw, clip.height / ih),
        width: iw,
        height: ih,
    })
}

fn draw_clip(
    ctx: &mut vello_cpu::RenderContext,
    clip: &Clip,
    placement: &Placement,
    content: &Content,
) {
    let opacity = clip.opacity.clamp(0.0, 1.0) as f32;
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    if let Some(region) = &placement.region {
        ctx.set_transform(affine_to_cpu(placement.base));
        ctx.push_clip_layer(&bezpath_to_cpu(region));
    }

    match content {
        Content::Image {
            paint,
            transform,
            width,
            height,
        } => {
            ctx.set_transform(affine_to_cpu(*transform));
            ctx.set_paint(paint.clone());
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, *width, *height));
        }
        Content::Fill { path, color } => {
            ctx.set_transform(affine_to_cpu(placement.content));
            ctx.set_paint(color_to_cpu(*color));
            ctx.fill_path(&bezpath_to_cpu(path));
        }
        Content::Stroke { path, color, width } => {
            ctx.set_transform(affine_to_cpu(placement.content));
            ctx.set_paint(color_to_cpu(*color));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(*width));
            ctx.stroke_path(&bezpath_to_cpu(path));
        }
        Content::Text {
            font,
            layout,
            origin,
            line_x,
            y,
        } => {
            ctx.set_transform(affine_to_cpu(*origin));
            for (i, line) in layout.lines().enumerate() {
                let dx = line_x.get(i).copied().unwrap_or(0.0);
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x + dx,
                        y: g.y + *y,
                    });
                    ctx.glyph_run(font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
        }
        Content::Empty => {}
    }

    if placement.region.is_some() {
        ctx.pop_layer();
    }
    if opacity < 1.0 {
        ctx.pop_layer();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
