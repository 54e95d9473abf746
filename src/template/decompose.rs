use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::assets::data_uri::encode_data_uri;
use crate::assets::fetch::{AssetFetcher, FsAssetFetcher};
use crate::foundation::core::{Affine, Canvas, PathPrecision, Rgba8, Vec2};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::geometry::bounds::BoundingBox;
use crate::geometry::path::serialize_path;
use crate::geometry::transform::decompose_transform;
use crate::markup::document::{Document, NodeId};
use crate::template::annotation::{Annotation, AnnotationItem, TargetCategory};
use crate::template::classify::classify;
use crate::template::embed::embed_assets;
use crate::template::flatten::{
    ancestor_transform, effective_font_family, effective_font_size, element_geometry,
    flatten_subtree, inherited_presentation, is_paintable, local_transform,
    pin_inherited_presentation,
};
use crate::template::mask::mask_entry;
use crate::template::measure::{
    ComputedMeasurer, GeometryMeasurer, HostMeasurer, MeasureHost, Readiness, fallback_box,
};
use crate::timeline::clip::{
    Clip, ClipType, MediaType, ShapeDescriptor, ShapeGeometry, TemplateEntry, ViewBox,
};
use crate::timeline::model::{Project, Track};

/// Which [`GeometryMeasurer`] a [`Decomposer`] builds by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeasurerKind {
    /// `usvg`-backed measurement with font shaping.
    #[default]
    Host,
    /// Pure geometric measurement.
    Computed,
}

/// Options for [`Decomposer`].
#[derive(Clone, Debug)]
pub struct DecomposeOpts {
    /// Canvas preset.
    pub category: TargetCategory,
    /// Duration assigned to every produced clip, in seconds.
    pub project_duration: f64,
    /// Decimals kept in rewritten path data.
    pub path_precision: PathPrecision,
    /// Upper bound on waiting for fonts before measuring.
    pub measure_timeout: Duration,
    /// Box size used when an element cannot be measured.
    pub default_size: (f64, f64),
    /// Extra font directories for measurement.
    pub font_dirs: Vec<PathBuf>,
    /// Directory relative asset references resolve against.
    pub base_dir: PathBuf,
    /// Measurement strategy.
    pub measurer: MeasurerKind,
}

impl Default for DecomposeOpts {
    fn default() -> Self {
        Self {
            category: TargetCategory::default(),
            project_duration: 5.0,
            path_precision: PathPrecision::default(),
            measure_timeout: Duration::from_secs(3),
            default_size: (200.0, 200.0),
            font_dirs: Vec::new(),
            base_dir: PathBuf::from("."),
            measurer: MeasurerKind::default(),
        }
    }
}

impl DecomposeOpts {
    /// Return options targeting `category`.
    pub fn with_category(mut self, category: TargetCategory) -> Self {
        self.category = category;
        self
    }

    /// Return options with a project duration.
    pub fn with_project_duration(mut self, seconds: f64) -> Self {
        self.project_duration = seconds;
        self
    }

    /// Return options with a path precision.
    pub fn with_path_precision(mut self, precision: PathPrecision) -> Self {
        self.path_precision = precision;
        self
    }

    /// Return options with a measurement timeout.
    pub fn with_measure_timeout(mut self, timeout: Duration) -> Self {
        self.measure_timeout = timeout;
        self
    }

    /// Return options with an asset base directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Return options with extra font directories.
    pub fn with_font_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.font_dirs = dirs;
        self
    }

    /// Return options selecting the measurement strategy.
    pub fn with_measurer(mut self, kind: MeasurerKind) -> Self {
        self.measurer = kind;
        self
    }

    fn validate(&self) -> TesseraResult<()> {
        if !self.project_duration.is_finite() || self.project_duration <= 0.0 {
            return Err(TesseraError::validation("project duration must be finite and > 0"));
        }
        let (w, h) = self.default_size;
        if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
            return Err(TesseraError::validation("default size must be finite and > 0"));
        }
        Ok(())
    }
}

/// Result of decomposing a template.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decomposition {
    /// Clips, front-most first.
    pub clips: Vec<Clip>,
    /// Preset aspect ratio.
    pub aspect_ratio: f64,
    /// Canvas width in pixels.
    pub canvas_width: u32,
    /// Canvas height in pixels.
    pub canvas_height: u32,
    /// Project duration in seconds.
    pub duration: f64,
    /// Font family to clip ids.
    pub font_manifest: BTreeMap<String, Vec<String>>,
    /// Original image URL to clip ids.
    pub image_manifest: BTreeMap<String, Vec<String>>,
}

impl Decomposition {
    /// One track per clip, front-most first.
    pub fn into_tracks(self) -> Vec<Track> {
        self.clips
            .into_iter()
            .map(|c| Track::single(uuid::Uuid::new_v4().to_string(), c))
            .collect()
    }

    /// Wrap into a persisted project.
    pub fn into_project(self) -> Project {
        let canvas = Canvas {
            width: self.canvas_width,
            height: self.canvas_height,
        };
        let aspect_ratio = self.aspect_ratio;
        let duration = self.duration;
        let font_manifest = self.font_manifest.clone();
        let image_manifest = self.image_manifest.clone();
        Project {
            canvas,
            aspect_ratio,
            duration,
            tracks: self.into_tracks(),
            font_manifest,
            image_manifest,
        }
    }
}

/// Converts a markup + annotation template into clips.
pub struct Decomposer {
    opts: DecomposeOpts,
    measurer: Arc<dyn GeometryMeasurer>,
    fetcher: Arc<dyn AssetFetcher>,
}

struct Candidate<'a> {
    node: NodeId,
    id: &'a str,
    item: &'a AnnotationItem,
    kind: ClipType,
}

impl Decomposer {
    /// Decomposer with the measurer selected by `opts` and a filesystem fetcher rooted at
    /// `opts.base_dir`.
    pub fn new(opts: DecomposeOpts) -> Self {
        let measurer: Arc<dyn GeometryMeasurer> = match opts.measurer {
            MeasurerKind::Host => Arc::new(HostMeasurer::new(opts.font_dirs.clone())),
            MeasurerKind::Computed => Arc::new(ComputedMeasurer),
        };
        let fetcher = Arc::new(FsAssetFetcher::new(opts.base_dir.clone()));
        Self {
            opts,
            measurer,
            fetcher,
        }
    }

    /// Replace the measurer.
    pub fn with_measurer(mut self, measurer: Arc<dyn GeometryMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    /// Replace the asset fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Options in use.
    pub fn opts(&self) -> &DecomposeOpts {
        &self.opts
    }

    /// Decompose `markup` as described by `annotation_json`.
    ///
    /// Unreadable markup or annotation JSON is a [`TesseraError::TemplateParse`]. Annotated ids
    /// without a matching element, unclassifiable elements, failed embeds, failed measurements
    /// and dangling clip-path chains degrade per element and are only logged.
    #[tracing::instrument(skip_all, fields(category = ?self.opts.category))]
    pub fn decompose(&self, markup: &str, annotation_json: &str) -> TesseraResult<Decomposition> {
        self.opts.validate()?;
        let annotation = Annotation::from_json(annotation_json)?;
        let mut doc = Document::parse(markup)?;

        let category = self.opts.category;
        let canvas = category.canvas();
        let project = project_matrix(&doc, canvas);
        let embeds = embed_assets(&mut doc, self.fetcher.as_ref());

        let mut candidates = Vec::new();
        for (id, item) in &annotation.item {
            let Some(node) = doc.element_by_id(id) else {
                tracing::warn!(element_id = %id, "annotated element not found in markup, skipping");
                continue;
            };
            let Some(kind) = classify(&doc, node, id, item) else {
                tracing::warn!(
                    element_id = %id,
                    "annotated element cannot become a clip, skipping"
                );
                continue;
            };
            candidates.push(Candidate {
                node,
                id,
                item,
                kind,
            });
        }
        candidates.sort_by_key(|c| doc.position(c.node));
        candidates.reverse();

        let mut families: Vec<String> = annotation.font_list.keys().cloned().collect();
        for c in candidates.iter().filter(|c| c.kind == ClipType::Text) {
            if let Some(f) = effective_font_family(&doc, c.node) {
                if !families.contains(&f) {
                    families.push(f);
                }
            }
        }
        let readiness = Readiness {
            font_families: families,
            timeout: self.opts.measure_timeout,
        };
        let mut host = self.measurer.attach(&readiness)?;

        let mut clips = Vec::with_capacity(candidates.len());
        let mut clip_of: HashMap<&str, String> = HashMap::new();
        let mut image_manifest: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for c in &candidates {
            let clip = self.build_clip(&doc, project, host.as_mut(), c);
            clip_of.insert(c.id, clip.id.clone());
            if c.kind == ClipType::Mask {
                if let Some(url) =
                    mask_image(&doc, c.node, c.item).and_then(|n| embeds.originals.get(&n))
                {
                    push_unique(image_manifest.entry(url.clone()).or_default(), &clip.id);
                }
            }
            clips.push(clip);
        }
        drop(host);

        let mut font_manifest: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (family, ids) in &annotation.font_list {
            let entry = font_manifest.entry(family.clone()).or_default();
            for clip_id in ids.iter().filter_map(|id| clip_of.get(id.as_str())) {
                push_unique(entry, clip_id);
            }
        }
        for clip in &clips {
            if let Some(family) = &clip.font_family {
                push_unique(font_manifest.entry(family.clone()).or_default(), &clip.id);
            }
        }
        for (url, ids) in &annotation.image_list {
            let entry = image_manifest.entry(url.clone()).or_default();
            for clip_id in ids.iter().filter_map(|id| clip_of.get(id.as_str())) {
                push_unique(entry, clip_id);
            }
        }

        tracing::info!(
            clips = clips.len(),
            skipped = annotation.item.len() - clips.len(),
            "template decomposed"
        );
        Ok(Decomposition {
            clips,
            aspect_ratio: category.aspect_ratio(),
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            duration: self.opts.project_duration,
            font_manifest,
            image_manifest,
        })
    }

    fn build_clip(
        &self,
        source: &Document,
        project: Affine,
        host: &mut dyn MeasureHost,
        c: &Candidate<'_>,
    ) -> Clip {
        let precision = self.opts.path_precision;
        let full = project * ancestor_transform(source, c.node) * local_transform(source, c.node);
        let parts = decompose_transform(full);
        let rotated = parts.has_rotation();
        let content = if rotated {
            Affine::scale_non_uniform(parts.scale_x, parts.scale_y)
        } else {
            full
        };

        let mut work = source.clone();
        work.remove_attr(c.node, "transform");
        let opacity = work
            .presentation(c.node, "opacity")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map_or(1.0, |v| v.clamp(0.0, 1.0));
        work.remove_attr(c.node, "opacity");
        work.remove_style_property(c.node, "opacity");
        pin_inherited_presentation(&mut work, c.node);
        flatten_subtree(&mut work, c.node, content, precision);

        let stroke_aware = matches!(c.kind, ClipType::Shape | ClipType::Icon);
        let measured = host
            .measure(&work, c.node, stroke_aware)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    element_id = %c.id,
                    error = %e,
                    "measurement failed, using default size"
                );
                fallback_box(content, self.opts.default_size)
            });

        let mut clip = Clip::new(
            uuid::Uuid::new_v4().to_string(),
            c.kind,
            0.0,
            self.opts.project_duration,
            measured,
        );
        if rotated {
            let r = Affine::rotate(parts.angle_degrees.to_radians());
            let c0 = measured.center();
            let shift = Vec2::new(parts.translate_x, parts.translate_y) - c0.to_vec2()
                + (r * c0).to_vec2();
            clip.x += shift.x;
            clip.y += shift.y;
            clip.rotation = parts.angle_degrees;
        }
        clip.opacity = opacity;
        clip.edit_caps = c.item.edit_caps();

        match c.kind {
            ClipType::Text => {
                clip.text = Some(work.text_lines(c.node).join("\n"));
                clip.font_family = effective_font_family(source, c.node);
                let scale = content.determinant().abs().sqrt();
                clip.font_size = Some(precision.round(effective_font_size(source, c.node) * scale));
                clip.color = inherited_color(source, c.node, "fill").or(Some(Rgba8::BLACK));
                clip.max_length = c.item.max_length();
            }
            ClipType::Shape => {
                clip.color = inherited_color(source, c.node, "fill");
                if let Some(entry) = shape_entry(source, &work, c, measured, precision) {
                    clip.view_box = Some(ViewBox::sized(measured.width, measured.height));
                    clip.template_data.push(entry);
                }
            }
            ClipType::Icon => {
                let vb = ViewBox {
                    x: measured.x,
                    y: measured.y,
                    width: measured.width.max(1e-3),
                    height: measured.height.max(1e-3),
                };
                let svg = work.standalone(c.node, measured.width, measured.height, &vb.to_string());
                clip.src = Some(encode_data_uri("image/svg+xml", svg.as_bytes()));
                clip.view_box = Some(vb);
                clip.color = uniform_fill(&work, c.node);
            }
            ClipType::Mask => {
                if let Some(img) = mask_image(&work, c.node, c.item) {
                    let href = work.href(img).unwrap_or_default().to_string();
                    clip.media_type = Some(if href.starts_with("data:video/") {
                        MediaType::Video
                    } else {
                        MediaType::from_path(&href)
                    });
                    clip.src = Some(href);
                }
                match mask_entry(source, c.node, content, measured, precision) {
                    Ok(entry) => {
                        clip.view_box = Some(ViewBox::sized(measured.width, measured.height));
                        clip.template_data.push(entry);
                    }
                    Err(e) => {
                        tracing::debug!(
                            element_id = %c.id,
                            error = %e,
                            "mask clip has no mask shape"
                        );
                    }
                }
            }
            ClipType::Audio => {}
        }
        clip
    }
}

/// Decompose with default options for `category`.
pub fn decompose(
    markup: &str,
    annotation_json: &str,
    category: TargetCategory,
) -> TesseraResult<Decomposition> {
    Decomposer::new(DecomposeOpts::default().with_category(category))
        .decompose(markup, annotation_json)
}

/// Matrix from document user space to canvas pixels: uniform scale `canvas width / view box
/// width` after moving the view box origin to zero.
pub fn project_matrix(doc: &Document, canvas: Canvas) -> Affine {
    let root = doc.root();
    let vb = doc
        .attr(root, "viewBox")
        .and_then(ViewBox::parse)
        .or_else(|| {
            let w = doc.attr_f64(root, "width")?;
            let h = doc.attr_f64(root, "height")?;
            (w > 0.0 && h > 0.0).then(|| ViewBox::sized(w, h))
        })
        .unwrap_or_else(|| ViewBox::sized(f64::from(canvas.width), f64::from(canvas.height)));
    let s = f64::from(canvas.width) / vb.width;
    Affine::scale(s) * Affine::translate((-vb.x, -vb.y))
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|x| x == id) {
        list.push(id.to_string());
    }
}

fn inherited_color(doc: &Document, node: NodeId, prop: &str) -> Option<Rgba8> {
    inherited_presentation(doc, node, prop).and_then(|v| Rgba8::parse(&v))
}

/// Fill shared by every painted element below `node`, or `None` when they differ. Elements
/// without a fill paint black; unfilled ones do not count.
fn uniform_fill(doc: &Document, node: NodeId) -> Option<Rgba8> {
    let mut shared = None;
    for n in doc.descendants(node) {
        if !doc.name(n).is_some_and(is_paintable) {
            continue;
        }
        let color = match inherited_presentation(doc, n, "fill") {
            Some(v) if v == "none" => continue,
            Some(v) => Rgba8::parse(&v)?,
            None => Rgba8::BLACK,
        };
        match shared {
            Some(s) if s != color => return None,
            _ => shared = Some(color),
        }
    }
    shared
}

/// Image element presented by a mask clip: the element itself, the element named by
/// `image_id`, or the first `<image>` below it.
fn mask_image(doc: &Document, node: NodeId, item: &AnnotationItem) -> Option<NodeId> {
    if doc.name(node) == Some("image") {
        return Some(node);
    }
    item.image_id()
        .and_then(|id| doc.element_by_id(id))
        .filter(|&n| doc.name(n) == Some("image"))
        .or_else(|| {
            doc.descendants(node)
                .into_iter()
                .find(|&n| doc.name(n) == Some("image"))
        })
}

fn shape_entry(
    source: &Document,
    work: &Document,
    c: &Candidate<'_>,
    measured: BoundingBox,
    precision: PathPrecision,
) -> Option<TemplateEntry> {
    let (geometry, _) = element_geometry(source, c.node)?;
    let (_, mut path) = element_geometry(work, c.node)?;
    path.apply_affine(local_transform(work, c.node));
    path.apply_affine(Affine::translate((-measured.x, -measured.y)));
    let sides = match (&geometry, source.name(c.node)) {
        (ShapeGeometry::Polygon { points }, Some("polygon")) => {
            u32::try_from(points.len()).ok()
        }
        _ => None,
    };
    Some(TemplateEntry {
        element_id: c.id.to_string(),
        shape: Some(ShapeDescriptor {
            geometry,
            d: serialize_path(&path, precision),
            sides,
        }),
        overrides: None,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/template/decompose.rs"]
mod tests;
