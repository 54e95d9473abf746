use std::fmt;

use crate::foundation::core::{Point, Rgba8};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::geometry::bounds::BoundingBox;

/// Content kind of a [`Clip`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipType {
    /// Laid-out text.
    Text,
    /// Primitive or custom vector shape.
    Shape,
    /// Self-contained vector artwork.
    Icon,
    /// Raster or video content cropped by mask shapes.
    Mask,
    /// Audio only; never drawn.
    Audio,
}

/// Kind of media referenced by `Clip::src`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Still raster image.
    Image,
    /// Video container; frames are sampled at `time - start + mediaStart`.
    Video,
    /// Audio stream.
    Audio,
}

impl MediaType {
    /// Guess the media type from a path or URL extension.
    pub fn from_path(src: &str) -> Self {
        let lower = src.to_ascii_lowercase();
        let ext = lower
            .split(['?', '#'])
            .next()
            .and_then(|p| p.rsplit('.').next())
            .unwrap_or_default();
        match ext {
            "mp4" | "mov" | "webm" | "mkv" | "m4v" | "avi" => Self::Video,
            "mp3" | "wav" | "ogg" | "aac" | "m4a" | "flac" => Self::Audio,
            _ => Self::Image,
        }
    }
}

/// User coordinate system `min-x min-y width height`, serialized as the SVG attribute string.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBox {
    /// Minimum x.
    pub x: f64,
    /// Minimum y.
    pub y: f64,
    /// Width (> 0).
    pub width: f64,
    /// Height (> 0).
    pub height: f64,
}

impl ViewBox {
    /// `0 0 width height`.
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Parse `"x y w h"` (comma or whitespace separated). Non-positive sizes are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let v: Vec<f64> = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<_>>()?;
        let [x, y, width, height] = v.as_slice() else {
            return None;
        };
        (*width > 0.0 && *height > 0.0).then_some(Self {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        })
    }
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

impl serde::Serialize for ViewBox {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ViewBox {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid viewBox \"{s}\"")))
    }
}

/// Shape of a crop window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropShape {
    /// Rectangle, optionally with rounded corners.
    #[default]
    Rect,
    /// Ellipse inscribed in the crop rectangle.
    Ellipse,
}

/// Crop window in percentages of the clip box.
///
/// The window selects a content sub-region that is stretched to fill the clip box.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropWindow {
    /// Left edge, percent of width.
    pub x: f64,
    /// Top edge, percent of height.
    pub y: f64,
    /// Width, percent of width.
    pub width: f64,
    /// Height, percent of height.
    pub height: f64,
    /// Window shape.
    #[serde(default)]
    pub shape: CropShape,
    /// Corner radius in clip pixels (rectangles only).
    #[serde(default)]
    pub corner_radius: f64,
}

impl CropWindow {
    /// Whether the window is the identity (full box, rectangular, square corners).
    pub fn is_full(&self) -> bool {
        self.shape == CropShape::Rect
            && self.corner_radius <= 0.0
            && self.x <= 0.0
            && self.y <= 0.0
            && self.width >= 100.0
            && self.height >= 100.0
    }
}

/// Geometry of one mask/primitive shape, before serialization to `d`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeGeometry {
    /// `<rect>`.
    Rect {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Corner radius.
        #[serde(default)]
        rx: f64,
    },
    /// `<circle>`.
    Circle {
        /// Center x.
        cx: f64,
        /// Center y.
        cy: f64,
        /// Radius.
        r: f64,
    },
    /// `<ellipse>`.
    Ellipse {
        /// Center x.
        cx: f64,
        /// Center y.
        cy: f64,
        /// Horizontal radius.
        rx: f64,
        /// Vertical radius.
        ry: f64,
    },
    /// `<polygon>` / `<polyline>`.
    Polygon {
        /// Vertex list.
        points: Vec<[f64; 2]>,
    },
    /// Free-form `<path>`; the geometry is `d` itself.
    Path,
}

/// One mask or primitive shape expressed in clip-local coordinates.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapeDescriptor {
    /// Source geometry parameters (in the source element's own space).
    #[serde(flatten)]
    pub geometry: ShapeGeometry,
    /// Absolute path data in clip-local coordinates (origin at the clip box corner).
    pub d: String,
    /// Side count for regular polygons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<u32>,
}

/// Per-element override applied to icon artwork before rasterization.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementOverride {
    /// Replacement text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Replacement fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgba8>,
    /// Replacement stroke color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Rgba8>,
    /// Replacement element opacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// One `templateData` entry: a shape descriptor and/or an override for a source element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntry {
    /// Id of the source markup element.
    pub element_id: String,
    /// Mask or primitive shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeDescriptor>,
    /// Element override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ElementOverride>,
}

/// Editing capabilities declared by the template annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCaps {
    /// Can be dragged.
    pub movable: bool,
    /// Can be resized.
    pub scalable: bool,
    /// Can be rotated.
    pub rotatable: bool,
    /// Attributes are locked.
    pub locked: bool,
}

impl Default for EditCaps {
    fn default() -> Self {
        Self {
            movable: true,
            scalable: true,
            rotatable: true,
            locked: false,
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// One timed, positioned unit of visual (or audio) content.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Globally unique id.
    pub id: String,
    /// Content kind.
    #[serde(rename = "type")]
    pub kind: ClipType,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds (> 0).
    pub duration: f64,
    /// Left edge in canvas pixels.
    pub x: f64,
    /// Top edge in canvas pixels.
    pub y: f64,
    /// Width in canvas pixels.
    pub width: f64,
    /// Height in canvas pixels.
    pub height: f64,
    /// Rotation in degrees about the box center.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub rotation: f64,
    /// Opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Mirror horizontally about the box center.
    #[serde(default)]
    pub flip_h: bool,
    /// Mirror vertically about the box center.
    #[serde(default)]
    pub flip_v: bool,
    /// Percentage crop window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropWindow>,
    /// Mask shapes and per-element overrides, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_data: Vec<TemplateEntry>,
    /// Media or vector source (data URI, path or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Offset into the source media in seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub media_start: f64,
    /// Kind of `src`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    /// Text content (lines separated by `\n`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Fill / text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba8>,
    /// Coordinate space of the shape descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_box: Option<ViewBox>,
    /// Primitive shape identifier (`rectangle`, `star`, …) for shape clips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// Editing capabilities.
    #[serde(default)]
    pub edit_caps: EditCaps,
    /// Maximum text length for text clips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl Clip {
    /// Clip with the given identity, time window and box; every optional field empty.
    pub fn new(
        id: impl Into<String>,
        kind: ClipType,
        start: f64,
        duration: f64,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            start,
            duration,
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
            rotation: 0.0,
            opacity: 1.0,
            flip_h: false,
            flip_v: false,
            crop: None,
            template_data: Vec::new(),
            src: None,
            media_start: 0.0,
            media_type: None,
            text: None,
            font_family: None,
            font_size: None,
            color: None,
            view_box: None,
            shape: None,
            edit_caps: EditCaps::default(),
            max_length: None,
        }
    }

    /// Exclusive end time.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether `t` lies in `[start, start + duration)`.
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    /// Clip box in canvas pixels.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }

    /// Rotation and flip pivot.
    pub fn center(&self) -> Point {
        self.bbox().center()
    }

    /// Source-media timestamp sampled at project time `t`.
    pub fn source_time(&self, t: f64) -> f64 {
        t - self.start + self.media_start
    }

    /// Whether `src` is sampled as video: declared so, or named like a video when undeclared.
    pub fn is_video(&self) -> bool {
        let Some(src) = self.src.as_deref() else {
            return false;
        };
        match self.media_type {
            Some(t) => t == MediaType::Video,
            None => src.starts_with("data:video/") || MediaType::from_path(src) == MediaType::Video,
        }
    }

    /// Mask shapes carried in `templateData`.
    pub fn mask_shapes(&self) -> impl Iterator<Item = &ShapeDescriptor> {
        self.template_data.iter().filter_map(|e| e.shape.as_ref())
    }

    /// Check the entity invariants: non-empty id, finite non-negative start, positive duration,
    /// non-negative size, opacity in `[0, 1]`.
    pub fn validate(&self) -> TesseraResult<()> {
        if self.id.trim().is_empty() {
            return Err(TesseraError::validation("clip id must be non-empty"));
        }
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(TesseraError::validation(format!(
                "clip '{}' start must be finite and >= 0",
                self.id
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(TesseraError::validation(format!(
                "clip '{}' duration must be finite and > 0",
                self.id
            )));
        }
        let finite = [self.x, self.y, self.width, self.height, self.rotation]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width < 0.0 || self.height < 0.0 {
            return Err(TesseraError::validation(format!(
                "clip '{}' geometry must be finite with width/height >= 0",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(TesseraError::validation(format!(
                "clip '{}' opacity must be in [0, 1]",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clip.rs"]
mod tests;
