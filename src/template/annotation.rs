//! Template annotation JSON: which markup elements become editable clips.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::foundation::core::Canvas;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::timeline::clip::EditCaps;

/// Loosely typed scalar as found in annotation files (`"true"`, `true`, `"12"`, `12`).
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Num(f64),
    /// JSON string.
    Str(String),
}

impl Lenient {
    /// Interpret as a flag; unrecognized values yield `default`.
    pub fn as_flag(&self, default: bool) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Num(n) => *n != 0.0,
            Self::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            },
        }
    }

    /// Interpret as a non-negative integer.
    pub fn as_u32(&self) -> Option<u32> {
        let v = match self {
            Self::Bool(_) => return None,
            Self::Num(n) => *n,
            Self::Str(s) => s.trim().parse::<f64>().ok()?,
        };
        (v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX)).then_some(v as u32)
    }
}

fn flag(v: &Option<Lenient>, default: bool) -> bool {
    v.as_ref().map_or(default, |l| l.as_flag(default))
}

/// Annotation record of one editable element.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct AnnotationItem {
    /// Declared node kind (informational; classification reads the markup itself).
    #[serde(default, rename = "nodeName")]
    pub node_name: String,
    /// Element may be moved.
    #[serde(default)]
    pub editor_move: Option<Lenient>,
    /// Element may be scaled.
    #[serde(default)]
    pub editor_scale: Option<Lenient>,
    /// Element may be rotated.
    #[serde(default)]
    pub editor_rotate: Option<Lenient>,
    /// Attributes are locked.
    #[serde(default)]
    pub attr_rock: Option<Lenient>,
    /// Id of the image this element presents (mask pattern).
    #[serde(default)]
    pub image_id: Option<String>,
    /// Id of the shape this element presents.
    #[serde(default)]
    pub shapes_id: Option<String>,
    /// Maximum text length.
    #[serde(default)]
    pub max_length: Option<Lenient>,
}

impl AnnotationItem {
    /// Editing capabilities; missing flags default to editable and unlocked.
    pub fn edit_caps(&self) -> EditCaps {
        EditCaps {
            movable: flag(&self.editor_move, true),
            scalable: flag(&self.editor_scale, true),
            rotatable: flag(&self.editor_rotate, true),
            locked: flag(&self.attr_rock, false),
        }
    }

    /// Maximum text length, when declared as a number.
    pub fn max_length(&self) -> Option<u32> {
        self.max_length.as_ref().and_then(Lenient::as_u32)
    }

    /// Non-empty `image_id`.
    pub fn image_id(&self) -> Option<&str> {
        self.image_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Non-empty `shapes_id`.
    pub fn shapes_id(&self) -> Option<&str> {
        self.shapes_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Parsed template annotation.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Annotation {
    /// Editable elements keyed by markup id.
    #[serde(default)]
    pub item: BTreeMap<String, AnnotationItem>,
    /// Font family to the element ids using it.
    #[serde(default, rename = "font-list")]
    pub font_list: BTreeMap<String, Vec<String>>,
    /// Image URL to the element ids using it.
    #[serde(default, rename = "image-list")]
    pub image_list: BTreeMap<String, Vec<String>>,
}

impl Annotation {
    /// Parse annotation JSON.
    pub fn from_json(json: &str) -> TesseraResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TesseraError::template_parse(format!("invalid annotation json: {e}")))
    }
}

/// Output canvas preset a template is decomposed for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetCategory {
    /// 1920x1080.
    #[default]
    Landscape,
    /// 1080x1920.
    Portrait,
    /// 1080x1080.
    Square,
}

impl TargetCategory {
    /// Canvas size of the preset.
    pub fn canvas(self) -> Canvas {
        let (width, height) = match self {
            Self::Landscape => (1920, 1080),
            Self::Portrait => (1080, 1920),
            Self::Square => (1080, 1080),
        };
        Canvas { width, height }
    }

    /// Reported aspect ratio (`16:9`, `9:16`, `1:1`).
    pub fn aspect_ratio(self) -> f64 {
        match self {
            Self::Landscape => 16.0 / 9.0,
            Self::Portrait => 9.0 / 16.0,
            Self::Square => 1.0,
        }
    }
}

impl FromStr for TargetCategory {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" | "16:9" => Ok(Self::Landscape),
            "portrait" | "9:16" => Ok(Self::Portrait),
            "square" | "1:1" => Ok(Self::Square),
            other => Err(TesseraError::validation(format!(
                "unknown target category '{other}' (expected landscape, portrait or square)"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/annotation.rs"]
mod tests;
