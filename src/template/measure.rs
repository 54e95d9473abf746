//! Bounding-box measurement of flattened template elements.
//!
//! Measurement goes through [`GeometryMeasurer`]: attach a host (waiting for fonts up to a
//! timeout), measure any number of elements, and drop the host to tear it down.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use usvg::fontdb;

use crate::assets::fonts::{build_fontdb, has_family, usvg_options};
use crate::foundation::core::{Affine, Point};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::geometry::bounds::{BoundingBox, bounds_of_bez};
use crate::markup::document::{Document, NodeId, parse_length};
use crate::template::flatten::{
    effective_font_size, element_geometry, inherited_presentation, is_non_rendering,
    is_shape_kind, local_transform,
};

const MAX_USE_DEPTH: usize = 16;

/// What a host must have loaded before measuring.
#[derive(Clone, Debug)]
pub struct Readiness {
    /// Font families declared by the template.
    pub font_families: Vec<String>,
    /// Upper bound on the wait.
    pub timeout: Duration,
}

/// Capability to create measurement hosts.
pub trait GeometryMeasurer: Send + Sync {
    /// Prepare a host. Waiting for fonts is bounded by `readiness.timeout`; on timeout the host
    /// measures with whatever finished loading.
    fn attach(&self, readiness: &Readiness) -> TesseraResult<Box<dyn MeasureHost + '_>>;
}

/// Attached measurement host. Dropping it releases its resources.
pub trait MeasureHost {
    /// Box of `node` (its own `transform` included, ancestors ignored).
    ///
    /// `stroke_aware` includes stroke extents; otherwise the fill geometry is measured.
    fn measure(
        &mut self,
        doc: &Document,
        node: NodeId,
        stroke_aware: bool,
    ) -> TesseraResult<BoundingBox>;
}

type FontLoader = fn(&[PathBuf], bool) -> Arc<fontdb::Database>;

/// Font database of a [`HostMeasurer`], loaded once on a worker thread.
enum FontState {
    Idle,
    /// Still loading after an attach gave up waiting.
    Loading(mpsc::Receiver<Arc<fontdb::Database>>),
    Ready(Arc<fontdb::Database>),
}

/// Measurer backed by the `usvg` renderer model, with text shaped against a font database.
pub struct HostMeasurer {
    font_dirs: Vec<PathBuf>,
    system_fonts: bool,
    loader: FontLoader,
    fonts: Mutex<FontState>,
}

impl HostMeasurer {
    /// Measurer loading fonts from system locations and `font_dirs`.
    pub fn new(font_dirs: Vec<PathBuf>) -> Self {
        Self {
            font_dirs,
            system_fonts: true,
            loader: |dirs, system| build_fontdb(dirs, system),
            fonts: Mutex::new(FontState::Idle),
        }
    }

    /// Toggle loading of system fonts.
    pub fn with_system_fonts(mut self, on: bool) -> Self {
        self.system_fonts = on;
        self
    }

    /// Loaded font database, waiting at most `timeout` for it. A load that outlives the wait
    /// keeps running and is picked up by a later call.
    fn fontdb(&self, timeout: Duration) -> Arc<fontdb::Database> {
        let mut state = match self.fonts.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let rx = match std::mem::replace(&mut *state, FontState::Idle) {
            FontState::Ready(db) => {
                *state = FontState::Ready(db.clone());
                return db;
            }
            FontState::Loading(rx) => rx,
            FontState::Idle => {
                let (tx, rx) = mpsc::channel();
                let dirs = self.font_dirs.clone();
                let system = self.system_fonts;
                let load = self.loader;
                std::thread::spawn(move || {
                    let _ = tx.send(load(&dirs, system));
                });
                rx
            }
        };
        match rx.recv_timeout(timeout) {
            Ok(db) => {
                *state = FontState::Ready(db.clone());
                db
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "font loading timed out, measuring without fonts"
                );
                *state = FontState::Loading(rx);
                Arc::new(fontdb::Database::new())
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!("font loading failed, measuring without fonts");
                Arc::new(fontdb::Database::new())
            }
        }
    }
}

impl Default for HostMeasurer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl GeometryMeasurer for HostMeasurer {
    fn attach(&self, readiness: &Readiness) -> TesseraResult<Box<dyn MeasureHost + '_>> {
        let db = self.fontdb(readiness.timeout);
        for family in &readiness.font_families {
            if !has_family(&db, family) {
                tracing::warn!(family = %family, "declared font family is not available");
            }
        }
        tracing::debug!(faces = db.len(), "measurement host attached");
        Ok(Box::new(UsvgHost {
            opts: usvg_options(db),
        }))
    }
}

struct UsvgHost {
    opts: usvg::Options<'static>,
}

impl MeasureHost for UsvgHost {
    fn measure(
        &mut self,
        doc: &Document,
        node: NodeId,
        stroke_aware: bool,
    ) -> TesseraResult<BoundingBox> {
        let svg = doc.standalone(node, 1.0, 1.0, "0 0 1 1");
        let tree = usvg::Tree::from_str(&svg, &self.opts)
            .map_err(|e| TesseraError::measurement(format!("measurement parse failed: {e}")))?;
        let root = tree.root();
        let r = if stroke_aware {
            root.abs_stroke_bounding_box()
        } else {
            root.abs_bounding_box()
        };
        let bbox = BoundingBox::new(
            f64::from(r.x()),
            f64::from(r.y()),
            f64::from(r.width()),
            f64::from(r.height()),
        );
        if (bbox.width <= 0.0 && bbox.height <= 0.0) || !root.has_children() {
            return Err(TesseraError::measurement("element has no measurable geometry"));
        }
        Ok(bbox)
    }
}

impl Drop for UsvgHost {
    fn drop(&mut self) {
        tracing::debug!("measurement host detached");
    }
}

/// Measurer computing boxes from parsed geometry alone.
///
/// Curves are bounded by their control points and text is estimated from font size and
/// character count, so boxes are looser than [`HostMeasurer`]'s.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputedMeasurer;

impl GeometryMeasurer for ComputedMeasurer {
    fn attach(&self, _readiness: &Readiness) -> TesseraResult<Box<dyn MeasureHost + '_>> {
        Ok(Box::new(ComputedHost))
    }
}

struct ComputedHost;

impl MeasureHost for ComputedHost {
    fn measure(
        &mut self,
        doc: &Document,
        node: NodeId,
        stroke_aware: bool,
    ) -> TesseraResult<BoundingBox> {
        let mut acc = None;
        walk(doc, node, Affine::IDENTITY, stroke_aware, 0, &mut acc);
        acc.filter(|b: &BoundingBox| b.width > 0.0 || b.height > 0.0)
            .ok_or_else(|| TesseraError::measurement("element has no measurable geometry"))
    }
}

fn merge(acc: &mut Option<BoundingBox>, b: BoundingBox) {
    *acc = Some(match acc.take() {
        Some(a) => a.union(&b),
        None => b,
    });
}

fn stroke_half_width(doc: &Document, node: NodeId) -> f64 {
    let stroked = inherited_presentation(doc, node, "stroke").is_some_and(|s| s != "none");
    if !stroked {
        return 0.0;
    }
    let w = inherited_presentation(doc, node, "stroke-width")
        .and_then(|v| parse_length(&v))
        .unwrap_or(1.0);
    0.5 * w.max(0.0)
}

fn walk(
    doc: &Document,
    node: NodeId,
    parent: Affine,
    stroke_aware: bool,
    depth: usize,
    acc: &mut Option<BoundingBox>,
) {
    let Some(name) = doc.name(node) else {
        return;
    };
    if is_non_rendering(name) || doc.presentation(node, "display").as_deref() == Some("none") {
        return;
    }
    let m = parent * local_transform(doc, node);
    match name {
        n if is_shape_kind(n) => {
            let Some((_, mut bp)) = element_geometry(doc, node) else {
                return;
            };
            bp.apply_affine(m);
            let mut b = bounds_of_bez(&bp);
            if stroke_aware {
                let pad = stroke_half_width(doc, node) * m.determinant().abs().sqrt();
                b = BoundingBox::new(
                    b.x - pad,
                    b.y - pad,
                    b.width + 2.0 * pad,
                    b.height + 2.0 * pad,
                );
            }
            merge(acc, b);
        }
        "image" => {
            let x = doc.attr_f64(node, "x").unwrap_or(0.0);
            let y = doc.attr_f64(node, "y").unwrap_or(0.0);
            let w = doc.attr_f64(node, "width").unwrap_or(0.0);
            let h = doc.attr_f64(node, "height").unwrap_or(0.0);
            if w > 0.0 && h > 0.0 {
                merge(acc, BoundingBox::new(x, y, w, h).transform(m));
            }
        }
        "text" => {
            if let Some(b) = estimate_text(doc, node) {
                merge(acc, b.transform(m));
            }
        }
        "use" => {
            if depth >= MAX_USE_DEPTH {
                return;
            }
            let Some(target) = doc.href(node).and_then(|h| doc.resolve_reference(h)) else {
                return;
            };
            let x = doc.attr_f64(node, "x").unwrap_or(0.0);
            let y = doc.attr_f64(node, "y").unwrap_or(0.0);
            let m_use = m * Affine::translate((x, y));
            walk_target(doc, target, m_use, stroke_aware, depth + 1, acc);
        }
        _ => {
            for child in doc.element_children(node) {
                walk(doc, child, m, stroke_aware, depth, acc);
            }
        }
    }
}

// `use` may point into `<defs>` or at a `<symbol>`, which are skipped when reached directly.
fn walk_target(
    doc: &Document,
    target: NodeId,
    m: Affine,
    stroke_aware: bool,
    depth: usize,
    acc: &mut Option<BoundingBox>,
) {
    if doc.name(target) == Some("symbol") {
        for child in doc.element_children(target) {
            walk(doc, child, m, stroke_aware, depth, acc);
        }
    } else {
        walk(doc, target, m, stroke_aware, depth, acc);
    }
}

/// Text box estimated from font size: `0.6em` per character, `1.2em` per line, baseline at
/// `0.8em` below the top.
fn estimate_text(doc: &Document, node: NodeId) -> Option<BoundingBox> {
    let lines = doc.text_lines(node);
    let longest = lines.iter().map(|l| l.chars().count()).max()?;
    let size = effective_font_size(doc, node);
    let first = |attr: &str| {
        doc.attr(node, attr)
            .and_then(|v| v.split(|c: char| c.is_whitespace() || c == ',').find(|t| !t.is_empty()))
            .and_then(parse_length)
            .unwrap_or(0.0)
    };
    let (x, y) = (first("x"), first("y"));
    let w = longest as f64 * size * 0.6;
    let h = lines.len() as f64 * size * 1.2;
    let left = match inherited_presentation(doc, node, "text-anchor").as_deref() {
        Some("middle") => x - 0.5 * w,
        Some("end") => x - w,
        _ => x,
    };
    Some(BoundingBox::new(left, y - 0.8 * size, w, h))
}

/// Box placed at the mapped origin of `m` with the fallback size.
pub fn fallback_box(m: Affine, size: (f64, f64)) -> BoundingBox {
    let o = m * Point::ORIGIN;
    BoundingBox::new(o.x, o.y, size.0, size.1)
}

#[cfg(test)]
#[path = "../../tests/unit/template/measure.rs"]
mod tests;
