//! Export prefetch phase: batched, deduplicated extraction of every video frame the output needs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::assets::raster::PreparedImage;
use crate::export::cancel::CancelToken;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::media::service::{FrameExtractionRequest, FrameExtractor};
use crate::timeline::model::TimelineSnapshot;

/// Default number of timestamps per extraction request.
pub const DEFAULT_EXTRACT_BATCH_SIZE: usize = 32;

/// Batch size from `TESSERA_EXTRACT_BATCH_SIZE`, else [`DEFAULT_EXTRACT_BATCH_SIZE`].
pub fn extract_batch_size_from_env() -> usize {
    std::env::var("TESSERA_EXTRACT_BATCH_SIZE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_EXTRACT_BATCH_SIZE)
}

/// Timestamps are compared at millisecond resolution.
pub(crate) fn time_key(source_time: f64) -> u64 {
    (source_time.max(0.0) * 1000.0).round() as u64
}

/// Decoded video frames keyed by source, output frame index and source timestamp.
#[derive(Clone, Debug, Default)]
pub struct VideoFrameCache {
    frames: HashMap<(String, u64, u64), Arc<PreparedImage>>,
}

impl VideoFrameCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the frame of `src` sampled at `source_time` for output frame `frame_index`.
    pub fn insert(
        &mut self,
        src: &str,
        frame_index: u64,
        source_time: f64,
        image: Arc<PreparedImage>,
    ) {
        self.frames
            .insert((src.to_string(), frame_index, time_key(source_time)), image);
    }

    /// Frame of `src` for output frame `frame_index`, if it was prefetched at `source_time`.
    pub fn get(&self, src: &str, frame_index: u64, source_time: f64) -> Option<Arc<PreparedImage>> {
        self.frames
            .get(&(src.to_string(), frame_index, time_key(source_time)))
            .cloned()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// What one source needs: distinct timestamps, and which output frames use which timestamp.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourcePlan {
    /// Distinct source timestamps in milliseconds, ascending.
    pub timestamps_ms: BTreeSet<u64>,
    /// `(output frame, source timestamp ms)` pairs.
    pub uses: Vec<(u64, u64)>,
}

/// Per-source extraction plan for an export.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrefetchPlan {
    /// Plans keyed by source.
    pub sources: BTreeMap<String, SourcePlan>,
}

impl PrefetchPlan {
    /// Walk every output frame and record the source timestamp each active video clip samples.
    pub fn build(snapshot: &TimelineSnapshot, fps: u32, frame_count: u64) -> Self {
        let mut plan = Self::default();
        if fps == 0 {
            return plan;
        }
        let videos: Vec<_> = snapshot.clips().filter(|c| c.is_video()).collect();
        for frame in 0..frame_count {
            let t = frame as f64 / f64::from(fps);
            for clip in videos.iter().filter(|c| c.is_active_at(t)) {
                let Some(src) = clip.src.as_deref() else {
                    continue;
                };
                let ms = time_key(clip.source_time(t));
                let sp = plan.sources.entry(src.to_string()).or_default();
                sp.timestamps_ms.insert(ms);
                sp.uses.push((frame, ms));
            }
        }
        plan
    }

    /// Total distinct timestamps across sources.
    pub fn timestamp_count(&self) -> usize {
        self.sources.values().map(|s| s.timestamps_ms.len()).sum()
    }
}

/// Summary of a prefetch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Extraction requests sent.
    pub requests: usize,
    /// Frames decoded.
    pub frames: usize,
    /// Sources whose extraction failed; their clips fall back to direct seeking.
    pub failed_sources: Vec<String>,
}

fn fetch_source(
    src: &str,
    sp: &SourcePlan,
    extractor: &dyn FrameExtractor,
    fps: u32,
    batch_size: usize,
    cancel: &CancelToken,
    report: &mut PrefetchReport,
) -> TesseraResult<HashMap<u64, Arc<PreparedImage>>> {
    let all: Vec<u64> = sp.timestamps_ms.iter().copied().collect();
    let mut decoded = HashMap::with_capacity(all.len());
    for batch in all.chunks(batch_size.max(1)) {
        cancel.check()?;
        let request = FrameExtractionRequest {
            video_path: src.to_string(),
            timestamps: batch.iter().map(|&ms| ms as f64 / 1000.0).collect(),
            fps: f64::from(fps),
            size: None,
        };
        report.requests += 1;
        let images = extractor.extract(&request)?.decode_frames()?;
        if images.len() != batch.len() {
            return Err(TesseraError::collaborator(format!(
                "frame extraction for '{src}' returned {} images for {} timestamps",
                images.len(),
                batch.len()
            )));
        }
        for (&ms, img) in batch.iter().zip(images) {
            decoded.insert(ms, Arc::new(img));
        }
    }
    Ok(decoded)
}

/// Run the prefetch phase.
///
/// Sources are fetched independently: a failing source is logged, listed in the report and left
/// to direct seeking. Cancellation is checked before every request and aborts the whole phase.
#[tracing::instrument(
    skip_all,
    fields(sources = plan.sources.len(), timestamps = plan.timestamp_count())
)]
pub fn prefetch(
    plan: &PrefetchPlan,
    extractor: &dyn FrameExtractor,
    fps: u32,
    batch_size: usize,
    cancel: &CancelToken,
) -> TesseraResult<(VideoFrameCache, PrefetchReport)> {
    let mut cache = VideoFrameCache::new();
    let mut report = PrefetchReport::default();
    for (src, sp) in &plan.sources {
        let decoded = match fetch_source(src, sp, extractor, fps, batch_size, cancel, &mut report) {
            Ok(d) => d,
            Err(TesseraError::Cancelled) => return Err(TesseraError::Cancelled),
            Err(e) => {
                tracing::warn!(source = %src, error = %e, "frame prefetch failed for source");
                report.failed_sources.push(src.clone());
                continue;
            }
        };
        report.frames += decoded.len();
        for &(frame, ms) in &sp.uses {
            if let Some(img) = decoded.get(&ms) {
                cache.insert(src, frame, ms as f64 / 1000.0, img.clone());
            }
        }
    }
    tracing::debug!(
        requests = report.requests,
        frames = report.frames,
        failed = report.failed_sources.len(),
        "prefetch finished"
    );
    Ok((cache, report))
}

#[cfg(test)]
#[path = "../../tests/unit/media/prefetch.rs"]
mod tests;
