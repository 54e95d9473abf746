use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use usvg::fontdb;

use crate::assets::fetch::AssetFetcher;
use crate::assets::fonts::build_fontdb;
use crate::export::cancel::CancelToken;
use crate::export::sink::{EncoderSink, FrameSink, GifSink, SinkConfig};
use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::media::ffmpeg::{
    FfmpegFrameExtractor, FfmpegFrameSeeker, FfmpegVideoEncoder, ensure_parent_dir,
};
use crate::media::prefetch::{
    PrefetchPlan, PrefetchReport, VideoFrameCache, extract_batch_size_from_env, prefetch,
};
use crate::media::service::{AudioTrack, FrameExtractor, FrameSeeker, VideoEncoder};
use crate::render::compositor::{Compositor, CompositorOpts, FrameOutcome};
use crate::render::frame::FrameRGBA;
use crate::render::paint::Surface;
use crate::timeline::clip::ClipType;
use crate::timeline::model::TimelineSnapshot;

/// Output container of [`Exporter::export_to_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Single still at time 0.
    Png,
    /// Looping animated GIF, encoded in-process.
    Gif,
    /// H.264 video through the video-encoding collaborator.
    Mp4,
}

impl ExportFormat {
    /// Format named by the extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "mp4" => Some(Self::Mp4),
            _ => None,
        }
    }
}

/// Export configuration.
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Output frames per second.
    pub fps: u32,
    /// Container written by [`Exporter::export_to_file`].
    pub format: ExportFormat,
    /// Timestamps per frame-extraction request (`TESSERA_EXTRACT_BATCH_SIZE`).
    pub extract_batch_size: usize,
    /// Render frames on a worker pool.
    pub parallel: bool,
    /// Worker count; `None` lets the pool decide.
    pub threads: Option<usize>,
    /// Frames rendered between sink deliveries and cancellation checks in parallel mode.
    pub chunk_size: usize,
    /// Color transparent output pixels are flattened over.
    pub bg_rgba: Rgba8,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            fps: 30,
            format: ExportFormat::Mp4,
            extract_batch_size: extract_batch_size_from_env(),
            parallel: false,
            threads: None,
            chunk_size: 64,
            bg_rgba: Rgba8::BLACK,
        }
    }
}

impl ExportOpts {
    /// Set the frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the output container.
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the extraction batch size.
    pub fn with_extract_batch_size(mut self, n: usize) -> Self {
        self.extract_batch_size = n.max(1);
        self
    }

    /// Render on a worker pool with `threads` workers (`None`: pool default).
    pub fn with_parallel(mut self, threads: Option<usize>) -> Self {
        self.parallel = true;
        self.threads = threads;
        self
    }

    /// Set the flattening background.
    pub fn with_bg_rgba(mut self, bg: Rgba8) -> Self {
        self.bg_rgba = bg;
        self
    }
}

/// Counters of one export.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Frames delivered to the sink.
    pub frames_total: u64,
    /// Clip draws across all frames.
    pub clips_drawn: u64,
    /// Clip draws skipped after a failure.
    pub clips_skipped: u64,
    /// Prefetch phase summary.
    pub prefetch: PrefetchReport,
}

impl ExportStats {
    fn record(&mut self, outcome: FrameOutcome) {
        self.frames_total += 1;
        self.clips_drawn += outcome.drawn as u64;
        self.clips_skipped += outcome.skipped as u64;
    }
}

/// Number of frames covering `duration` seconds at `fps`.
pub fn frame_count(duration: f64, fps: u32) -> u64 {
    if fps == 0 || !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    (duration * f64::from(fps) - 1e-9).ceil().max(1.0) as u64
}

/// Project time of output frame `index`.
pub fn frame_time(index: u64, fps: u32) -> f64 {
    index as f64 / f64::from(fps.max(1))
}

/// Audio clips of the timeline, as the encoder receives them.
pub fn audio_tracks(snapshot: &TimelineSnapshot) -> Vec<AudioTrack> {
    snapshot
        .clips()
        .filter(|c| c.kind == ClipType::Audio)
        .filter_map(|c| {
            Some(AudioTrack {
                src: c.src.clone()?,
                start: c.start,
                duration: c.duration,
                media_start: c.media_start,
            })
        })
        .collect()
}

/// Two-phase exporter: batched video-frame prefetch, then per-frame compositing into a sink.
pub struct Exporter {
    opts: ExportOpts,
    compositor: CompositorOpts,
    extractor: Arc<dyn FrameExtractor>,
    seeker: Arc<dyn FrameSeeker>,
    encoder: Arc<dyn VideoEncoder>,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    fontdb: Option<Arc<fontdb::Database>>,
}

impl Exporter {
    /// Exporter using the system `ffmpeg` collaborators rooted at `compositor.base_dir`.
    pub fn new(opts: ExportOpts, compositor: CompositorOpts) -> Self {
        let base = compositor.base_dir.clone();
        let compositor = compositor.with_background(opts.bg_rgba);
        Self {
            opts,
            compositor,
            extractor: Arc::new(FfmpegFrameExtractor::new(base.clone())),
            seeker: Arc::new(FfmpegFrameSeeker::new(base.clone())),
            encoder: Arc::new(FfmpegVideoEncoder::new(base)),
            fetcher: None,
            fontdb: None,
        }
    }

    /// Replace the frame-extraction collaborator.
    pub fn with_extractor(mut self, extractor: Arc<dyn FrameExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the direct-seek collaborator.
    pub fn with_seeker(mut self, seeker: Arc<dyn FrameSeeker>) -> Self {
        self.seeker = seeker;
        self
    }

    /// Replace the video-encoding collaborator.
    pub fn with_encoder(mut self, encoder: Arc<dyn VideoEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Fetch non-inline sources through `fetcher`.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Share an already loaded font database.
    pub fn with_fontdb(mut self, db: Arc<fontdb::Database>) -> Self {
        self.fontdb = Some(db);
        self
    }

    /// Export options.
    pub fn opts(&self) -> &ExportOpts {
        &self.opts
    }

    fn shared_fontdb(&self) -> Arc<fontdb::Database> {
        self.fontdb.clone().unwrap_or_else(|| {
            build_fontdb(&self.compositor.font_dirs, self.compositor.system_fonts)
        })
    }

    fn make_compositor(&self, db: &Arc<fontdb::Database>) -> Compositor {
        let mut c = Compositor::new(self.compositor.clone())
            .with_seeker(self.seeker.clone())
            .with_fontdb(db.clone());
        if let Some(fetcher) = &self.fetcher {
            c = c.with_fetcher(fetcher.clone());
        }
        c
    }

    /// Render the frame at `t` without a prefetch phase.
    pub fn render_still(
        &self,
        snapshot: &TimelineSnapshot,
        canvas: Canvas,
        t: f64,
    ) -> TesseraResult<FrameRGBA> {
        let db = self.shared_fontdb();
        self.make_compositor(&db).render_frame_rgba(canvas, t, snapshot)
    }

    /// Render the frame at `t` and write it to `out` as PNG.
    pub fn export_png(
        &self,
        snapshot: &TimelineSnapshot,
        canvas: Canvas,
        t: f64,
        out: &Path,
    ) -> TesseraResult<()> {
        let png = self
            .render_still(snapshot, canvas, t)?
            .flattened(self.opts.bg_rgba)?
            .to_png()?;
        ensure_parent_dir(out)?;
        std::fs::write(out, png)
            .map_err(|e| TesseraError::Other(anyhow::anyhow!("write '{}': {e}", out.display())))
    }

    /// Export the whole timeline into `sink`.
    ///
    /// `snapshot` is the state captured when the export started; it is never re-read. Video
    /// frames are prefetched first, then every frame is composited (on a worker pool when
    /// `parallel` is set) and delivered in order. Cancellation is checked between batches and
    /// between frames and surfaces as [`TesseraError::Cancelled`].
    #[tracing::instrument(
        skip_all,
        fields(fps = self.opts.fps, width = canvas.width, height = canvas.height)
    )]
    pub fn export(
        &self,
        snapshot: &TimelineSnapshot,
        canvas: Canvas,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> TesseraResult<ExportStats> {
        let fps = self.opts.fps;
        if fps == 0 {
            return Err(TesseraError::validation("export fps must be > 0"));
        }
        let count = frame_count(snapshot.duration(), fps);
        if count == 0 {
            return Err(TesseraError::validation("timeline has no content to export"));
        }
        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };
        cancel.check()?;

        let plan = PrefetchPlan::build(snapshot, fps, count);
        let (cache, report) = prefetch(
            &plan,
            self.extractor.as_ref(),
            fps,
            self.opts.extract_batch_size,
            cancel,
        )?;
        let mut stats = ExportStats {
            prefetch: report,
            ..ExportStats::default()
        };

        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps,
            frame_count: count,
            audio_tracks: audio_tracks(snapshot),
        })?;

        let db = self.shared_fontdb();
        if let Some(pool) = pool {
            let chunk = self.opts.chunk_size.max(1) as u64;
            let mut start = 0;
            while start < count {
                cancel.check()?;
                let end = (start + chunk).min(count);
                let rendered = pool.install(|| {
                    (start..end)
                        .into_par_iter()
                        .map_init(
                            || self.make_compositor(&db),
                            |comp, i| {
                                cancel.check()?;
                                render_one(comp, canvas, snapshot, i, fps, &cache)
                            },
                        )
                        .collect::<Vec<_>>()
                });
                for (i, item) in (start..end).zip(rendered) {
                    let (frame, outcome) = item?;
                    sink.push_frame(i, &frame)?;
                    stats.record(outcome);
                }
                start = end;
            }
        } else {
            let mut comp = self.make_compositor(&db);
            for i in 0..count {
                cancel.check()?;
                let (frame, outcome) = render_one(&mut comp, canvas, snapshot, i, fps, &cache)?;
                sink.push_frame(i, &frame)?;
                stats.record(outcome);
            }
        }

        sink.end()?;
        tracing::info!(
            frames = stats.frames_total,
            skipped = stats.clips_skipped,
            "export finished"
        );
        Ok(stats)
    }

    /// Export in `opts.format` to `out`.
    pub fn export_to_file(
        &self,
        snapshot: &TimelineSnapshot,
        canvas: Canvas,
        out: &Path,
        cancel: &CancelToken,
    ) -> TesseraResult<ExportStats> {
        match self.opts.format {
            ExportFormat::Png => {
                cancel.check()?;
                self.export_png(snapshot, canvas, 0.0, out)?;
                Ok(ExportStats {
                    frames_total: 1,
                    ..ExportStats::default()
                })
            }
            ExportFormat::Gif => {
                ensure_parent_dir(out)?;
                let part = partial_path(out);
                let stats = self
                    .export_gif(snapshot, canvas, &part, cancel)
                    .and_then(|stats| {
                        std::fs::rename(&part, out).map_err(|e| {
                            TesseraError::Other(anyhow::anyhow!(
                                "rename '{}' -> '{}': {e}",
                                part.display(),
                                out.display()
                            ))
                        })?;
                        Ok(stats)
                    });
                if stats.is_err() {
                    let _ = std::fs::remove_file(&part);
                }
                stats
            }
            ExportFormat::Mp4 => {
                let mut sink = EncoderSink::new(self.encoder.clone(), out, self.opts.bg_rgba);
                self.export(snapshot, canvas, &mut sink, cancel)
            }
        }
    }

    /// Encode the animation into `path`; the file is fully written when this returns `Ok`.
    fn export_gif(
        &self,
        snapshot: &TimelineSnapshot,
        canvas: Canvas,
        path: &Path,
        cancel: &CancelToken,
    ) -> TesseraResult<ExportStats> {
        let file = std::fs::File::create(path).map_err(|e| {
            TesseraError::Other(anyhow::anyhow!("create '{}': {e}", path.display()))
        })?;
        let mut writer = std::io::BufWriter::new(file);
        let mut sink = GifSink::new(&mut writer, self.opts.bg_rgba);
        let stats = self.export(snapshot, canvas, &mut sink, cancel)?;
        drop(sink);
        writer.flush().map_err(|e| {
            TesseraError::Other(anyhow::anyhow!("write '{}': {e}", path.display()))
        })?;
        Ok(stats)
    }
}

/// Sibling of `out` the animation is written to before it is moved into place.
fn partial_path(out: &Path) -> PathBuf {
    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.with_file_name(format!(".{name}.part"))
}

fn render_one(
    comp: &mut Compositor,
    canvas: Canvas,
    snapshot: &TimelineSnapshot,
    index: u64,
    fps: u32,
    cache: &VideoFrameCache,
) -> TesseraResult<(FrameRGBA, FrameOutcome)> {
    let mut surface = Surface::new(canvas)?;
    let outcome = comp.render_frame(
        &mut surface,
        frame_time(index, fps),
        snapshot,
        Some(index),
        Some(cache),
    );
    Ok((surface.to_frame(), outcome))
}

fn build_thread_pool(threads: Option<usize>) -> TesseraResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TesseraError::validation(
            "export 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TesseraError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
