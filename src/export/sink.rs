//! Frame sinks: where rendered frames go, in strictly increasing frame order.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::media::ffmpeg::ensure_parent_dir;
use crate::media::service::{AudioTrack, EncodeRequest, VideoEncoder};
use crate::render::frame::FrameRGBA;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Number of frames that will be pushed.
    pub frame_count: u64,
    /// Audio to mix under the frames.
    pub audio_tracks: Vec<AudioTrack>,
}

/// Consumer of an export's frames.
///
/// `begin` is called once, then `push_frame` for frame `0, 1, 2, ...` in order, then `end`.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> TesseraResult<()>;
    /// Accept frame `index`.
    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> TesseraResult<()>;
    /// Finish the stream.
    fn end(&mut self) -> TesseraResult<()>;
}

fn check_order(expected: u64, index: u64) -> TesseraResult<()> {
    if index != expected {
        return Err(TesseraError::validation(format!(
            "frames must arrive in order: expected {expected}, got {index}"
        )));
    }
    Ok(())
}

/// In-memory sink for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<FrameRGBA>,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Frames in timeline order.
    pub fn frames(&self) -> &[FrameRGBA] {
        &self.frames
    }

    /// Whether `end` was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> TesseraResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> TesseraResult<()> {
        check_order(self.frames.len() as u64, index)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> TesseraResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Sink encoding an infinitely looping animated GIF into `W`.
pub struct GifSink<W: Write> {
    writer: Option<W>,
    encoder: Option<image::codecs::gif::GifEncoder<W>>,
    background: Rgba8,
    delay: image::Delay,
    next: u64,
}

impl<W: Write> GifSink<W> {
    /// Sink writing to `writer`; transparent pixels are flattened over `background`.
    pub fn new(writer: W, background: Rgba8) -> Self {
        Self {
            writer: Some(writer),
            encoder: None,
            background,
            delay: image::Delay::from_numer_denom_ms(1000, 30),
            next: 0,
        }
    }
}

impl<W: Write> FrameSink for GifSink<W> {
    fn begin(&mut self, cfg: SinkConfig) -> TesseraResult<()> {
        if cfg.fps == 0 {
            return Err(TesseraError::validation("gif fps must be > 0"));
        }
        let writer = self
            .writer
            .take()
            .ok_or_else(|| TesseraError::validation("gif sink already started"))?;
        let mut encoder = image::codecs::gif::GifEncoder::new(writer);
        encoder
            .set_repeat(image::codecs::gif::Repeat::Infinite)
            .map_err(|e| TesseraError::Other(anyhow::anyhow!("gif repeat: {e}")))?;
        self.encoder = Some(encoder);
        self.delay = image::Delay::from_numer_denom_ms(1000, cfg.fps);
        self.next = 0;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> TesseraResult<()> {
        check_order(self.next, index)?;
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| TesseraError::validation("gif sink was not started"))?;
        let flat = frame.flattened(self.background)?;
        let rgba = image::RgbaImage::from_raw(flat.width, flat.height, flat.data)
            .ok_or_else(|| TesseraError::validation("frame buffer does not match its size"))?;
        encoder
            .encode_frame(image::Frame::from_parts(rgba, 0, 0, self.delay))
            .map_err(|e| TesseraError::Other(anyhow::anyhow!("gif frame {index}: {e}")))?;
        self.next += 1;
        Ok(())
    }

    fn end(&mut self) -> TesseraResult<()> {
        // Dropping the encoder writes the trailer.
        self.encoder.take();
        Ok(())
    }
}

/// Sink handing PNG frames to a [`VideoEncoder`] and writing its output to `out`.
pub struct EncoderSink {
    encoder: Arc<dyn VideoEncoder>,
    out: PathBuf,
    background: Rgba8,
    fps: u32,
    audio_tracks: Vec<AudioTrack>,
    frames: Vec<Vec<u8>>,
    bytes_written: usize,
}

impl EncoderSink {
    /// Sink encoding through `encoder` into `out`; frames are flattened over `background`.
    pub fn new(encoder: Arc<dyn VideoEncoder>, out: impl Into<PathBuf>, background: Rgba8) -> Self {
        Self {
            encoder,
            out: out.into(),
            background,
            fps: 0,
            audio_tracks: Vec::new(),
            frames: Vec::new(),
            bytes_written: 0,
        }
    }

    /// Size of the written output, once `end` succeeded.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

impl FrameSink for EncoderSink {
    fn begin(&mut self, cfg: SinkConfig) -> TesseraResult<()> {
        self.fps = cfg.fps;
        self.frames = Vec::with_capacity(cfg.frame_count.min(4096) as usize);
        self.audio_tracks = cfg.audio_tracks;
        self.bytes_written = 0;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> TesseraResult<()> {
        check_order(self.frames.len() as u64, index)?;
        self.frames.push(frame.flattened(self.background)?.to_png()?);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(out = %self.out.display(), frames = self.frames.len()))]
    fn end(&mut self) -> TesseraResult<()> {
        let request = EncodeRequest {
            fps: self.fps,
            frames: std::mem::take(&mut self.frames),
            audio_tracks: std::mem::take(&mut self.audio_tracks),
        };
        let bytes = self.encoder.encode(&request)?;
        ensure_parent_dir(&self.out)?;
        std::fs::write(&self.out, &bytes).map_err(|e| {
            TesseraError::Other(anyhow::anyhow!("write '{}': {e}", self.out.display()))
        })?;
        self.bytes_written = bytes.len();
        tracing::info!(bytes = bytes.len(), "encoded output written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sink.rs"]
mod tests;
