//! Default collaborators backed by the system `ffmpeg` binary, one process per request.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::assets::data_uri::{decode_data_uri, encode_data_uri, is_data_uri};
use crate::assets::fetch::FsAssetFetcher;
use crate::assets::raster::{PreparedImage, decode_image};
use crate::foundation::error::{TesseraError, TesseraResult};
use crate::media::scratch::ScratchDir;
use crate::media::service::{
    EncodeFailure, EncodeRequest, FrameExtractionRequest, FrameExtractionResponse, FrameExtractor,
    FrameSeeker, VideoEncoder,
};

/// Whether an `ffmpeg` binary answers on `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> TesseraResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn require_ffmpeg(what: &str) -> TesseraResult<()> {
    if is_ffmpeg_on_path() {
        Ok(())
    } else {
        Err(TesseraError::collaborator(format!(
            "ffmpeg is required for {what}, but was not found on PATH"
        )))
    }
}

/// Resolve a media reference to a readable file. Data URIs are written into `scratch`.
fn materialize(
    src: &str,
    base_dir: &Path,
    scratch: &ScratchDir,
    name: &str,
) -> TesseraResult<PathBuf> {
    if is_data_uri(src) {
        let (_, bytes) = decode_data_uri(src)
            .ok_or_else(|| TesseraError::collaborator("malformed media data URI"))?;
        return scratch.write(name, &bytes);
    }
    let path = FsAssetFetcher::new(base_dir)
        .resolve(src)
        .map_err(|e| TesseraError::collaborator(e.to_string()))?;
    if !path.is_file() {
        return Err(TesseraError::collaborator(format!(
            "media source '{}' does not exist",
            path.display()
        )));
    }
    Ok(path)
}

/// Decode one PNG frame of `path` at `t` seconds.
fn png_frame_at(path: &Path, t: f64, size: Option<&str>) -> TesseraResult<Vec<u8>> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-ss", &format!("{:.6}", t.max(0.0))])
        .arg("-i")
        .arg(path)
        .args(["-frames:v", "1"]);
    if let Some(size) = size {
        cmd.args(["-s", size]);
    }
    cmd.args(["-f", "image2pipe", "-vcodec", "png", "pipe:1"]);

    let out = cmd
        .output()
        .map_err(|e| {
            TesseraError::collaborator(format!("failed to run ffmpeg for frame decode: {e}"))
        })?;
    if !out.status.success() {
        return Err(TesseraError::collaborator(format!(
            "ffmpeg frame decode failed for '{}' at {t:.3}s: {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if out.stdout.is_empty() {
        return Err(TesseraError::collaborator(format!(
            "ffmpeg returned no frame for '{}' at {t:.3}s",
            path.display()
        )));
    }
    Ok(out.stdout)
}

/// [`FrameExtractor`] decoding each requested timestamp with `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegFrameExtractor {
    base_dir: PathBuf,
}

impl FfmpegFrameExtractor {
    /// Extractor resolving relative sources against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl FrameExtractor for FfmpegFrameExtractor {
    fn extract(&self, request: &FrameExtractionRequest) -> TesseraResult<FrameExtractionResponse> {
        require_ffmpeg("frame extraction")?;
        let scratch = ScratchDir::new("extract")?;
        let path = materialize(&request.video_path, &self.base_dir, &scratch, "source")?;
        let images = request
            .sorted_timestamps()
            .into_iter()
            .map(|t| {
                png_frame_at(&path, t, request.size.as_deref())
                    .map(|png| encode_data_uri("image/png", &png))
            })
            .collect::<TesseraResult<Vec<_>>>()?;
        Ok(FrameExtractionResponse { images })
    }
}

/// [`FrameSeeker`] decoding a single frame with `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegFrameSeeker {
    base_dir: PathBuf,
}

impl FfmpegFrameSeeker {
    /// Seeker resolving relative sources against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl FrameSeeker for FfmpegFrameSeeker {
    fn seek(&self, src: &str, source_time: f64) -> TesseraResult<PreparedImage> {
        require_ffmpeg("video seeking")?;
        let scratch = ScratchDir::new("seek")?;
        let path = materialize(src, &self.base_dir, &scratch, "source")?;
        let png = png_frame_at(&path, source_time, None)?;
        decode_image(&png)
    }
}

/// [`VideoEncoder`] producing H.264 MP4 with `ffmpeg`, mixing the audio tracks under the video.
#[derive(Clone, Debug)]
pub struct FfmpegVideoEncoder {
    base_dir: PathBuf,
}

impl FfmpegVideoEncoder {
    /// Encoder resolving relative audio sources against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl VideoEncoder for FfmpegVideoEncoder {
    #[tracing::instrument(skip_all, fields(frames = request.frame_count(), fps = request.fps))]
    fn encode(&self, request: &EncodeRequest) -> TesseraResult<Vec<u8>> {
        request.validate()?;
        require_ffmpeg("video encoding")?;
        let scratch = ScratchDir::new("encode")?;
        for (i, png) in request.frames.iter().enumerate() {
            scratch.write(&format!("frame-{i:06}.png"), png)?;
        }
        let out_path = scratch.file("out.mp4");
        let video_secs = request.frame_count() as f64 / f64::from(request.fps);

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(["-y", "-loglevel", "error", "-framerate", &request.fps.to_string(), "-i"])
            .arg(scratch.file("frame-%06d.png"));

        let mut audio_inputs = 0usize;
        let mut filters = Vec::new();
        let mut labels = String::new();
        for track in &request.audio_tracks {
            let name = format!("audio-{audio_inputs}");
            let path = match materialize(&track.src, &self.base_dir, &scratch, &name) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        source = %track.src,
                        error = %e,
                        "skipping unreadable audio track"
                    );
                    continue;
                }
            };
            audio_inputs += 1;
            cmd.args(["-ss", &format!("{:.6}", track.media_start.max(0.0))])
                .args(["-t", &format!("{:.6}", track.duration.max(0.0))])
                .arg("-i")
                .arg(path);
            let delay_ms = (track.start.max(0.0) * 1000.0).round() as u64;
            filters.push(format!(
                "[{audio_inputs}:a]adelay={delay_ms}|{delay_ms}[a{audio_inputs}]"
            ));
            labels.push_str(&format!("[a{audio_inputs}]"));
        }
        if audio_inputs > 0 {
            filters.push(format!("{labels}amix=inputs={audio_inputs}:duration=longest[aout]"));
            cmd.args(["-filter_complex", &filters.join(";")])
                .args(["-map", "0:v", "-map", "[aout]", "-c:a", "aac"]);
        } else {
            cmd.arg("-an");
        }
        cmd.args([
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-movflags",
            "+faststart",
            "-t",
            &format!("{video_secs:.6}"),
        ])
        .arg(&out_path);

        let output = cmd
            .output()
            .map_err(|e| TesseraError::collaborator(format!("failed to spawn ffmpeg: {e}")))?;
        if !output.status.success() {
            return Err(EncodeFailure {
                error: format!(
                    "ffmpeg exited with status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }
            .into());
        }
        let bytes = std::fs::read(&out_path)
            .with_context(|| format!("read encoded video '{}'", out_path.display()))?;
        tracing::debug!(bytes = bytes.len(), audio_inputs, "video encoded");
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
