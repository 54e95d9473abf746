//! Contracts of the media collaborators: frame extraction, direct seeking and video encoding.

use crate::assets::data_uri::decode_data_uri;
use crate::assets::raster::{PreparedImage, decode_image};
use crate::foundation::error::{TesseraError, TesseraResult};

/// Request for decoded frames of one video source.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameExtractionRequest {
    /// Source path, URL or data URI.
    pub video_path: String,
    /// Source-relative timestamps in seconds.
    pub timestamps: Vec<f64>,
    /// Output frame rate of the export asking for the frames.
    pub fps: f64,
    /// Optional `WIDTHxHEIGHT` output size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl FrameExtractionRequest {
    /// Distinct timestamps in ascending order; the response is ordered the same way.
    pub fn sorted_timestamps(&self) -> Vec<f64> {
        let mut ts: Vec<f64> = self
            .timestamps
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .collect();
        ts.sort_by(f64::total_cmp);
        ts.dedup();
        ts
    }
}

/// Frames answering a [`FrameExtractionRequest`], as data URIs.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameExtractionResponse {
    /// One encoded image per distinct requested timestamp, ascending.
    pub images: Vec<String>,
}

impl FrameExtractionResponse {
    /// Decode every image. A malformed entry fails the whole response.
    pub fn decode_frames(&self) -> TesseraResult<Vec<PreparedImage>> {
        self.images
            .iter()
            .enumerate()
            .map(|(i, uri)| {
                let (_, bytes) = decode_data_uri(uri).ok_or_else(|| {
                    TesseraError::collaborator(format!("extracted frame {i} is not a data URI"))
                })?;
                decode_image(&bytes).map_err(|e| {
                    TesseraError::collaborator(format!("extracted frame {i} does not decode: {e}"))
                })
            })
            .collect()
    }
}

/// Failure body returned by the encoding service.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncodeFailure {
    /// Service-provided message.
    pub error: String,
}

impl From<EncodeFailure> for TesseraError {
    fn from(f: EncodeFailure) -> Self {
        TesseraError::collaborator(format!("video encoding failed: {}", f.error))
    }
}

/// Audio clip forwarded to the encoder.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    /// Audio source.
    pub src: String,
    /// Project start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Offset into the source in seconds.
    pub media_start: f64,
}

/// Everything the encoder receives: `fps`, `frameCount`, `frame-<i>` PNGs and `audioTracks`.
#[derive(Clone, Debug, Default)]
pub struct EncodeRequest {
    /// Frames per second.
    pub fps: u32,
    /// PNG-encoded frames in presentation order.
    pub frames: Vec<Vec<u8>>,
    /// Audio to mix under the video.
    pub audio_tracks: Vec<AudioTrack>,
}

impl EncodeRequest {
    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Form field name of frame `i`.
    pub fn frame_field(i: usize) -> String {
        format!("frame-{i}")
    }

    /// Audio tracks as the JSON array sent in the `audioTracks` field.
    pub fn audio_tracks_json(&self) -> TesseraResult<String> {
        serde_json::to_string(&self.audio_tracks)
            .map_err(|e| TesseraError::Other(anyhow::anyhow!("audio track serialization: {e}")))
    }

    pub(crate) fn validate(&self) -> TesseraResult<()> {
        if self.fps == 0 {
            return Err(TesseraError::validation("encode fps must be non-zero"));
        }
        if self.frames.is_empty() {
            return Err(TesseraError::validation("encode request has no frames"));
        }
        Ok(())
    }
}

/// Batch frame-extraction service used by the export prefetch phase.
pub trait FrameExtractor: Send + Sync {
    /// Extract the frames at `request.timestamps`.
    fn extract(&self, request: &FrameExtractionRequest) -> TesseraResult<FrameExtractionResponse>;
}

/// Direct single-frame seek, used when no prefetched frame exists.
pub trait FrameSeeker: Send + Sync {
    /// Decode the frame of `src` at `source_time` seconds.
    fn seek(&self, src: &str, source_time: f64) -> TesseraResult<PreparedImage>;
}

/// Video-encoding service.
pub trait VideoEncoder: Send + Sync {
    /// Encode the frames and audio into a media stream.
    fn encode(&self, request: &EncodeRequest) -> TesseraResult<Vec<u8>>;
}

/// Seeker that never yields a frame, so sources fall through to still-image decoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSeek;

impl FrameSeeker for NoSeek {
    fn seek(&self, src: &str, _source_time: f64) -> TesseraResult<PreparedImage> {
        Err(TesseraError::collaborator(format!("no frame seeker configured for '{src}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/service.rs"]
mod tests;
