//! Tessera turns annotated vector templates into editable timeline clips, and composites those
//! clips into stills, animated GIFs and video.
//!
//! The public API has two halves:
//!
//! - [`Decomposer`] / [`decompose`]: flatten a markup template plus its JSON annotation into a
//!   list of positioned [`Clip`]s, one per [`Track`], front-most first.
//! - [`Compositor`] / [`Exporter`]: draw a [`TimelineSnapshot`] at a given time onto a CPU
//!   [`Surface`], or export a whole timeline through a [`FrameSink`] after a batched video-frame
//!   prefetch phase.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod export;
mod foundation;
mod geometry;
mod markup;
mod media;
mod render;
mod template;
mod timeline;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, PathPrecision, Point, Rect, Rgba8, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{TesseraError, TesseraResult};

pub use crate::geometry::bounds::{BoundingBox, bounds_of_bez, bounds_of_path};
pub use crate::geometry::path::{
    PathCommand, absolutize, parse_bez, parse_path, serialize_path, transform_path,
};
pub use crate::geometry::primitives::{
    ELLIPSE_KAPPA, Primitive, STAR_INNER_RATIO, arrow_path, ellipse_path, polygon_path,
    rect_path, rounded_rect_path, star_path, triangle_path,
};
pub use crate::geometry::transform::{
    TransformParts, decompose_transform, format_matrix, parse_transform,
};

pub use crate::markup::document::{Document, NodeId};

pub use crate::timeline::clip::{
    Clip, ClipType, CropShape, CropWindow, EditCaps, ElementOverride, MediaType, ShapeDescriptor,
    ShapeGeometry, TemplateEntry, ViewBox,
};
pub use crate::timeline::model::{Project, Timeline, TimelineSnapshot, Track};

pub use crate::assets::data_uri::{decode_data_uri, encode_data_uri, guess_mime, is_data_uri};
pub use crate::assets::fetch::{AssetFetcher, FsAssetFetcher};
pub use crate::assets::fonts::build_fontdb;
pub use crate::assets::raster::{PreparedImage, decode_image};

pub use crate::template::annotation::{Annotation, AnnotationItem, TargetCategory};
pub use crate::template::decompose::{
    DecomposeOpts, Decomposer, Decomposition, MeasurerKind, decompose, project_matrix,
};
pub use crate::template::embed::{EmbedReport, embed_assets};
pub use crate::template::measure::{
    ComputedMeasurer, GeometryMeasurer, HostMeasurer, MeasureHost, Readiness,
};

pub use crate::render::compositor::{
    Compositor, CompositorOpts, DEFAULT_VIDEO_FRAME_CAPACITY, FrameOutcome, mask_shape_matrix,
};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::icon::{prepare_icon_markup, recolor};
pub use crate::render::paint::Surface;

pub use crate::media::ffmpeg::{
    FfmpegFrameExtractor, FfmpegFrameSeeker, FfmpegVideoEncoder, is_ffmpeg_on_path,
};
pub use crate::media::prefetch::{
    DEFAULT_EXTRACT_BATCH_SIZE, PrefetchPlan, PrefetchReport, SourcePlan, VideoFrameCache,
    prefetch,
};
pub use crate::media::scratch::ScratchDir;
pub use crate::media::service::{
    AudioTrack, EncodeFailure, EncodeRequest, FrameExtractionRequest, FrameExtractionResponse,
    FrameExtractor, FrameSeeker, NoSeek, VideoEncoder,
};

pub use crate::export::cancel::CancelToken;
pub use crate::export::pipeline::{
    ExportFormat, ExportOpts, ExportStats, Exporter, audio_tracks, frame_count, frame_time,
};
pub use crate::export::sink::{EncoderSink, FrameSink, GifSink, InMemorySink, SinkConfig};
