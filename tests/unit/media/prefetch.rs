use std::sync::Mutex;

use super::*;

use crate::assets::data_uri::encode_data_uri;
use crate::geometry::bounds::BoundingBox;
use crate::media::service::FrameExtractionResponse;
use crate::timeline::clip::{Clip, ClipType, MediaType};
use crate::timeline::model::Track;

fn video(id: &str, src: &str, start: f64, duration: f64, media_start: f64) -> Clip {
    let bbox = BoundingBox::new(0.0, 0.0, 4.0, 4.0);
    let mut c = Clip::new(id, ClipType::Mask, start, duration, bbox);
    c.src = Some(src.to_string());
    c.media_type = Some(MediaType::Video);
    c.media_start = media_start;
    c
}

fn snapshot(clips: Vec<Clip>) -> TimelineSnapshot {
    TimelineSnapshot::new(
        clips
            .into_iter()
            .enumerate()
            .map(|(i, c)| Track::single(format!("t{i}"), c))
            .collect(),
    )
}

fn png_uri() -> String {
    let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([9, 9, 9, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    encode_data_uri("image/png", &out.into_inner())
}

#[derive(Default)]
struct StubExtractor {
    requests: Mutex<Vec<FrameExtractionRequest>>,
    short_for: Option<&'static str>,
    fail_for: Option<&'static str>,
}

impl FrameExtractor for StubExtractor {
    fn extract(&self, request: &FrameExtractionRequest) -> TesseraResult<FrameExtractionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if Some(request.video_path.as_str()) == self.fail_for {
            return Err(TesseraError::collaborator("service unavailable"));
        }
        let mut n = request.sorted_timestamps().len();
        if Some(request.video_path.as_str()) == self.short_for {
            n -= 1;
        }
        Ok(FrameExtractionResponse {
            images: (0..n).map(|_| png_uri()).collect(),
        })
    }
}

#[test]
fn time_key_rounds_to_milliseconds() {
    assert_eq!(time_key(1.2344), 1234);
    assert_eq!(time_key(1.2346), 1235);
    assert_eq!(time_key(-0.5), 0);
}

#[test]
fn plan_records_distinct_timestamps_and_their_frames() {
    let snap = snapshot(vec![
        video("a", "clip.mp4", 1.0, 1.0, 2.0),
        video("b", "clip.mp4", 1.0, 1.0, 2.0),
    ]);
    let plan = PrefetchPlan::build(&snap, 4, 12);
    let sp = &plan.sources["clip.mp4"];
    assert_eq!(
        sp.timestamps_ms.iter().copied().collect::<Vec<_>>(),
        vec![2000, 2250, 2500, 2750]
    );
    assert_eq!(sp.uses.len(), 8);
    assert!(sp.uses.contains(&(4, 2000)));
    assert!(sp.uses.contains(&(7, 2750)));
    assert_eq!(plan.timestamp_count(), 4);
}

#[test]
fn plan_ignores_stills_and_zero_fps() {
    let mut still = video("s", "photo.png", 0.0, 1.0, 0.0);
    still.media_type = Some(MediaType::Image);
    let snap = snapshot(vec![still, video("v", "clip.mp4", 0.0, 1.0, 0.0)]);
    assert_eq!(PrefetchPlan::build(&snap, 0, 10), PrefetchPlan::default());

    let plan = PrefetchPlan::build(&snap, 2, 2);
    assert_eq!(plan.sources.keys().collect::<Vec<_>>(), vec!["clip.mp4"]);
}

#[test]
fn timestamps_are_requested_in_batches() {
    let snap = snapshot(vec![video("v", "clip.mp4", 0.0, 1.0, 0.0)]);
    let plan = PrefetchPlan::build(&snap, 5, 5);
    let extractor = StubExtractor::default();

    let (cache, report) = prefetch(&plan, &extractor, 5, 2, &CancelToken::new()).unwrap();
    assert_eq!(report.requests, 3);
    assert_eq!(report.frames, 5);
    assert!(report.failed_sources.is_empty());
    assert_eq!(cache.len(), 5);
    assert!(cache.get("clip.mp4", 3, 0.6).is_some());
    assert!(cache.get("clip.mp4", 3, 0.8).is_none());

    let requests = extractor.requests.lock().unwrap();
    assert_eq!(requests[0].timestamps, vec![0.0, 0.2]);
    assert_eq!(requests[2].timestamps, vec![0.8]);
    assert_eq!(requests[0].fps, 5.0);
}

#[test]
fn failing_sources_are_isolated() {
    let snap = snapshot(vec![
        video("a", "bad.mp4", 0.0, 1.0, 0.0),
        video("b", "good.mp4", 0.0, 1.0, 0.0),
        video("c", "short.mp4", 0.0, 1.0, 0.0),
    ]);
    let plan = PrefetchPlan::build(&snap, 2, 2);
    let extractor = StubExtractor {
        fail_for: Some("bad.mp4"),
        short_for: Some("short.mp4"),
        ..StubExtractor::default()
    };

    let (cache, report) = prefetch(&plan, &extractor, 2, 8, &CancelToken::new()).unwrap();
    assert_eq!(report.failed_sources, vec!["bad.mp4".to_string(), "short.mp4".to_string()]);
    assert_eq!(cache.len(), 2);
    assert!(cache.get("good.mp4", 1, 0.5).is_some());
    assert!(cache.get("bad.mp4", 0, 0.0).is_none());
}

#[test]
fn cancellation_aborts_the_prefetch() {
    let snap = snapshot(vec![video("v", "clip.mp4", 0.0, 1.0, 0.0)]);
    let plan = PrefetchPlan::build(&snap, 2, 2);
    let extractor = StubExtractor::default();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = prefetch(&plan, &extractor, 2, 8, &cancel).unwrap_err();
    assert!(matches!(err, TesseraError::Cancelled));
    assert!(extractor.requests.lock().unwrap().is_empty());
}
