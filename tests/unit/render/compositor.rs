use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

use crate::assets::data_uri::encode_data_uri;
use crate::assets::raster::PreparedImage;
use crate::geometry::bounds::BoundingBox;
use crate::timeline::clip::{
    CropWindow, MediaType, ShapeDescriptor, ShapeGeometry, TemplateEntry, ViewBox,
};
use crate::timeline::model::Track;

const RED: Rgba8 = Rgba8::rgb(255, 0, 0);
const BLUE: Rgba8 = Rgba8::rgb(0, 0, 255);

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(w, h).unwrap()
}

fn compositor() -> Compositor {
    Compositor::new(CompositorOpts::default().with_system_fonts(false))
}

fn rect_clip(id: &str, color: Rgba8, bbox: BoundingBox) -> Clip {
    let mut c = Clip::new(id, ClipType::Shape, 0.0, 5.0, bbox);
    c.shape = Some("rect".to_string());
    c.color = Some(color);
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

fn solid(w: u32, h: u32, px: [u8; 4]) -> PreparedImage {
    PreparedImage::from_premul(w, h, px.repeat((w * h) as usize)).unwrap()
}

fn png_uri(img: image::RgbaImage) -> String {
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    encode_data_uri("image/png", &out.into_inner())
}

fn red_blue_uri() -> String {
    png_uri(image::RgbaImage::from_fn(20, 20, |x, _| {
        if x < 10 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 255, 255])
        }
    }))
}

fn render(
    comp: &mut Compositor,
    w: u32,
    h: u32,
    t: f64,
    snap: &TimelineSnapshot,
) -> (Surface, FrameOutcome) {
    let mut surface = Surface::new(canvas(w, h)).unwrap();
    let outcome = comp.render_frame(&mut surface, t, snap, None, None);
    (surface, outcome)
}

struct RecordingSeeker {
    calls: AtomicUsize,
    times: Mutex<Vec<f64>>,
}

impl RecordingSeeker {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            times: Mutex::new(Vec::new()),
        }
    }
}

impl FrameSeeker for RecordingSeeker {
    fn seek(&self, _src: &str, source_time: f64) -> TesseraResult<PreparedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.times.lock().unwrap().push(source_time);
        Ok(solid(2, 2, [0, 255, 0, 255]))
    }
}

fn video_clip() -> Clip {
    let mut c = Clip::new("v", ClipType::Mask, 0.0, 10.0, BoundingBox::new(0.0, 0.0, 8.0, 8.0));
    c.src = Some("clip.mp4".to_string());
    c.media_type = Some(MediaType::Video);
    c.media_start = 2.0;
    c
}

#[test]
fn background_fills_an_empty_frame() {
    let mut comp = Compositor::new(
        CompositorOpts::default()
            .with_background(Rgba8::rgb(10, 20, 30))
            .with_system_fonts(false),
    );
    let (surface, outcome) = render(&mut comp, 4, 4, 0.0, &snapshot(vec![]));
    assert_eq!(outcome, FrameOutcome::default());
    assert_eq!(surface.pixel(3, 3), Some([10, 20, 30, 255]));
}

#[test]
fn lower_track_index_draws_on_top() {
    let full = BoundingBox::new(0.0, 0.0, 16.0, 16.0);
    let snap = snapshot(vec![rect_clip("front", RED, full), rect_clip("back", BLUE, full)]);
    let mut comp = compositor();

    let (surface, outcome) = render(&mut comp, 16, 16, 2.0, &snap);
    assert_eq!(outcome.drawn, 2);
    assert_eq!(surface.pixel(8, 8), Some([255, 0, 0, 255]));

    let (after, outcome) = render(&mut comp, 16, 16, 5.0, &snap);
    assert_eq!(outcome.drawn, 0);
    assert_eq!(after.pixel(8, 8), Some([0, 0, 0, 255]));
}

#[test]
fn mask_shape_matrix_scales_view_box_to_the_clip_box() {
    let bbox = BoundingBox::new(30.0, 40.0, 200.0, 100.0);
    let mut c = Clip::new("m", ClipType::Mask, 0.0, 1.0, bbox);
    c.view_box = Some(ViewBox::sized(100.0, 100.0));
    assert_eq!(mask_shape_matrix(&c).as_coeffs(), [2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    c.view_box = Some(ViewBox {
        x: 10.0,
        y: 20.0,
        width: 50.0,
        height: 50.0,
    });
    assert_eq!(mask_shape_matrix(&c).as_coeffs(), [4.0, 0.0, 0.0, 2.0, -40.0, -40.0]);

    c.view_box = None;
    assert_eq!(mask_shape_matrix(&c), Affine::IDENTITY);
}

#[test]
fn video_clip_seeks_to_the_source_timestamp() {
    let seeker = Arc::new(RecordingSeeker::new());
    let mut comp = compositor().with_seeker(seeker.clone());
    let snap = snapshot(vec![video_clip()]);

    let (surface, outcome) = render(&mut comp, 8, 8, 3.0, &snap);
    assert_eq!(outcome.drawn, 1);
    assert_eq!(*seeker.times.lock().unwrap(), vec![5.0]);
    assert_eq!(surface.pixel(4, 4), Some([0, 255, 0, 255]));

    // Same source time again is served from the seek cache.
    render(&mut comp, 8, 8, 3.0, &snap);
    assert_eq!(seeker.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn prefetched_frame_skips_the_seeker() {
    let seeker = Arc::new(RecordingSeeker::new());
    let mut comp = compositor().with_seeker(seeker.clone());
    let snap = snapshot(vec![video_clip()]);

    let mut cache = VideoFrameCache::new();
    cache.insert("clip.mp4", 90, 5.0, Arc::new(solid(2, 2, [0, 0, 255, 255])));

    let mut surface = Surface::new(canvas(8, 8)).unwrap();
    let outcome = comp.render_frame(&mut surface, 3.0, &snap, Some(90), Some(&cache));
    assert_eq!(outcome.drawn, 1);
    assert_eq!(seeker.calls.load(Ordering::SeqCst), 0);
    assert_eq!(surface.pixel(4, 4), Some([0, 0, 255, 255]));
}

#[test]
fn failing_clip_is_skipped_and_the_frame_continues() {
    let bbox = BoundingBox::new(0.0, 0.0, 8.0, 8.0);
    let mut broken = Clip::new("icon", ClipType::Icon, 0.0, 5.0, bbox);
    broken.src = Some("does/not/exist.svg".to_string());
    let snap = snapshot(vec![broken, rect_clip("ok", RED, BoundingBox::new(0.0, 0.0, 8.0, 8.0))]);

    let (surface, outcome) = render(&mut compositor(), 8, 8, 1.0, &snap);
    assert_eq!(outcome, FrameOutcome { drawn: 1, skipped: 1 });
    assert_eq!(surface.pixel(4, 4), Some([255, 0, 0, 255]));
}

#[test]
fn text_without_any_font_is_skipped() {
    let mut text = Clip::new("t", ClipType::Text, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 8.0, 8.0));
    text.text = Some("Hello".to_string());
    let (_, outcome) = render(&mut compositor(), 8, 8, 1.0, &snapshot(vec![text]));
    assert_eq!(outcome, FrameOutcome { drawn: 0, skipped: 1 });
}

#[test]
fn audio_clips_are_never_drawn() {
    let mut audio = Clip::new("a", ClipType::Audio, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 8.0, 8.0));
    audio.src = Some("music.mp3".to_string());
    let (surface, outcome) = render(&mut compositor(), 8, 8, 1.0, &snapshot(vec![audio]));
    assert_eq!(outcome, FrameOutcome::default());
    assert_eq!(surface.pixel(4, 4), Some([0, 0, 0, 255]));
}

#[test]
fn mask_shapes_clip_the_content() {
    let mut c = Clip::new("m", ClipType::Mask, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    c.src = Some(png_uri(image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))));
    c.view_box = Some(ViewBox::sized(100.0, 100.0));
    c.template_data = vec![TemplateEntry {
        element_id: "half".to_string(),
        shape: Some(ShapeDescriptor {
            geometry: ShapeGeometry::Path,
            d: "M0 0L50 0L50 100L0 100Z".to_string(),
            sides: None,
        }),
        overrides: None,
    }];

    let (surface, outcome) = render(&mut compositor(), 20, 20, 1.0, &snapshot(vec![c]));
    assert_eq!(outcome.drawn, 1);
    assert_eq!(surface.pixel(3, 10), Some([255, 0, 0, 255]));
    assert_eq!(surface.pixel(16, 10), Some([0, 0, 0, 255]));
}

#[test]
fn elliptical_crop_hides_the_corners() {
    let mut c = Clip::new("m", ClipType::Mask, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    c.src = Some(png_uri(image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]))));
    c.crop = Some(CropWindow {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
        shape: CropShape::Ellipse,
        corner_radius: 0.0,
    });

    let (surface, _) = render(&mut compositor(), 20, 20, 1.0, &snapshot(vec![c]));
    assert_eq!(surface.pixel(10, 10), Some([255, 0, 0, 255]));
    assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(surface.pixel(19, 19), Some([0, 0, 0, 255]));
}

#[test]
fn crop_window_zooms_into_the_selected_region() {
    let mut c = Clip::new("m", ClipType::Mask, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    c.src = Some(red_blue_uri());
    // Right half only: the blue column fills the box.
    c.crop = Some(CropWindow {
        x: 50.0,
        y: 0.0,
        width: 50.0,
        height: 100.0,
        shape: CropShape::Rect,
        corner_radius: 0.0,
    });

    let (surface, _) = render(&mut compositor(), 20, 20, 1.0, &snapshot(vec![c]));
    assert_eq!(surface.pixel(2, 10), Some([0, 0, 255, 255]));
    assert_eq!(surface.pixel(17, 10), Some([0, 0, 255, 255]));
}

#[test]
fn horizontal_flip_mirrors_about_the_box_center() {
    let mut c = Clip::new("m", ClipType::Mask, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    c.src = Some(red_blue_uri());

    let snap = snapshot(vec![c.clone()]);
    let (plain, _) = render(&mut compositor(), 20, 20, 1.0, &snap);
    assert_eq!(plain.pixel(2, 10), Some([255, 0, 0, 255]));

    c.flip_h = true;
    let (flipped, _) = render(&mut compositor(), 20, 20, 1.0, &snapshot(vec![c]));
    assert_eq!(flipped.pixel(2, 10), Some([0, 0, 255, 255]));
    assert_eq!(flipped.pixel(17, 10), Some([255, 0, 0, 255]));
}

#[test]
fn rotation_pivots_around_the_clip_center() {
    let mut bar = rect_clip("bar", RED, BoundingBox::new(0.0, 8.0, 20.0, 4.0));
    bar.rotation = 90.0;
    let (surface, _) = render(&mut compositor(), 20, 20, 1.0, &snapshot(vec![bar]));
    assert_eq!(surface.pixel(10, 2), Some([255, 0, 0, 255]));
    assert_eq!(surface.pixel(10, 17), Some([255, 0, 0, 255]));
    assert_eq!(surface.pixel(2, 10), Some([0, 0, 0, 255]));
}

#[test]
fn clip_opacity_blends_with_what_is_below() {
    let mut c = rect_clip("half", RED, BoundingBox::new(0.0, 0.0, 4.0, 4.0));
    c.opacity = 0.5;
    let (surface, _) = render(&mut compositor(), 4, 4, 1.0, &snapshot(vec![c]));
    let [r, g, b, a] = surface.pixel(2, 2).unwrap();
    assert!((126..=129).contains(&r), "r = {r}");
    assert_eq!((g, b, a), (0, 0, 255));
}

#[test]
fn icon_is_recolored_to_the_clip_color() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect width="10" height="10" fill="#000000"/></svg>"##;
    let mut c = Clip::new("i", ClipType::Icon, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
    c.src = Some(encode_data_uri("image/svg+xml", svg.as_bytes()));
    c.color = Some(Rgba8::rgb(0, 255, 0));

    let mut comp = Compositor::new(
        CompositorOpts::default()
            .with_background(Rgba8::WHITE)
            .with_system_fonts(false),
    );
    let (surface, outcome) = render(&mut comp, 10, 10, 1.0, &snapshot(vec![c]));
    assert_eq!(outcome.drawn, 1);
    assert_eq!(surface.pixel(5, 5), Some([0, 255, 0, 255]));
}

#[test]
fn shape_descriptor_without_primitive_is_filled_through_the_view_box() {
    let mut c = Clip::new("s", ClipType::Shape, 0.0, 5.0, BoundingBox::new(0.0, 0.0, 20.0, 10.0));
    c.color = Some(BLUE);
    c.view_box = Some(ViewBox::sized(10.0, 10.0));
    c.template_data = vec![TemplateEntry {
        element_id: "tri".to_string(),
        shape: Some(ShapeDescriptor {
            geometry: ShapeGeometry::Path,
            d: "M0 0L5 0L5 10L0 10Z".to_string(),
            sides: None,
        }),
        overrides: None,
    }];
    let (surface, _) = render(&mut compositor(), 20, 10, 1.0, &snapshot(vec![c]));
    assert_eq!(surface.pixel(5, 5), Some([0, 0, 255, 255]));
    assert_eq!(surface.pixel(15, 5), Some([0, 0, 0, 255]));
}

#[test]
fn render_frame_rgba_matches_the_canvas() {
    let snap = snapshot(vec![rect_clip("r", RED, BoundingBox::new(0.0, 0.0, 3.0, 2.0))]);
    let frame = compositor()
        .render_frame_rgba(canvas(3, 2), 0.5, &snap)
        .unwrap();
    assert_eq!((frame.width, frame.height), (3, 2));
    assert!(frame.premultiplied);
    assert_eq!(frame.pixel(1, 1), Some([255, 0, 0, 255]));
}
