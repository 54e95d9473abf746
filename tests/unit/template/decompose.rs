use super::*;

const MARKUP: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 960 540">
  <rect id="bg" x="0" y="0" width="960" height="540" fill="#ffffff"/>
  <g transform="translate(10,10)">
    <rect id="box" x="10" y="20" width="100" height="50" fill="#ff0000" opacity="0.5"/>
  </g>
  <text id="title" x="100" y="200" font-size="20" font-family="'Open Sans', sans-serif" fill="#00ff00">Hello</text>
  <path id="spin" d="M0 0L10 0L10 10Z" fill="#0000ff" transform="translate(300,300) rotate(90)"/>
</svg>"##;

const ANNOTATION: &str = r#"{
  "item": {
    "bg": { "nodeName": "rect", "shapes_id": "bg", "editor_move": "false" },
    "box": { "nodeName": "rect", "shapes_id": "box" },
    "title": { "nodeName": "text", "max_length": "40" },
    "spin": { "nodeName": "path" },
    "ghost": { "nodeName": "rect" }
  },
  "font-list": { "Open Sans": ["title"] }
}"#;

fn computed() -> Decomposer {
    Decomposer::new(
        DecomposeOpts::default()
            .with_measurer(MeasurerKind::Computed)
            .with_project_duration(8.0),
    )
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn clips_are_ordered_front_most_first_and_unknown_ids_skipped() {
    let out = computed().decompose(MARKUP, ANNOTATION).unwrap();
    assert_eq!((out.canvas_width, out.canvas_height), (1920, 1080));
    assert!(approx(out.aspect_ratio, 16.0 / 9.0));
    let kinds: Vec<ClipType> = out.clips.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![ClipType::Icon, ClipType::Text, ClipType::Shape, ClipType::Shape]
    );
    assert!(out.clips.iter().all(|c| c.duration == 8.0 && c.start == 0.0));
    assert!(!out.clips[3].edit_caps.movable);
}

#[test]
fn group_transform_and_project_scale_are_flattened_into_shape_clips() {
    let out = computed().decompose(MARKUP, ANNOTATION).unwrap();
    let shape = &out.clips[2];
    assert_eq!(shape.bbox(), BoundingBox::new(40.0, 60.0, 200.0, 100.0));
    assert_eq!(shape.color, Rgba8::parse("#ff0000"));
    assert!(approx(shape.opacity, 0.5));
    assert_eq!(shape.view_box, Some(ViewBox::sized(200.0, 100.0)));
    let d = &shape.template_data[0].shape.as_ref().unwrap().d;
    assert_eq!(d, "M0 0L200 0L200 100L0 100Z");
    assert_eq!(out.clips[3].bbox(), BoundingBox::new(0.0, 0.0, 1920.0, 1080.0));
}

#[test]
fn top_level_rotation_moves_onto_the_clip() {
    let out = computed().decompose(MARKUP, ANNOTATION).unwrap();
    let icon = &out.clips[0];
    assert!(approx(icon.rotation, 90.0));
    assert!(approx(icon.x, 580.0) && approx(icon.y, 600.0), "{:?}", icon.bbox());
    assert!(approx(icon.width, 20.0) && approx(icon.height, 20.0));
    assert_eq!(icon.color, Rgba8::parse("#0000ff"));
    let src = icon.src.as_deref().unwrap();
    let (mime, svg) = crate::assets::data_uri::decode_data_uri(src).unwrap();
    assert_eq!(mime, "image/svg+xml");
    let svg = String::from_utf8(svg).unwrap();
    assert!(svg.contains(r#"d="M0 0L20 0L20 20Z""#), "{svg}");
    assert!(!svg.contains("rotate"));
}

#[test]
fn text_clips_carry_scaled_font_and_manifest_entry() {
    let out = computed().decompose(MARKUP, ANNOTATION).unwrap();
    let text = &out.clips[1];
    assert_eq!(text.text.as_deref(), Some("Hello"));
    assert_eq!(text.font_family.as_deref(), Some("Open Sans"));
    assert_eq!(text.font_size, Some(40.0));
    assert_eq!(text.color, Rgba8::parse("#00ff00"));
    assert_eq!(text.max_length, Some(40));
    assert_eq!(text.bbox(), BoundingBox::new(200.0, 368.0, 120.0, 48.0));
    assert_eq!(out.font_manifest["Open Sans"], vec![text.id.clone()]);
}

#[test]
fn decomposition_is_deterministic_modulo_ids() {
    let a = computed().decompose(MARKUP, ANNOTATION).unwrap();
    let b = computed().decompose(MARKUP, ANNOTATION).unwrap();
    assert_eq!(a.clips.len(), b.clips.len());
    for (x, y) in a.clips.iter().zip(&b.clips) {
        assert_ne!(x.id, y.id);
        assert_eq!(x.bbox(), y.bbox());
        assert_eq!(x.rotation, y.rotation);
        assert_eq!(x.template_data, y.template_data);
        assert_eq!(x.src, y.src);
    }
}

#[test]
fn wrapped_image_becomes_a_mask_clip_with_local_shape() {
    let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1920 1080">
      <defs><clipPath id="c"><circle cx="50" cy="50" r="50"/></clipPath></defs>
      <g id="photo" clip-path="url(#c)" transform="translate(100,100)">
        <image id="pic" width="100" height="100" href="data:image/png;base64,AAAA"/>
      </g>
    </svg>"#;
    let ann = r#"{ "item": { "photo": { "nodeName": "g", "image_id": "pic" } } }"#;
    let out = computed().decompose(markup, ann).unwrap();
    let clip = &out.clips[0];
    assert_eq!(clip.kind, ClipType::Mask);
    assert_eq!(clip.bbox(), BoundingBox::new(100.0, 100.0, 100.0, 100.0));
    assert_eq!(clip.src.as_deref(), Some("data:image/png;base64,AAAA"));
    assert_eq!(clip.media_type, Some(MediaType::Image));
    assert_eq!(clip.view_box, Some(ViewBox::sized(100.0, 100.0)));
    let d = &clip.template_data[0].shape.as_ref().unwrap().d;
    assert!(d.starts_with("M50 0C"), "{d}");
}

#[test]
fn dangling_clip_path_yields_mask_clip_without_shapes() {
    let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1920 1080">
      <image id="pic" width="10" height="10" clip-path="url(#missing)" href="video.mp4"/>
    </svg>"#;
    let ann = r#"{ "item": { "pic": { "nodeName": "image", "image_id": "pic" } }, "image-list": { "video.mp4": ["pic"] } }"#;
    let out = computed().decompose(markup, ann).unwrap();
    let clip = &out.clips[0];
    assert_eq!(clip.kind, ClipType::Mask);
    assert!(clip.template_data.is_empty());
    assert_eq!(clip.media_type, Some(MediaType::Video));
    assert_eq!(out.image_manifest["video.mp4"], vec![clip.id.clone()]);
}

#[test]
fn unmeasurable_elements_fall_back_to_default_size() {
    let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1920 1080"><g id="empty" transform="translate(5,6)"/></svg>"#;
    let ann = r#"{ "item": { "empty": { "nodeName": "g" } } }"#;
    let out = computed().decompose(markup, ann).unwrap();
    assert_eq!(out.clips[0].bbox(), BoundingBox::new(5.0, 6.0, 200.0, 200.0));
}

#[test]
fn broken_inputs_are_template_parse_errors() {
    let d = computed();
    assert!(matches!(d.decompose("<svg", ANNOTATION), Err(TesseraError::TemplateParse(_))));
    assert!(matches!(d.decompose(MARKUP, "[1,"), Err(TesseraError::TemplateParse(_))));
}

#[test]
fn into_project_assigns_one_track_per_clip() {
    let out = computed().decompose(MARKUP, ANNOTATION).unwrap();
    let first = out.clips[0].id.clone();
    let project = out.into_project();
    assert_eq!(project.tracks.len(), 4);
    assert!(project.tracks.iter().all(|t| t.clips.len() == 1));
    assert_eq!(project.tracks[0].clips[0].id, first);
    assert_eq!(project.duration, 8.0);
}

#[test]
fn project_matrix_scales_view_box_to_canvas_width() {
    let doc = Document::parse(r#"<svg viewBox="10 20 960 540"/>"#).unwrap();
    let m = project_matrix(&doc, Canvas { width: 1920, height: 1080 });
    let p = m * crate::foundation::core::Point::new(10.0, 20.0);
    assert_eq!((p.x, p.y), (0.0, 0.0));
    let q = m * crate::foundation::core::Point::new(970.0, 560.0);
    assert_eq!((q.x, q.y), (1920.0, 1080.0));
}

fn render_single_icon(markup: &str, node_name: &str) -> (Clip, crate::render::frame::FrameRGBA) {
    use crate::render::compositor::{Compositor, CompositorOpts};
    let annotation = format!(r#"{{ "item": {{ "ic": {{ "nodeName": "{node_name}" }} }} }}"#);
    let out = computed().decompose(markup, &annotation).unwrap();
    assert_eq!(out.clips.len(), 1);
    let clip = out.clips[0].clone();
    assert_eq!(clip.kind, ClipType::Icon);
    let snapshot = out.into_project().snapshot();
    let mut comp = Compositor::new(
        CompositorOpts::default()
            .with_background(Rgba8::WHITE)
            .with_system_fonts(false),
    );
    let frame = comp
        .render_frame_rgba(Canvas::new(1920, 1080).unwrap(), 0.0, &snapshot)
        .unwrap();
    (clip, frame)
}

#[test]
fn icons_keep_the_fill_inherited_from_their_ancestors() {
    let markup = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 960 540">
  <g fill="#00ff00"><path id="ic" d="M10 10 H110 V110 H10 Z"/></g>
</svg>"##;
    let annotation = r#"{ "item": { "ic": { "nodeName": "path" } } }"#;
    let out = computed().decompose(markup, annotation).unwrap();
    let icon = &out.clips[0];
    assert_eq!(icon.kind, ClipType::Icon);
    assert_eq!(icon.color, Rgba8::parse("#00ff00"));
    let (_, svg) = crate::assets::data_uri::decode_data_uri(icon.src.as_deref().unwrap()).unwrap();
    let svg = String::from_utf8(svg).unwrap();
    let doc = Document::parse(&svg).unwrap();
    let path = doc.element_by_id("ic").unwrap();
    assert_eq!(doc.presentation(path, "fill").as_deref(), Some("#00ff00"), "{svg}");

    let (_, frame) = render_single_icon(markup, "path");
    assert_eq!(frame.pixel(120, 120), Some([0, 255, 0, 255]));
}

#[test]
fn multi_colour_icons_are_not_flattened_to_one_colour() {
    let markup = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 960 540">
  <g id="ic">
    <rect x="0" y="0" width="50" height="50" fill="#ff0000"/>
    <rect x="50" y="0" width="50" height="50" fill="#0000ff"/>
  </g>
</svg>"##;
    let (clip, frame) = render_single_icon(markup, "g");
    assert_eq!(clip.color, None);
    assert_eq!(frame.pixel(50, 50), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(150, 50), Some([0, 0, 255, 255]));
}
