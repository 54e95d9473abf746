use super::*;

fn clip() -> Clip {
    Clip::new("c1", ClipType::Shape, 1.0, 2.0, BoundingBox::new(10.0, 20.0, 100.0, 50.0))
}

#[test]
fn active_window_is_half_open() {
    let c = clip();
    assert!(!c.is_active_at(0.999));
    assert!(c.is_active_at(1.0));
    assert!(c.is_active_at(2.999));
    assert!(!c.is_active_at(3.0));
}

#[test]
fn source_time_offsets_by_media_start() {
    let mut c = Clip::new("v", ClipType::Mask, 0.0, 10.0, BoundingBox::ZERO);
    c.media_start = 2.0;
    assert_eq!(c.source_time(3.0), 5.0);
}

#[test]
fn validation_rejects_broken_invariants() {
    assert!(clip().validate().is_ok());

    let mut c = clip();
    c.duration = 0.0;
    assert!(c.validate().is_err());

    let mut c = clip();
    c.width = -1.0;
    assert!(c.validate().is_err());

    let mut c = clip();
    c.opacity = 1.5;
    assert!(c.validate().is_err());

    let mut c = clip();
    c.id = " ".to_string();
    assert!(c.validate().is_err());
}

#[test]
fn json_uses_camel_case_and_type_tag() {
    let mut c = clip();
    c.media_start = 1.5;
    c.view_box = Some(ViewBox::sized(100.0, 100.0));
    c.template_data.push(TemplateEntry {
        element_id: "m1".to_string(),
        shape: Some(ShapeDescriptor {
            geometry: ShapeGeometry::Circle {
                cx: 5.0,
                cy: 5.0,
                r: 5.0,
            },
            d: "M0 0Z".to_string(),
            sides: None,
        }),
        overrides: None,
    });
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["type"], "shape");
    assert_eq!(v["mediaStart"], 1.5);
    assert_eq!(v["viewBox"], "0 0 100 100");
    assert_eq!(v["templateData"][0]["elementId"], "m1");
    assert_eq!(v["templateData"][0]["shape"]["kind"], "circle");
    assert_eq!(v["flipH"], false);

    let back: Clip = serde_json::from_value(v).unwrap();
    assert_eq!(back, c);
}

#[test]
fn view_box_parsing() {
    assert_eq!(
        ViewBox::parse("0,0 10 20"),
        Some(ViewBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 20.0
        })
    );
    assert_eq!(ViewBox::parse("0 0 0 10"), None);
    assert_eq!(ViewBox::parse("0 0 10"), None);
}

#[test]
fn media_type_from_extension() {
    assert_eq!(MediaType::from_path("clips/intro.MP4"), MediaType::Video);
    assert_eq!(MediaType::from_path("https://x/y.webm?sig=1"), MediaType::Video);
    assert_eq!(MediaType::from_path("a.png"), MediaType::Image);
    assert_eq!(MediaType::from_path("song.mp3"), MediaType::Audio);
}

#[test]
fn full_crop_window_detection() {
    let full = CropWindow {
        x: 0.0,
        y: 0.0,
        width: 100.0,
        height: 100.0,
        shape: CropShape::Rect,
        corner_radius: 0.0,
    };
    assert!(full.is_full());
    assert!(!CropWindow { x: 10.0, ..full }.is_full());
    assert!(!CropWindow { shape: CropShape::Ellipse, ..full }.is_full());
}

#[test]
fn video_detection_prefers_declared_media_type() {
    let mut c = clip();
    assert!(!c.is_video());
    c.src = Some("intro.mp4".to_string());
    assert!(c.is_video());
    c.media_type = Some(MediaType::Image);
    assert!(!c.is_video());
    c.media_type = None;
    c.src = Some("data:video/webm;base64,AAAA".to_string());
    assert!(c.is_video());
}
