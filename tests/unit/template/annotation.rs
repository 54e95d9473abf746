use super::*;

#[test]
fn lenient_flags_accept_strings_and_booleans() {
    let json = r#"{
        "item": {
            "a": { "nodeName": "rect", "editor_move": "false", "editor_scale": true,
                   "editor_rotate": "nonsense", "attr_rock": "true", "max_length": "12" },
            "b": { "nodeName": "text", "max_length": 30 }
        },
        "font-list": { "Roboto": ["b"] },
        "image-list": { "img/a.png": ["a"] }
    }"#;
    let ann = Annotation::from_json(json).unwrap();

    let a = &ann.item["a"];
    assert_eq!(
        a.edit_caps(),
        EditCaps {
            movable: false,
            scalable: true,
            rotatable: true,
            locked: true
        }
    );
    assert_eq!(a.max_length(), Some(12));
    assert_eq!(ann.item["b"].max_length(), Some(30));
    assert_eq!(ann.item["b"].edit_caps(), EditCaps::default());
    assert_eq!(ann.font_list["Roboto"], vec!["b".to_string()]);
    assert_eq!(ann.image_list["img/a.png"], vec!["a".to_string()]);
}

#[test]
fn blank_ids_are_treated_as_absent() {
    let item = AnnotationItem {
        image_id: Some("  ".into()),
        shapes_id: Some("s1".into()),
        ..AnnotationItem::default()
    };
    assert_eq!(item.image_id(), None);
    assert_eq!(item.shapes_id(), Some("s1"));
}

#[test]
fn malformed_annotation_is_a_template_parse_error() {
    assert!(matches!(
        Annotation::from_json("{ not json"),
        Err(TesseraError::TemplateParse(_))
    ));
    assert!(Annotation::from_json("{}").unwrap().item.is_empty());
}

#[test]
fn category_presets() {
    assert_eq!(TargetCategory::Landscape.canvas(), Canvas { width: 1920, height: 1080 });
    assert_eq!(TargetCategory::Portrait.canvas(), Canvas { width: 1080, height: 1920 });
    assert_eq!(TargetCategory::Square.canvas(), Canvas { width: 1080, height: 1080 });
    assert!((TargetCategory::Portrait.aspect_ratio() - 9.0 / 16.0).abs() < 1e-12);
    assert_eq!("SQUARE".parse::<TargetCategory>().unwrap(), TargetCategory::Square);
    assert_eq!("16:9".parse::<TargetCategory>().unwrap(), TargetCategory::Landscape);
    assert!("wide".parse::<TargetCategory>().is_err());
}
