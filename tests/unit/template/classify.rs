use super::*;

const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <defs><clipPath id="cp"><rect id="cr" width="1" height="1"/></clipPath></defs>
  <text id="t">hi</text>
  <image id="img" width="10" height="10"/>
  <g id="wrap"><image id="inner" width="10" height="10"/></g>
  <rect id="r" width="5" height="5"/>
  <g id="art"><path d="M0 0L1 1"/></g>
</svg>"#;

fn kind(doc: &Document, id: &str, item: AnnotationItem) -> Option<ClipType> {
    classify(doc, doc.element_by_id(id).unwrap(), id, &item)
}

#[test]
fn classification_follows_node_kind_and_flags() {
    let doc = Document::parse(SVG).unwrap();
    let with_image = |v: &str| AnnotationItem {
        image_id: Some(v.into()),
        ..AnnotationItem::default()
    };
    let with_shape = |v: &str| AnnotationItem {
        shapes_id: Some(v.into()),
        ..AnnotationItem::default()
    };

    assert_eq!(kind(&doc, "t", AnnotationItem::default()), Some(ClipType::Text));
    assert_eq!(kind(&doc, "img", with_image("img")), Some(ClipType::Mask));
    assert_eq!(kind(&doc, "img", AnnotationItem::default()), Some(ClipType::Icon));
    assert_eq!(kind(&doc, "wrap", with_image("inner")), Some(ClipType::Mask));
    assert_eq!(kind(&doc, "r", with_shape("r")), Some(ClipType::Shape));
    assert_eq!(kind(&doc, "r", with_shape("other")), Some(ClipType::Icon));
    assert_eq!(kind(&doc, "art", AnnotationItem::default()), Some(ClipType::Icon));
}

#[test]
fn non_rendering_elements_are_not_clips() {
    let doc = Document::parse(SVG).unwrap();
    assert_eq!(kind(&doc, "cp", AnnotationItem::default()), None);
}
