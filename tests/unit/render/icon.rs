use super::*;

const ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24">
  <path id="body" d="M0 0L24 0L24 24Z" style="fill:#123456;stroke:#000000"/>
  <g fill="none">
    <circle id="ring" cx="12" cy="12" r="6" stroke="#ff0000"/>
  </g>
  <rect id="hole" x="1" y="1" width="2" height="2" fill="none"/>
  <text id="label" x="2" y="20">old</text>
</svg>"##;

fn entry(id: &str, overrides: ElementOverride) -> TemplateEntry {
    TemplateEntry {
        element_id: id.to_string(),
        shape: None,
        overrides: Some(overrides),
    }
}

#[test]
fn recolor_paints_filled_elements_and_keeps_unfilled_ones() {
    let mut doc = Document::parse(ICON).unwrap();
    recolor(&mut doc, Rgba8::rgb(0, 255, 0));

    let body = doc.element_by_id("body").unwrap();
    assert_eq!(doc.attr(body, "fill"), Some("#00ff00"));
    assert_eq!(doc.style_property(body, "fill"), None);
    assert_eq!(doc.style_property(body, "stroke").as_deref(), Some("#000000"));

    let label = doc.element_by_id("label").unwrap();
    assert_eq!(doc.attr(label, "fill"), Some("#00ff00"));

    let ring = doc.element_by_id("ring").unwrap();
    assert_eq!(doc.attr(ring, "fill"), None);
    let hole = doc.element_by_id("hole").unwrap();
    assert_eq!(doc.attr(hole, "fill"), Some("none"));
}

#[test]
fn overrides_apply_to_the_named_elements() {
    let entries = vec![
        entry(
            "label",
            ElementOverride {
                text: Some("new".to_string()),
                ..ElementOverride::default()
            },
        ),
        entry(
            "ring",
            ElementOverride {
                stroke: Some(Rgba8::rgb(0, 0, 255)),
                opacity: Some(1.5),
                ..ElementOverride::default()
            },
        ),
        entry(
            "ghost",
            ElementOverride {
                fill: Some(Rgba8::WHITE),
                ..ElementOverride::default()
            },
        ),
    ];
    let out = prepare_icon_markup(ICON, None, &entries).unwrap();
    let doc = Document::parse(&out).unwrap();

    let label = doc.element_by_id("label").unwrap();
    assert_eq!(doc.text_content(label), "new");
    let ring = doc.element_by_id("ring").unwrap();
    assert_eq!(doc.attr(ring, "stroke"), Some("#0000ff"));
    assert_eq!(doc.attr(ring, "opacity"), Some("1"));
    let body = doc.element_by_id("body").unwrap();
    assert_eq!(doc.style_property(body, "fill").as_deref(), Some("#123456"));
}

#[test]
fn overrides_win_over_the_clip_color() {
    let entries = vec![entry(
        "body",
        ElementOverride {
            fill: Some(Rgba8::rgb(255, 0, 0)),
            ..ElementOverride::default()
        },
    )];
    let out = prepare_icon_markup(ICON, Some(Rgba8::rgb(0, 255, 0)), &entries).unwrap();
    let doc = Document::parse(&out).unwrap();
    let body = doc.element_by_id("body").unwrap();
    assert_eq!(doc.attr(body, "fill"), Some("#ff0000"));
    let label = doc.element_by_id("label").unwrap();
    assert_eq!(doc.attr(label, "fill"), Some("#00ff00"));
}

#[test]
fn malformed_icon_markup_is_a_draw_error() {
    let err = prepare_icon_markup("<svg", None, &[]).unwrap_err();
    assert!(matches!(err, TesseraError::Draw(_)));
}
