use super::*;

use crate::foundation::error::{TesseraError, TesseraResult};

struct StubFetcher;

impl AssetFetcher for StubFetcher {
    fn fetch(&self, reference: &str) -> TesseraResult<Vec<u8>> {
        match reference {
            "a.png" => Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]),
            _ => Err(TesseraError::asset_embed(format!("no such asset {reference}"))),
        }
    }
}

#[test]
fn images_are_inlined_and_failures_keep_the_reference() {
    let mut doc = Document::parse(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
            <image id="a" href="a.png"/>
            <image id="b" xlink:href="missing.png"/>
            <image id="v" href="clip.mp4"/>
            <image id="d" href="data:image/png;base64,AAAA"/>
        </svg>"#,
    )
    .unwrap();
    let report = embed_assets(&mut doc, &StubFetcher);
    assert_eq!(report.embedded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.originals.len(), 4);

    let a = doc.element_by_id("a").unwrap();
    assert!(doc.attr(a, "href").unwrap().starts_with("data:image/png;base64,"));
    assert_eq!(report.originals[&a], "a.png");
    let b = doc.element_by_id("b").unwrap();
    assert_eq!(doc.attr(b, "xlink:href"), Some("missing.png"));
    let v = doc.element_by_id("v").unwrap();
    assert_eq!(doc.attr(v, "href"), Some("clip.mp4"));
}
