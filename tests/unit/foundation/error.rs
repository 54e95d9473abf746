use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TesseraError::template_parse("x")
            .to_string()
            .contains("template parse error:")
    );
    assert!(
        TesseraError::unresolved("x")
            .to_string()
            .contains("unresolved reference:")
    );
    assert!(
        TesseraError::asset_embed("x")
            .to_string()
            .contains("asset embed error:")
    );
    assert!(
        TesseraError::measurement("x")
            .to_string()
            .contains("geometry measurement error:")
    );
    assert!(TesseraError::draw("x").to_string().contains("draw error:"));
    assert!(
        TesseraError::collaborator("x")
            .to_string()
            .contains("collaborator error:")
    );
    assert!(
        TesseraError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert_eq!(TesseraError::Cancelled.to_string(), "operation cancelled");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TesseraError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
