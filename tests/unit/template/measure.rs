use super::*;

const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
  <rect id="r" x="10" y="10" width="20" height="10" stroke="#000" stroke-width="4" fill="#f00"/>
  <g id="g" transform="translate(5,0)"><rect x="0" y="0" width="10" height="10"/><image x="50" y="50" width="10" height="20"/></g>
  <text id="t" x="0" y="20" font-size="10">abcd</text>
  <g id="empty"/>
</svg>"##;

fn close(b: BoundingBox, x: f64, y: f64, w: f64, h: f64) -> bool {
    (b.x - x).abs() < 1e-3
        && (b.y - y).abs() < 1e-3
        && (b.width - w).abs() < 1e-3
        && (b.height - h).abs() < 1e-3
}

fn readiness() -> Readiness {
    Readiness {
        font_families: Vec::new(),
        timeout: Duration::from_secs(10),
    }
}

#[test]
fn computed_measurement_is_stroke_aware_on_request() {
    let doc = Document::parse(SVG).unwrap();
    let mut host = ComputedMeasurer.attach(&readiness()).unwrap();
    let r = doc.element_by_id("r").unwrap();
    assert!(close(host.measure(&doc, r, false).unwrap(), 10.0, 10.0, 20.0, 10.0));
    assert!(close(host.measure(&doc, r, true).unwrap(), 8.0, 8.0, 24.0, 14.0));
}

#[test]
fn computed_measurement_includes_own_transform_and_images() {
    let doc = Document::parse(SVG).unwrap();
    let mut host = ComputedMeasurer.attach(&readiness()).unwrap();
    let g = doc.element_by_id("g").unwrap();
    assert!(close(host.measure(&doc, g, false).unwrap(), 5.0, 0.0, 60.0, 70.0));
}

#[test]
fn computed_text_is_estimated_from_font_size() {
    let doc = Document::parse(SVG).unwrap();
    let mut host = ComputedMeasurer.attach(&readiness()).unwrap();
    let t = doc.element_by_id("t").unwrap();
    assert!(close(host.measure(&doc, t, false).unwrap(), 0.0, 12.0, 24.0, 12.0));
}

#[test]
fn empty_elements_fail_to_measure() {
    let doc = Document::parse(SVG).unwrap();
    let mut host = ComputedMeasurer.attach(&readiness()).unwrap();
    let e = doc.element_by_id("empty").unwrap();
    assert!(matches!(
        host.measure(&doc, e, false),
        Err(TesseraError::GeometryMeasurement(_))
    ));
}

#[test]
fn host_measurement_matches_geometry_for_shapes() {
    let doc = Document::parse(SVG).unwrap();
    let measurer = HostMeasurer::default().with_system_fonts(false);
    let mut host = measurer.attach(&readiness()).unwrap();
    let r = doc.element_by_id("r").unwrap();
    assert!(close(host.measure(&doc, r, false).unwrap(), 10.0, 10.0, 20.0, 10.0));
    assert!(close(host.measure(&doc, r, true).unwrap(), 8.0, 8.0, 24.0, 14.0));
    let e = doc.element_by_id("empty").unwrap();
    assert!(host.measure(&doc, e, false).is_err());
}

#[test]
fn fallback_box_sits_at_mapped_origin() {
    let b = fallback_box(Affine::translate((7.0, 9.0)), (200.0, 200.0));
    assert!(close(b, 7.0, 9.0, 200.0, 200.0));
}

static SLOW_LOADS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

fn slow_loader(_dirs: &[PathBuf], _system: bool) -> Arc<fontdb::Database> {
    SLOW_LOADS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(200));
    Arc::new(fontdb::Database::new())
}

#[test]
fn font_database_finished_after_a_timeout_is_reused() {
    let measurer = HostMeasurer {
        loader: slow_loader,
        ..HostMeasurer::default().with_system_fonts(false)
    };
    let early = measurer.fontdb(Duration::from_millis(1));
    assert!(matches!(*measurer.fonts.lock().unwrap(), FontState::Loading(_)));

    let late = measurer.fontdb(Duration::from_secs(30));
    let again = measurer.fontdb(Duration::ZERO);
    assert!(!Arc::ptr_eq(&early, &late));
    assert!(Arc::ptr_eq(&late, &again));
    assert_eq!(SLOW_LOADS.load(std::sync::atomic::Ordering::SeqCst), 1);
}
