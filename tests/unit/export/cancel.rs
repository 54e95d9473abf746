use super::*;

#[test]
fn clones_share_the_flag() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(token.check().is_ok());

    clone.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(TesseraError::Cancelled)));
}

#[test]
fn cancellation_is_visible_across_threads() {
    let token = CancelToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();
    assert!(token.is_cancelled());
}
