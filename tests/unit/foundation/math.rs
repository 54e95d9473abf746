use super::*;

#[test]
fn fnv_distinguishes_split_points() {
    let mut a = Fnv1a64::new_default();
    a.write_str("ab");
    a.write_str("c");
    let mut b = Fnv1a64::new_default();
    b.write_str("a");
    b.write_str("bc");
    assert_ne!(a.finish(), b.finish());
}

#[test]
fn fnv_is_stable_for_same_input() {
    let mut a = Fnv1a64::new_default();
    a.write_u32(7);
    let mut b = Fnv1a64::new_default();
    b.write_u32(7);
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn mul_div255_edges() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u16(255, 128), 128);
}

#[test]
fn premultiply_zeroes_transparent_and_scales_partial() {
    let mut px = vec![200u8, 100, 50, 0, 255, 255, 255, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[0..4], &[0, 0, 0, 0]);
    assert_eq!(&px[4..8], &[128, 128, 128, 128]);
}
