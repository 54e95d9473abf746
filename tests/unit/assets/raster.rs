use std::io::Cursor;

use super::*;

#[test]
fn decode_image_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let prepared = decode_image(&buf).unwrap();
    assert_eq!((prepared.width, prepared.height), (1, 1));
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn parse_svg_ok_and_err() {
    let opts = usvg::Options::default();
    let ok = br#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"></svg>"#;
    parse_svg(ok, &opts).unwrap();
    assert!(parse_svg(br#"<svg"#, &opts).is_err());
}

#[test]
fn rasterize_fills_box_with_svg_content() {
    let opts = usvg::Options::default();
    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;
    let tree = parse_svg(svg, &opts).unwrap();
    let img = rasterize_svg_to_premul_rgba8(&tree, 20, 8).unwrap();
    assert_eq!((img.width, img.height), (20, 8));
    let center = ((4 * 20 + 10) * 4) as usize;
    assert_eq!(&img.rgba8_premul[center..center + 4], &[255, 0, 0, 255]);
}

#[test]
fn raster_params_scale_with_transform() {
    let opts = usvg::Options::default();
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5"></svg>"#;
    let tree = parse_svg(svg, &opts).unwrap();
    let (w, h, adjust) = svg_raster_params(&tree, Affine::scale(3.0)).unwrap();
    assert_eq!((w, h), (30, 15));
    let [a, _, _, d, _, _] = adjust.as_coeffs();
    assert!((a - 1.0).abs() < 1e-9 && (d - 1.0).abs() < 1e-9);
}

#[test]
fn oversized_and_mismatched_buffers_are_rejected() {
    let opts = usvg::Options::default();
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;
    let tree = parse_svg(svg, &opts).unwrap();
    assert!(rasterize_svg_to_premul_rgba8(&tree, MAX_RASTER_DIM + 1, 1).is_err());
    assert!(PreparedImage::from_premul(2, 2, vec![0; 15]).is_err());
}
