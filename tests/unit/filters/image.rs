use super::*;
use crate::filters::PrimitiveKind;
use crate::filters::test_support::{TestHost, run_with, solid, user_filter};
use crate::foundation::core::Length;

fn image_prim(href: &str) -> FilterPrimitive {
    FilterPrimitive::new(PrimitiveKind::Image(Image { href: href.into() }))
}

#[test]
fn scene_node_is_rendered_and_clipped_to_subregion() {
    let mut host = TestHost::new(4, 4);
    host.nodes.insert("#dot".into(), [0, 0, 200, 200]);
    let prim = image_prim("#dot").with_subregion(
        Some(Length::User(2.0)),
        Some(Length::User(0.0)),
        Some(Length::User(2.0)),
        Some(Length::User(4.0)),
    );
    let out = run_with(&user_filter(4, 4, [prim]), solid(4, 4, [0; 4]), &mut host);
    assert_eq!(out.pixel(3, 1), [0, 0, 200, 200]);
    assert_eq!(out.pixel(1, 1), [0; 4]);
}

#[test]
fn external_raster_is_stretched_and_premultiplied() {
    let mut host = TestHost::new(4, 4);
    let raster = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 128]));
    host.images.insert("tex.png".into(), raster);
    let out = run_with(
        &user_filter(4, 4, [image_prim("tex.png")]),
        solid(4, 4, [0; 4]),
        &mut host,
    );
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(out.pixel(x, y), [128, 0, 0, 128], "{x},{y}");
        }
    }
}

#[test]
fn scene_node_takes_precedence_over_raster() {
    let mut host = TestHost::new(2, 2);
    host.nodes.insert("both".into(), [9, 9, 9, 9]);
    host.images.insert(
        "both".into(),
        image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4])),
    );
    let out = run_with(&user_filter(2, 2, [image_prim("both")]), solid(2, 2, [0; 4]), &mut host);
    assert_eq!(out.pixel(0, 0), [9, 9, 9, 9]);
}

#[test]
fn unknown_reference_produces_nothing() {
    let mut host = TestHost::new(2, 2);
    let src = solid(2, 2, [1, 2, 3, 4]);
    let out = run_with(&user_filter(2, 2, [image_prim("missing")]), src.clone(), &mut host);
    assert_eq!(out.data(), src.data());
}
