use super::*;
use crate::filters::PrimitiveKind;
use crate::filters::test_support::{TestHost, element_bbox, pattern, run, user_filter};
use crate::filters::evaluate_filter;
use crate::foundation::core::{Affine, ChannelMap};
use crate::surface::ImageBuffer;

fn shift(dx: f64, dy: f64) -> crate::filters::FilterNode {
    user_filter(
        4,
        4,
        [FilterPrimitive::new(PrimitiveKind::Offset(Offset { dx, dy }))],
    )
}

#[test]
fn shifts_right_and_down() {
    let src = pattern(4, 4);
    let out = run(&shift(1.0, 2.0), src.clone());
    assert_eq!(out.pixel(1, 2), src.pixel(0, 0));
    assert_eq!(out.pixel(3, 3), src.pixel(2, 1));
    assert_eq!(out.pixel(0, 0), [0; 4]);
}

#[test]
fn fractional_offsets_truncate() {
    let src = pattern(4, 4);
    let out = run(&shift(0.9, -0.9), src.clone());
    assert_eq!(out.data(), src.data());
}

#[test]
fn offset_is_scaled_by_primitive_transform() {
    let src = pattern(4, 4);
    let mut host = TestHost::new(4, 4);
    host.affine = Affine::scale(2.0);
    let mut filter = shift(1.0, 0.0);
    filter.width = crate::foundation::core::Length::User(2.0);
    filter.height = crate::foundation::core::Length::User(2.0);
    let out = evaluate_filter(
        &filter,
        src.clone().share(),
        &mut host,
        &element_bbox(4, 4),
        ChannelMap::RGBA,
    )
    .unwrap();
    assert_eq!(out.pixel(2, 0), src.pixel(0, 0));
    assert_eq!(out.pixel(1, 0), [0; 4]);
}

#[test]
fn offset_past_the_region_leaves_transparent() {
    let src = ImageBuffer::new(4, 4).unwrap();
    let out = run(&shift(10.0, 0.0), pattern(4, 4));
    assert_eq!(out.data(), src.data());
}

#[test]
fn huge_offsets_leave_transparent() {
    let empty = ImageBuffer::new(4, 4).unwrap();
    for (dx, dy) in [(-1e10, 0.0), (1e10, 0.0), (0.0, -1e10), (1e10, 1e10)] {
        let out = run(&shift(dx, dy), pattern(4, 4));
        assert_eq!(out.data(), empty.data(), "({dx}, {dy})");
    }
}

#[test]
fn offset_by_the_full_width_is_clear() {
    let empty = ImageBuffer::new(4, 4).unwrap();
    let out = run(&shift(-4.0, 0.0), pattern(4, 4));
    assert_eq!(out.data(), empty.data());
    let out = run(&shift(-3.0, 0.0), pattern(4, 4));
    assert_eq!(out.pixel(0, 1), pattern(4, 4).pixel(3, 1));
}
