use super::*;
use crate::filters::PrimitiveKind;
use crate::filters::test_support::{TestHost, element_bbox, solid, user_filter};
use crate::filters::evaluate_filter;
use crate::foundation::core::{ChannelMap, IRect, Length};

#[test]
fn flood_is_premultiplied() {
    let f = Flood {
        color: Color::rgb(255, 100, 0),
        opacity: 0.5,
    };
    assert_eq!(f.pixel(), [128, 50, 0, 128]);
}

#[test]
fn flood_fills_only_the_subregion() {
    let prim = FilterPrimitive::new(PrimitiveKind::Flood(Flood {
        color: Color::WHITE,
        opacity: 1.0,
    }))
    .with_subregion(
        Some(Length::User(1.0)),
        Some(Length::User(1.0)),
        Some(Length::User(2.0)),
        Some(Length::User(2.0)),
    );
    let filter = user_filter(4, 4, [prim]);
    let out = crate::filters::test_support::run(&filter, solid(4, 4, [0, 0, 0, 0]));
    for y in 0..4 {
        for x in 0..4 {
            let inside = IRect::new(1, 1, 3, 3).contains(x, y);
            let expected = if inside { [255; 4] } else { [0; 4] };
            assert_eq!(out.pixel(x, y), expected, "{x},{y}");
        }
    }
}

#[test]
fn flood_honours_channel_order() {
    let filter = user_filter(
        1,
        1,
        [FilterPrimitive::new(PrimitiveKind::Flood(Flood {
            color: Color::rgb(255, 0, 0),
            opacity: 1.0,
        }))],
    );
    let mut host = TestHost::new(1, 1);
    let out = evaluate_filter(
        &filter,
        solid(1, 1, [0; 4]).share(),
        &mut host,
        &element_bbox(1, 1),
        ChannelMap::BGRA,
    )
    .unwrap();
    assert_eq!(out.pixel(0, 0), [0, 0, 255, 255]);
}
