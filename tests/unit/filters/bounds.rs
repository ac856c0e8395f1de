use crate::filters::test_support::{TestHost, solid, user_filter};
use crate::filters::{FilterContext, FilterNode, FilterPrimitive, PrimitiveKind};
use crate::filters::tile::Tile;
use crate::foundation::core::{Affine, ChannelMap, IRect, Length, Rect};
use crate::render::bbox::BoundingBox;

fn prim() -> FilterPrimitive {
    FilterPrimitive::new(PrimitiveKind::Tile(Tile {}))
}

fn check(filter: &FilterNode, bbox: BoundingBox, size: u32, f: impl FnOnce(&FilterContext<'_>)) {
    let mut host = TestHost::new(size, size);
    let ctx = FilterContext::new(
        filter,
        solid(size, size, [0; 4]).share(),
        &mut host,
        &bbox,
        ChannelMap::RGBA,
    );
    f(&ctx);
}

fn bbox(x: f64, y: f64, w: f64, h: f64) -> BoundingBox {
    BoundingBox::with_rect(Rect::new(x, y, x + w, y + h), Affine::IDENTITY)
}

#[test]
fn default_region_pads_the_bounding_box() {
    let filter = FilterNode::default();
    check(&filter, bbox(10.0, 10.0, 20.0, 20.0), 40, |ctx| {
        assert_eq!(ctx.filter_region(), IRect::new(8, 8, 32, 32));
    });
}

#[test]
fn region_is_clamped_to_surface() {
    let filter = FilterNode::default();
    check(&filter, bbox(0.0, 0.0, 10.0, 10.0), 10, |ctx| {
        assert_eq!(ctx.filter_region(), IRect::new(0, 0, 10, 10));
    });
}

#[test]
fn region_follows_element_transform() {
    let filter = user_filter(4, 4, []);
    let mut host = TestHost::new(16, 16);
    host.affine = Affine::new([2.0, 0.0, 0.0, 2.0, 3.0, 1.0]);
    let b = bbox(0.0, 0.0, 4.0, 4.0);
    let ctx = FilterContext::new(
        &filter,
        solid(16, 16, [0; 4]).share(),
        &mut host,
        &b,
        ChannelMap::RGBA,
    );
    assert_eq!(ctx.filter_region(), IRect::new(3, 1, 11, 9));
}

#[test]
fn explicit_subregion_is_intersected() {
    let filter = user_filter(10, 10, []);
    check(&filter, bbox(0.0, 0.0, 10.0, 10.0), 10, |ctx| {
        let p = prim().with_subregion(
            Some(Length::User(1.0)),
            Some(Length::User(2.0)),
            Some(Length::User(3.0)),
            Some(Length::User(20.0)),
        );
        assert_eq!(ctx.primitive_bounds(&p, None), IRect::new(1, 2, 4, 10));
    });
}

#[test]
fn unspecified_extent_uses_input_size() {
    let filter = user_filter(10, 10, []);
    check(&filter, bbox(0.0, 0.0, 10.0, 10.0), 10, |ctx| {
        let p = prim().with_subregion(Some(Length::User(2.0)), None, None, None);
        let input = IRect::new(0, 0, 3, 3);
        assert_eq!(ctx.primitive_bounds(&p, Some(input)), IRect::new(2, 0, 5, 3));
    });
}

#[test]
fn no_subregion_means_filter_region() {
    let filter = user_filter(6, 6, []);
    check(&filter, bbox(0.0, 0.0, 6.0, 6.0), 8, |ctx| {
        assert_eq!(ctx.primitive_bounds(&prim(), None), IRect::new(0, 0, 6, 6));
    });
}

#[test]
fn empty_subregion_resolves_to_nothing() {
    let filter = user_filter(6, 6, []);
    check(&filter, bbox(0.0, 0.0, 6.0, 6.0), 6, |ctx| {
        let p = prim().with_subregion(
            Some(Length::User(2.0)),
            Some(Length::User(2.0)),
            Some(Length::User(0.0)),
            Some(Length::User(2.0)),
        );
        assert!(ctx.resolve_bounds(&p, None).is_none());
    });
}

#[test]
fn percentages_in_bounding_box_units() {
    let filter = FilterNode {
        primitive_units: crate::foundation::core::CoordUnits::ObjectBoundingBox,
        ..FilterNode::default()
    };
    check(&filter, bbox(0.0, 0.0, 20.0, 20.0), 20, |ctx| {
        let p = prim().with_subregion(
            Some(Length::Percent(0.25)),
            Some(Length::User(0.5)),
            Some(Length::Percent(0.5)),
            Some(Length::User(0.25)),
        );
        assert_eq!(ctx.primitive_bounds(&p, None), IRect::new(5, 10, 15, 15));
    });
}
