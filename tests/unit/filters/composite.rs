use super::*;
use crate::filters::PrimitiveKind;
use crate::filters::test_support::{TestHost, run_with, solid, user_filter};
use crate::surface::ImageBuffer;

fn composite_onto(params: Composite, top: ImageBuffer, bottom: ImageBuffer) -> crate::surface::SharedImage {
    let (w, h) = (top.width(), top.height());
    let mut host = TestHost::new(w, h);
    host.background = Some(bottom);
    let filter = user_filter(
        w,
        h,
        [FilterPrimitive::new(PrimitiveKind::Composite(Composite {
            in2: "BackgroundImage".into(),
            ..params
        }))
        .with_input("SourceGraphic")],
    );
    run_with(&filter, top, &mut host)
}

#[test]
fn over_with_opaque_top_replaces_bottom() {
    let out = composite_onto(
        Composite::default(),
        solid(2, 2, [200, 0, 0, 255]),
        solid(2, 2, [0, 0, 200, 255]),
    );
    assert_eq!(out.pixel(0, 0), [200, 0, 0, 255]);
}

#[test]
fn in_keeps_top_where_bottom_is_opaque() {
    let mut bottom = solid(2, 1, [0, 0, 0, 0]);
    bottom.set_pixel(1, 0, [0, 0, 0, 255]);
    let out = composite_onto(
        Composite {
            operator: CompositeOperator::In,
            ..Composite::default()
        },
        solid(2, 1, [10, 20, 30, 255]),
        bottom,
    );
    assert_eq!(out.pixel(0, 0), [0, 0, 0, 0]);
    assert_eq!(out.pixel(1, 0), [10, 20, 30, 255]);
}

#[test]
fn arithmetic_k2_copies_top() {
    let k = Arithmetic::new(&Composite {
        operator: CompositeOperator::Arithmetic,
        k2: 1.0,
        ..Composite::default()
    });
    assert_eq!(k.apply([10, 20, 30, 255], [90, 90, 90, 255]), [10, 20, 30, 255]);
}

#[test]
fn arithmetic_clamps_colour_to_alpha() {
    let k = Arithmetic::new(&Composite {
        operator: CompositeOperator::Arithmetic,
        k2: 0.5,
        k4: 1.0,
        ..Composite::default()
    });
    let out = k.apply([200, 0, 0, 200], [0, 0, 0, 0]);
    assert_eq!(out[3], 99);
    assert!(out[..3].iter().all(|&c| c <= out[3]));
}

#[test]
fn arithmetic_with_zero_alpha_is_transparent() {
    let k = Arithmetic::new(&Composite {
        operator: CompositeOperator::Arithmetic,
        k4: 1.0,
        ..Composite::default()
    });
    assert_eq!(k.apply([50, 50, 50, 0], [50, 50, 50, 0]), [0, 0, 0, 0]);
}

#[test]
fn arithmetic_sum_saturates() {
    let out = composite_onto(
        Composite {
            operator: CompositeOperator::Arithmetic,
            k2: 1.0,
            k3: 1.0,
            ..Composite::default()
        },
        solid(1, 1, [200, 10, 0, 255]),
        solid(1, 1, [200, 10, 0, 255]),
    );
    assert_eq!(out.pixel(0, 0), [255, 20, 0, 255]);
}

#[test]
fn arithmetic_large_k1_saturates_to_white() {
    let k = Arithmetic::new(&Composite {
        operator: CompositeOperator::Arithmetic,
        k1: 200.0,
        ..Composite::default()
    });
    assert_eq!(k.apply([10, 20, 30, 255], [100, 100, 100, 255]), [255, 255, 255, 255]);
    assert_eq!(k.apply([0, 0, 0, 255], [100, 100, 100, 255]), [0, 0, 0, 255]);

    let k = Arithmetic::new(&Composite {
        operator: CompositeOperator::Arithmetic,
        k1: -200.0,
        ..Composite::default()
    });
    assert_eq!(k.apply([10, 20, 30, 255], [100, 100, 100, 255]), [0, 0, 0, 0]);
}

#[test]
fn arithmetic_extreme_coefficients_render() {
    let out = composite_onto(
        Composite {
            operator: CompositeOperator::Arithmetic,
            k1: 1e300,
            k2: -1e300,
            k3: 1e300,
            k4: 1e300,
            ..Composite::default()
        },
        solid(2, 2, [10, 20, 30, 255]),
        solid(2, 2, [100, 100, 100, 255]),
    );
    assert_eq!(out.pixel(1, 1)[3], 255);
    assert!(out.pixel(1, 1)[..3].iter().all(|&c| c == 255));
}
