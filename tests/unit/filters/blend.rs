use super::*;
use crate::filters::PrimitiveKind;
use crate::filters::test_support::{pattern, run, solid, user_filter};
use crate::surface::ImageBuffer;

const ALL_MODES: [BlendMode; 12] = [
    BlendMode::Normal,
    BlendMode::Multiply,
    BlendMode::Screen,
    BlendMode::Darken,
    BlendMode::Lighten,
    BlendMode::SoftLight,
    BlendMode::HardLight,
    BlendMode::ColorDodge,
    BlendMode::ColorBurn,
    BlendMode::Overlay,
    BlendMode::Exclusion,
    BlendMode::Difference,
];

fn blend_over(mode: BlendMode, top: &ImageBuffer, bottom: ImageBuffer) -> crate::surface::SharedImage {
    let (w, h) = (top.width(), top.height());
    let mut bg = crate::filters::test_support::TestHost::new(w, h);
    bg.background = Some(bottom);
    let filter = user_filter(
        w,
        h,
        [FilterPrimitive::new(PrimitiveKind::Blend(Blend {
            mode,
            in2: "BackgroundImage".into(),
        }))
        .with_input("SourceGraphic")],
    );
    crate::filters::test_support::run_with(&filter, top.clone(), &mut bg)
}

#[test]
fn alpha_is_union_for_every_mode() {
    let (w, h) = (8u32, 8u32);
    let top = pattern(w, h);
    let mut bottom = pattern(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let px = top.pixel((x + 3) % w as i32, (y + 5) % h as i32);
            bottom.set_pixel(x, y, px);
        }
    }

    for mode in ALL_MODES {
        let out = blend_over(mode, &top, bottom.clone());
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let qa = f64::from(top.pixel(x, y)[3]) / 255.0;
                let qb = f64::from(bottom.pixel(x, y)[3]) / 255.0;
                let expected = ((1.0 - (1.0 - qa) * (1.0 - qb)) * 255.0) as u8;
                assert_eq!(out.pixel(x, y)[3], expected, "{mode:?} at {x},{y}");
            }
        }
    }
}

#[test]
fn normal_with_opaque_top_is_top() {
    let top = solid(2, 2, [10, 200, 30, 255]);
    let out = blend_over(BlendMode::Normal, &top, solid(2, 2, [0, 0, 255, 255]));
    assert_eq!(out.pixel(1, 1), [10, 200, 30, 255]);
}

#[test]
fn multiply_of_white_and_color_keeps_color() {
    let top = solid(1, 1, [255, 255, 255, 255]);
    let out = blend_over(BlendMode::Multiply, &top, solid(1, 1, [40, 80, 120, 255]));
    assert_eq!(out.pixel(0, 0), [40, 80, 120, 255]);
}

#[test]
fn difference_of_equal_inputs_is_black() {
    let px = [90, 20, 200, 255];
    let out = blend_over(BlendMode::Difference, &solid(1, 1, px), solid(1, 1, px));
    assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
}

#[test]
fn missing_second_input_leaves_last_result() {
    let src = solid(2, 2, [5, 5, 5, 5]);
    let filter = user_filter(
        2,
        2,
        [FilterPrimitive::new(PrimitiveKind::Blend(Blend {
            mode: BlendMode::Screen,
            in2: "nowhere".into(),
        }))],
    );
    let out = run(&filter, src);
    assert_eq!(out.pixel(0, 0), [5, 5, 5, 5]);
}
