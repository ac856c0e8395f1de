use super::*;
use crate::filters::PrimitiveKind;
use crate::filters::test_support::{pattern, run, solid, user_filter};

fn func(channel: Channel, function: TransferFunction) -> FuncNode {
    FuncNode { channel, function }
}

fn transfer(functions: Vec<FuncNode>, src: crate::surface::ImageBuffer) -> crate::surface::SharedImage {
    let (w, h) = (src.width(), src.height());
    let filter = user_filter(
        w,
        h,
        [FilterPrimitive::new(PrimitiveKind::ComponentTransfer(
            ComponentTransfer { functions },
        ))],
    );
    run(&filter, src)
}

#[test]
fn no_functions_keeps_opaque_pixels() {
    let src = solid(2, 2, [10, 20, 30, 255]);
    let out = transfer(Vec::new(), src);
    assert_eq!(out.pixel(1, 0), [10, 20, 30, 255]);
}

#[test]
fn linear_inverts_red() {
    let out = transfer(
        vec![func(
            Channel::R,
            TransferFunction::Linear {
                slope: -1.0,
                intercept: 1.0,
            },
        )],
        solid(1, 1, [55, 0, 0, 255]),
    );
    assert_eq!(out.pixel(0, 0)[0], 200);
}

#[test]
fn last_function_for_a_channel_wins() {
    let out = transfer(
        vec![
            func(Channel::G, TransferFunction::Discrete { values: vec![1.0] }),
            func(Channel::G, TransferFunction::Discrete { values: vec![0.0] }),
        ],
        solid(1, 1, [0, 128, 0, 255]),
    );
    assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
}

#[test]
fn table_interpolates_between_levels() {
    let table = ScaledFunction::from(&TransferFunction::Table {
        values: vec![0.0, 1.0],
    });
    assert_eq!(table.eval(0), 0);
    assert_eq!(table.eval(128), 128);
    assert_eq!(table.eval(255), 255);
}

#[test]
fn discrete_steps() {
    let discrete = ScaledFunction::from(&TransferFunction::Discrete {
        values: vec![0.0, 0.5, 1.0],
    });
    assert_eq!(discrete.eval(0), 0);
    assert_eq!(discrete.eval(100), 127);
    assert_eq!(discrete.eval(255), 255);
}

#[test]
fn integer_gamma_uses_fixed_point_power() {
    let gamma = ScaledFunction::from(&TransferFunction::Gamma {
        amplitude: 1.0,
        exponent: 2.0,
        offset: 0.0,
    });
    assert_eq!(gamma.eval(255), 255);
    assert_eq!(gamma.eval(128), fixpow(128, 2));
    assert_eq!(fixpow(128, 2), 64);
}

#[test]
fn alpha_function_rescales_premultiplied_colour() {
    let out = transfer(
        vec![func(
            Channel::A,
            TransferFunction::Linear {
                slope: 0.0,
                intercept: 0.5,
            },
        )],
        solid(1, 1, [255, 255, 255, 255]),
    );
    assert_eq!(out.pixel(0, 0), [127, 127, 127, 127]);
}

#[test]
fn oversized_table_fails_validation() {
    let params = ComponentTransfer {
        functions: vec![func(
            Channel::B,
            TransferFunction::Table {
                values: vec![0.0; 300],
            },
        )],
    };
    assert!(params.validate().is_err());
    assert!(ComponentTransfer::default().validate().is_ok());
}

#[test]
fn identity_on_pattern_is_stable_for_alpha() {
    let src = pattern(6, 6);
    let out = transfer(vec![func(Channel::A, TransferFunction::Identity)], src.clone());
    for y in 0..6 {
        for x in 0..6 {
            assert_eq!(out.pixel(x, y)[3], src.pixel(x, y)[3]);
        }
    }
}

#[test]
fn fixpow_settles_for_huge_exponents() {
    assert_eq!(fixpow(255, i32::MAX), 255);
    assert_eq!(fixpow(254, i32::MAX), 0);
    assert_eq!(fixpow(0, 1_000_000_000), 0);
    assert_eq!(fixpow(128, -3), 255);

    let gamma = ScaledFunction::from(&TransferFunction::Gamma {
        amplitude: 1.0,
        exponent: 1e9,
        offset: 0.0,
    });
    assert_eq!(gamma.eval(255), 255);
    assert_eq!(gamma.eval(200), 0);
}

#[test]
fn huge_amplitudes_saturate() {
    let out = transfer(
        vec![
            func(
                Channel::R,
                TransferFunction::Gamma {
                    amplitude: 1e9,
                    exponent: 1.0,
                    offset: 0.0,
                },
            ),
            func(
                Channel::G,
                TransferFunction::Linear {
                    slope: -1e12,
                    intercept: 0.0,
                },
            ),
        ],
        solid(1, 1, [255, 255, 255, 255]),
    );
    assert_eq!(out.pixel(0, 0), [255, 0, 255, 255]);
}

#[test]
fn fractional_gamma_adds_offset_before_truncating() {
    let gamma = ScaledFunction::from(&TransferFunction::Gamma {
        amplitude: -0.5,
        exponent: 0.5,
        offset: 0.5,
    });
    // -127 * (64/255)^0.5 + 127 = 63.38
    assert_eq!(gamma.eval(64), 63);
}
