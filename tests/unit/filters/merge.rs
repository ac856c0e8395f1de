use super::*;
use crate::effects::composite::over;
use crate::filters::PrimitiveKind;
use crate::filters::flood::Flood;
use crate::filters::test_support::{pattern, run, solid, user_filter};
use crate::foundation::core::Color;

fn flood(color: Color, opacity: f64, result: &str) -> FilterPrimitive {
    FilterPrimitive::new(PrimitiveKind::Flood(Flood { color, opacity })).with_result(result)
}

fn merge(inputs: &[&str]) -> FilterPrimitive {
    FilterPrimitive::new(PrimitiveKind::Merge(Merge {
        nodes: inputs.iter().map(|i| MergeNode::new(*i)).collect(),
    }))
}

#[test]
fn merge_equals_iterated_source_over() {
    let src = pattern(4, 4);
    let filter = user_filter(
        4,
        4,
        [
            flood(Color::rgb(0, 0, 255), 0.5, "blue"),
            merge(&["SourceGraphic", "blue"]),
        ],
    );
    let out = run(&filter, src.clone());
    let blue = Flood {
        color: Color::rgb(0, 0, 255),
        opacity: 0.5,
    }
    .pixel();
    for y in 0..4 {
        for x in 0..4 {
            let expected = over(over([0; 4], src.pixel(x, y), 1.0), blue, 1.0);
            assert_eq!(out.pixel(x, y), expected);
        }
    }
}

#[test]
fn merge_order_matters() {
    let red = flood(Color::rgb(255, 0, 0), 1.0, "red");
    let green = flood(Color::rgb(0, 255, 0), 1.0, "green");
    let a = run(
        &user_filter(2, 2, [red.clone(), green.clone(), merge(&["red", "green"])]),
        solid(2, 2, [0; 4]),
    );
    let b = run(
        &user_filter(2, 2, [red, green, merge(&["green", "red"])]),
        solid(2, 2, [0; 4]),
    );
    assert_eq!(a.pixel(0, 0), [0, 255, 0, 255]);
    assert_eq!(b.pixel(0, 0), [255, 0, 0, 255]);
}

#[test]
fn unresolved_nodes_are_skipped() {
    let filter = user_filter(
        2,
        2,
        [
            flood(Color::WHITE, 1.0, "white"),
            merge(&["missing", "white"]),
        ],
    );
    let out = run(&filter, solid(2, 2, [0; 4]));
    assert_eq!(out.pixel(1, 1), [255; 4]);
}

#[test]
fn empty_merge_is_transparent() {
    let out = run(&user_filter(2, 2, [merge(&[])]), solid(2, 2, [9; 4]));
    assert_eq!(out.pixel(0, 0), [0; 4]);
}
