//! Render-layer stack: discrete layers with filters, masks, clip-paths and bounding boxes.

pub mod bbox;
pub mod clip;
pub mod drawing_ctx;
pub mod mask;
pub mod state;

use crate::foundation::core::{Affine, IRect, Point};
use crate::render::bbox::invertible;
use crate::scene::Shape;

pub use drawing_ctx::DrawingCtx;
pub use state::{EnableBackground, LayerState};

/// Call `f` for every surface pixel whose centre falls inside `shape` under `affine`.
pub(crate) fn rasterize(
    shape: &Shape,
    affine: Affine,
    width: u32,
    height: u32,
    mut f: impl FnMut(i32, i32),
) {
    if !invertible(affine) {
        return;
    }
    let inv = affine.inverse();
    let dev = affine.transform_rect_bbox(shape.bounds());
    let area = IRect::new(
        dev.x0.floor() as i32,
        dev.y0.floor() as i32,
        dev.x1.ceil() as i32,
        dev.y1.ceil() as i32,
    )
    .clamp_to_size(width, height);
    for y in area.y0..area.y1 {
        for x in area.x0..area.x1 {
            let p = inv * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if shape.contains(p) {
                f(x, y);
            }
        }
    }
}
