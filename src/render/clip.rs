use crate::foundation::core::{Affine, CoordUnits};
use crate::foundation::math::mul_div255_u8;
use crate::render::DrawingCtx;
use crate::render::bbox::BoundingBox;
use crate::render::rasterize;
use crate::scene::{Node, NodeKind};

/// A `<clipPath>`: its shapes are rendered as coverage only.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipPath {
    #[serde(default)]
    pub units: CoordUnits,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Multiply `b` into `a`; `None` means full coverage.
pub(crate) fn intersect_coverage(a: Option<Vec<u8>>, b: Vec<u8>) -> Vec<u8> {
    match a {
        None => b,
        Some(mut a) => {
            for (x, y) in a.iter_mut().zip(&b) {
                *x = mul_div255_u8(u16::from(*x), u16::from(*y));
            }
            a
        }
    }
}

impl DrawingCtx<'_> {
    /// One coverage byte per pixel for `clip` under the current transform.
    ///
    /// `bbox` anchors objectBoundingBox units and is otherwise ignored. Layer bounding boxes
    /// are not touched.
    pub(crate) fn clip_coverage(&self, clip: &ClipPath, bbox: &BoundingBox) -> Vec<u8> {
        let (w, h) = (self.width(), self.height());
        let mut coverage = vec![0u8; w as usize * h as usize];
        let affine = match clip.units {
            CoordUnits::ObjectBoundingBox => self.affine() * bbox.unit_transform(),
            CoordUnits::UserSpaceOnUse => self.affine(),
        };
        for child in &clip.children {
            accumulate(&mut coverage, child, affine, w, h);
        }
        coverage
    }
}

fn accumulate(coverage: &mut [u8], node: &Node, affine: Affine, width: u32, height: u32) {
    let affine = affine * node.transform;
    match &node.kind {
        NodeKind::Group { children } => {
            for child in children {
                accumulate(coverage, child, affine, width, height);
            }
        }
        NodeKind::Shape { shape, .. } => {
            rasterize(shape, affine, width, height, |x, y| {
                coverage[y as usize * width as usize + x as usize] = 255;
            });
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/clip.rs"]
mod tests;
