use crate::foundation::core::{ChannelMap, CoordUnits, Length, Rect};
use crate::foundation::error::FxResult;
use crate::render::DrawingCtx;
use crate::render::bbox::BoundingBox;
use crate::render::rasterize;
use crate::scene::{Node, Shape};
use crate::surface::ImageBuffer;

/// A `<mask>`: its content's luminance becomes the alpha of the masked layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mask {
    #[serde(default = "default_origin")]
    pub x: Length,
    #[serde(default = "default_origin")]
    pub y: Length,
    #[serde(default = "default_extent")]
    pub width: Length,
    #[serde(default = "default_extent")]
    pub height: Length,
    #[serde(default = "default_units")]
    pub units: CoordUnits,
    #[serde(default)]
    pub content_units: CoordUnits,
    #[serde(default)]
    pub children: Vec<Node>,
}

fn default_origin() -> Length {
    Length::Percent(-0.1)
}

fn default_extent() -> Length {
    Length::Percent(1.2)
}

fn default_units() -> CoordUnits {
    CoordUnits::ObjectBoundingBox
}

impl Default for Mask {
    fn default() -> Self {
        Self {
            x: default_origin(),
            y: default_origin(),
            width: default_extent(),
            height: default_extent(),
            units: default_units(),
            content_units: CoordUnits::UserSpaceOnUse,
            children: Vec::new(),
        }
    }
}

impl Mask {
    /// Mask region in user space.
    pub fn region(&self, bbox: &BoundingBox, viewport: (f64, f64)) -> Rect {
        let (vw, vh) = match self.units {
            CoordUnits::ObjectBoundingBox => (1.0, 1.0),
            CoordUnits::UserSpaceOnUse => viewport,
        };
        let x = self.x.normalize(vw);
        let y = self.y.normalize(vh);
        let w = self.width.normalize(vw);
        let h = self.height.normalize(vh);
        match self.units {
            CoordUnits::ObjectBoundingBox => {
                let r = bbox.rect;
                let (bx, by) = (x * r.width() + r.x0, y * r.height() + r.y0);
                Rect::new(bx, by, bx + w * r.width(), by + h * r.height())
            }
            CoordUnits::UserSpaceOnUse => Rect::new(x, y, x + w, y + h),
        }
    }
}

/// Luminance of each premultiplied pixel scaled by `opacity`, as a coverage byte.
pub fn luminance_coverage(buf: &ImageBuffer, map: ChannelMap, opacity: u8) -> Vec<u8> {
    buf.data()
        .chunks_exact(4)
        .map(|px| {
            let r = u64::from(px[map.offset(0)]);
            let g = u64::from(px[map.offset(1)]);
            let b = u64::from(px[map.offset(2)]);
            (((r * 14042 + g * 47240 + b * 4769) * u64::from(opacity)) >> 24) as u8
        })
        .collect()
}

impl DrawingCtx<'_> {
    /// Render `mask` for a layer whose bounding box is `bbox` and turn it into coverage.
    pub(crate) fn mask_coverage(
        &mut self,
        mask: &Mask,
        bbox: &BoundingBox,
        opacity: u8,
    ) -> FxResult<Vec<u8>> {
        let region = mask.region(bbox, self.viewport_size());
        let (w, h) = (self.width(), self.height());
        let mut clip = vec![0u8; w as usize * h as usize];
        let area = Shape::Rect {
            x: region.x0,
            y: region.y0,
            width: region.width(),
            height: region.height(),
        };
        rasterize(&area, self.affine(), w, h, |x, y| {
            clip[y as usize * w as usize + x as usize] = 255;
        });

        let saved = self.affine();
        if mask.content_units == CoordUnits::ObjectBoundingBox {
            self.set_affine(saved * bbox.unit_transform());
        }
        self.begin_offscreen(Some(clip))?;
        let drawn = mask.children.iter().try_for_each(|c| self.draw_node(c));
        let target = self.end_offscreen();
        self.set_affine(saved);
        drawn?;

        let target = target?;
        Ok(luminance_coverage(&target, self.channel_map(), opacity))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/mask.rs"]
mod tests;
