//! Coordinate resolution: filter region and primitive subregions in device pixels.

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::{Affine, CoordUnits, IRect, Rect};
use crate::render::bbox::BoundingBox;

impl FilterContext<'_> {
    /// Reference viewport for percentages: unit square for objectBoundingBox.
    fn units_viewport(&self, units: CoordUnits) -> (f64, f64) {
        match units {
            CoordUnits::ObjectBoundingBox => (1.0, 1.0),
            CoordUnits::UserSpaceOnUse => self.viewport,
        }
    }

    /// The filter region in device space, before clamping to the surface.
    fn filter_region_rect(&self) -> Rect {
        let (vw, vh) = self.units_viewport(self.filter.filter_units);
        let x = self.filter.x.normalize(vw);
        let y = self.filter.y.normalize(vh);
        let w = self.filter.width.normalize(vw);
        let h = self.filter.height.normalize(vh);

        let mut device = BoundingBox::new(Affine::IDENTITY);
        device.insert(&BoundingBox::with_rect(
            Rect::new(x, y, x + w, y + h),
            self.affine,
        ));
        device.rect
    }

    fn surface_box(&self) -> BoundingBox {
        BoundingBox::with_rect(
            Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height())),
            Affine::IDENTITY,
        )
    }

    /// Filter region clamped to the surface.
    pub fn filter_region(&self) -> IRect {
        let mut b = BoundingBox::with_rect(self.filter_region_rect(), Affine::IDENTITY);
        b.clip(&self.surface_box());
        IRect::from_rect_trunc(b.rect)
    }

    /// Effective region of `p`: filter region ∩ primitive subregion ∩ surface.
    ///
    /// Unspecified `x`/`y` fall back to the filter region's edges, unspecified
    /// `width`/`height` to the size of `input` (or of the filter region when the primitive
    /// has no input).
    pub fn primitive_bounds(&self, p: &FilterPrimitive, input: Option<IRect>) -> IRect {
        let region = self.filter_region_rect();
        let mut b = BoundingBox::with_rect(region, Affine::IDENTITY);

        if p.has_subregion() {
            let (vw, vh) = self.units_viewport(self.filter.primitive_units);
            let x = p.x.map_or(0.0, |l| l.normalize(vw));
            let y = p.y.map_or(0.0, |l| l.normalize(vh));
            let w = p.width.map_or(0.0, |l| l.normalize(vw));
            let h = p.height.map_or(0.0, |l| l.normalize(vh));

            let mut specified = BoundingBox::new(Affine::IDENTITY);
            specified.insert(&BoundingBox::with_rect(
                Rect::new(x, y, x + w, y + h),
                self.paffine,
            ));
            let dev = specified.rect;

            let natural = input.unwrap_or_else(|| self.filter_region());
            let mut sub = dev;
            if p.x.is_none() {
                sub.x0 = region.x0;
            }
            if p.y.is_none() {
                sub.y0 = region.y0;
            }
            sub.x1 = match p.width {
                None => sub.x0 + f64::from(natural.width()),
                Some(_) => sub.x0 + dev.width(),
            };
            sub.y1 = match p.height {
                None => sub.y0 + f64::from(natural.height()),
                Some(_) => sub.y0 + dev.height(),
            };
            b.clip(&BoundingBox::with_rect(sub, Affine::IDENTITY));
        }

        b.clip(&self.surface_box());
        IRect::from_rect_trunc(b.rect)
    }

    /// [`Self::primitive_bounds`], or `None` (with a diagnostic) when it is empty.
    pub(crate) fn resolve_bounds(
        &self,
        p: &FilterPrimitive,
        input: Option<IRect>,
    ) -> Option<IRect> {
        let bounds = self.primitive_bounds(p, input);
        if bounds.is_empty() {
            tracing::debug!(result = %p.result, "empty primitive region");
            return None;
        }
        Some(bounds)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/bounds.rs"]
mod tests;
