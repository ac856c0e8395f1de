use crate::foundation::core::{Affine, Point, Rect};

/// A rectangle expressed in its own affine basis.
///
/// A *virgin* box has not received any geometry yet; it is the identity for both
/// [`BoundingBox::insert`] and [`BoundingBox::clip`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub rect: Rect,
    pub affine: Affine,
    pub virgin: bool,
}

impl BoundingBox {
    /// An empty (virgin) box in the basis `affine`.
    pub fn new(affine: Affine) -> Self {
        Self {
            rect: Rect::ZERO,
            affine,
            virgin: true,
        }
    }

    /// A non-virgin box holding `rect` in the basis `affine`.
    pub fn with_rect(rect: Rect, affine: Affine) -> Self {
        Self {
            rect,
            affine,
            virgin: false,
        }
    }

    /// Corners of `src.rect`, projected into this box's basis.
    fn projected_corners(&self, src: &BoundingBox) -> [Point; 4] {
        let to_self = self.affine.inverse() * src.affine;
        let r = src.rect;
        [
            to_self * Point::new(r.x0, r.y0),
            to_self * Point::new(r.x1, r.y0),
            to_self * Point::new(r.x0, r.y1),
            to_self * Point::new(r.x1, r.y1),
        ]
    }

    fn extent(points: &[Point; 4]) -> Rect {
        let mut out = Rect::from_points(points[0], points[0]);
        for p in &points[1..] {
            out = out.union_pt(*p);
        }
        out
    }

    /// Union with `src` after re-projecting it into this basis.
    pub fn insert(&mut self, src: &BoundingBox) {
        if src.virgin || !invertible(self.affine) {
            return;
        }
        let projected = Self::extent(&self.projected_corners(src));
        self.rect = if self.virgin {
            projected
        } else {
            self.rect.union(projected)
        };
        self.virgin = false;
    }

    /// Intersection with `src` after re-projecting it into this basis.
    ///
    /// Clipping a virgin box adopts the projected rectangle unchanged.
    pub fn clip(&mut self, src: &BoundingBox) {
        if src.virgin || !invertible(self.affine) {
            return;
        }
        let projected = Self::extent(&self.projected_corners(src));
        if self.virgin {
            self.rect = projected;
            self.virgin = false;
            return;
        }
        let x0 = projected.x0.max(self.rect.x0);
        let y0 = projected.y0.max(self.rect.y0);
        let x1 = projected.x1.min(self.rect.x1);
        let y1 = projected.y1.min(self.rect.y1);
        self.rect = Rect::new(x0, y0, x1, y1);
    }

    /// The transform mapping the unit square onto this box's rect.
    pub fn unit_transform(&self) -> Affine {
        Affine::new([
            self.rect.width(),
            0.0,
            0.0,
            self.rect.height(),
            self.rect.x0,
            self.rect.y0,
        ])
    }
}

pub(crate) fn invertible(a: Affine) -> bool {
    let d = a.determinant();
    d.is_finite() && d != 0.0
}

#[cfg(test)]
#[path = "../../tests/unit/render/bbox.rs"]
mod tests;
