use rayon::prelude::*;

use crate::effects::composite::{CompositeOp, composite};
use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::error::FxResult;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOperator {
    #[default]
    Over,
    In,
    Out,
    Atop,
    Xor,
    Arithmetic,
}

impl CompositeOperator {
    fn porter_duff(self) -> Option<CompositeOp> {
        match self {
            CompositeOperator::Over => Some(CompositeOp::Over),
            CompositeOperator::In => Some(CompositeOp::In),
            CompositeOperator::Out => Some(CompositeOp::Out),
            CompositeOperator::Atop => Some(CompositeOp::Atop),
            CompositeOperator::Xor => Some(CompositeOp::Xor),
            CompositeOperator::Arithmetic => None,
        }
    }
}

/// `feComposite`: `in` is composited onto `in2`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Composite {
    #[serde(default)]
    pub operator: CompositeOperator,
    #[serde(default)]
    pub in2: String,
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub k3: f64,
    #[serde(default)]
    pub k4: f64,
}

/// Arithmetic coefficients in 0..255 fixed point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Arithmetic {
    k1: i64,
    k2: i64,
    k3: i64,
    k4: i64,
}

impl Arithmetic {
    pub(crate) fn new(params: &Composite) -> Self {
        let k = |v: f64| (v * 255.0) as i64;
        Self {
            k1: k(params.k1),
            k2: k(params.k2),
            k3: k(params.k3),
            k4: k(params.k4),
        }
    }

    /// Combine one pixel pair, both premultiplied logical RGBA.
    pub(crate) fn apply(self, a: [u8; 4], b: [u8; 4]) -> [u8; 4] {
        // Coefficients saturate at the i64 range; the products below saturate too.
        let term = |k: i64, v: i64| k.saturating_mul(v);
        let (qa, qb) = (i64::from(a[3]), i64::from(b[3]));
        let qr = (term(self.k1, qa * qb) / 255)
            .saturating_add(term(self.k2, qa))
            .saturating_add(term(self.k3, qb))
            / 255;
        let qr = qr.clamp(0, 255);
        let mut out = [0, 0, 0, qr as u8];
        if qr == 0 {
            return out;
        }
        for ch in 0..3 {
            let (ca, cb) = (i64::from(a[ch]), i64::from(b[ch]));
            let cr = (term(self.k1, ca * cb) / 255)
                .saturating_add(term(self.k2, ca))
                .saturating_add(term(self.k3, cb))
                .saturating_add(term(self.k4, qr))
                / 255;
            out[ch] = cr.clamp(0, qr) as u8;
        }
        out
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Composite,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(top) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bottom) = ctx.get(&params.in2)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(top.bounds)) else {
        return Ok(());
    };

    let map = ctx.channel_map();
    let (a, b) = (&*top.image, &*bottom.image);

    let out = match params.operator.porter_duff() {
        Some(op) => {
            let mut out = (*bottom.image).clone();
            for y in bounds.y0..bounds.y1 {
                for x in bounds.x0..bounds.x1 {
                    let px = composite(op, a.rgba(x, y, map), b.rgba(x, y, map));
                    out.set_rgba(x, y, map, px);
                }
            }
            out
        }
        None => {
            let k = Arithmetic::new(params);
            let mut out = ctx.new_surface()?;
            let stride = out.stride();
            out.data_mut()
                .par_chunks_mut(stride)
                .enumerate()
                .for_each(|(y, row)| {
                    let y = y as i32;
                    if y < bounds.y0 || y >= bounds.y1 {
                        return;
                    }
                    for x in bounds.x0..bounds.x1 {
                        let px = k.apply(a.rgba(x, y, map), b.rgba(x, y, map));
                        let o = x as usize * 4;
                        for (ch, v) in px.into_iter().enumerate() {
                            row[o + map.offset(ch)] = v;
                        }
                    }
                });
            out
        }
    };

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/composite.rs"]
mod tests;
