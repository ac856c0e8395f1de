use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::to_i32;
use crate::foundation::error::{FxError, FxResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphologyOperator {
    #[default]
    Erode,
    Dilate,
}

/// `feMorphology`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Morphology {
    #[serde(default)]
    pub operator: MorphologyOperator,
    #[serde(default)]
    pub radius: (f64, f64),
}

impl Morphology {
    pub fn validate(&self) -> FxResult<()> {
        let (rx, ry) = self.radius;
        if rx < 0.0 || ry < 0.0 || !rx.is_finite() || !ry.is_finite() {
            return Err(FxError::validation(format!(
                "morphology radius ({rx}, {ry}) must be finite and non-negative"
            )));
        }
        Ok(())
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Morphology,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let paffine = ctx.paffine().as_coeffs();
    let src = &*input.image;
    let (w, h) = (to_i32(src.width()), to_i32(src.height()));
    // A window wider than the surface already covers all of it.
    let kx = ((params.radius.0 * paffine[0]) as i32).clamp(0, w);
    let ky = ((params.radius.1 * paffine[3]) as i32).clamp(0, h);
    let erode = params.operator == MorphologyOperator::Erode;
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
            let (ny0, ny1) = ((y - ky).max(0), (y + ky + 1).min(h));
            for x in bounds.x0..bounds.x1 {
                let (nx0, nx1) = ((x - kx).max(0), (x + kx + 1).min(w));
                let o = x as usize * 4;
                for ch in 0..4 {
                    let mut extreme = if erode { u8::MAX } else { 0 };
                    for sy in ny0..ny1 {
                        for sx in nx0..nx1 {
                            let v = src.byte(sx, sy, ch);
                            extreme = if erode { extreme.min(v) } else { extreme.max(v) };
                        }
                    }
                    row[o + ch] = extreme;
                }
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/morphology.rs"]
mod tests;
