use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::error::FxResult;
use crate::foundation::math::clamp_f64_u8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Darken,
    Lighten,
    SoftLight,
    HardLight,
    ColorDodge,
    ColorBurn,
    Overlay,
    Exclusion,
    Difference,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    #[serde(default)]
    pub mode: BlendMode,
    #[serde(default)]
    pub in2: String,
}

impl BlendMode {
    /// Blend one colour channel. `ca`/`cb` are premultiplied channel values of the top (`in`)
    /// and bottom (`in2`) inputs, `qa`/`qb` their alphas, all in `0..=1`.
    pub fn apply(self, ca: f64, cb: f64, qa: f64, qb: f64) -> f64 {
        let bcb = (1.0 - qa) * cb + ca;
        let bca = (1.0 - qb) * ca + cb;
        match self {
            BlendMode::Normal => (1.0 - qa) * cb + ca,
            BlendMode::Multiply => (1.0 - qa) * cb + (1.0 - qb) * ca + ca * cb,
            BlendMode::Screen => cb + ca - ca * cb,
            BlendMode::Darken => ((1.0 - qa) * cb + ca).min((1.0 - qb) * ca + cb),
            BlendMode::Lighten => ((1.0 - qa) * cb + ca).max((1.0 - qb) * ca + cb),
            BlendMode::SoftLight => {
                if bcb < 0.5 {
                    2.0 * bca * bcb + bca * bca * (1.0 - 2.0 * bcb)
                } else {
                    bca.sqrt() * (2.0 * bcb - 1.0) + (2.0 * bca) * (1.0 - bcb)
                }
            }
            BlendMode::HardLight => {
                if cb < 0.5 {
                    2.0 * bca * bcb
                } else {
                    1.0 - 2.0 * (1.0 - bca) * (1.0 - bcb)
                }
            }
            BlendMode::ColorDodge => {
                if bcb == 1.0 {
                    1.0
                } else {
                    (bca / (1.0 - bcb)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if bcb == 0.0 {
                    0.0
                } else {
                    (1.0 - (1.0 - bca) / bcb).max(0.0)
                }
            }
            BlendMode::Overlay => {
                if bca < 0.5 {
                    2.0 * bca * bcb
                } else {
                    1.0 - 2.0 * (1.0 - bca) * (1.0 - bcb)
                }
            }
            BlendMode::Exclusion => bca + bcb - 2.0 * bca * bcb,
            BlendMode::Difference => (bca - bcb).abs(),
        }
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Blend,
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
    let mode = params.mode;
    let (a, b) = (&*top.image, &*bottom.image);
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
                let qa = f64::from(a.byte(x, y, map.alpha())) / 255.0;
                let qb = f64::from(b.byte(x, y, map.alpha())) / 255.0;
                let o = x as usize * 4;
                for ch in 0..3 {
                    let i = map.offset(ch);
                    let ca = f64::from(a.byte(x, y, i)) / 255.0;
                    let cb = f64::from(b.byte(x, y, i)) / 255.0;
                    row[o + i] = clamp_f64_u8(mode.apply(ca, cb, qa, qb) * 255.0);
                }
                let qr = 1.0 - (1.0 - qa) * (1.0 - qb);
                row[o + map.alpha()] = clamp_f64_u8(qr * 255.0);
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/blend.rs"]
mod tests;
