use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::Channel;
use crate::foundation::error::FxResult;

/// `feDisplacementMap`: `in` is resampled at positions perturbed by channels of `in2`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DisplacementMap {
    #[serde(default)]
    pub in2: String,
    #[serde(default)]
    pub scale: f64,
    #[serde(default = "default_x_channel")]
    pub x_channel_selector: Channel,
    #[serde(default = "default_y_channel")]
    pub y_channel_selector: Channel,
}

fn default_x_channel() -> Channel {
    Channel::R
}

fn default_y_channel() -> Channel {
    Channel::G
}

impl Default for DisplacementMap {
    fn default() -> Self {
        Self {
            in2: String::new(),
            scale: 0.0,
            x_channel_selector: default_x_channel(),
            y_channel_selector: default_y_channel(),
        }
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &DisplacementMap,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(map_input) = ctx.get(&params.in2)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let map = ctx.channel_map();
    let paffine = ctx.paffine().as_coeffs();
    let sx = params.scale * paffine[0];
    let sy = params.scale * paffine[3];
    let xch = map.of(params.x_channel_selector);
    let ych = map.of(params.y_channel_selector);
    let (src, disp) = (&*input.image, &*map_input.image);
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
                let ox = f64::from(x) + sx * (f64::from(disp.byte(x, y, xch)) / 255.0 - 0.5);
                let oy = f64::from(y) + sy * (f64::from(disp.byte(x, y, ych)) / 255.0 - 0.5);
                let o = x as usize * 4;
                for ch in 0..4 {
                    row[o + ch] = src.sample_bilinear(ox, oy, ch, bounds);
                }
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/displacement_map.rs"]
mod tests;
