use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::{ChannelMap, IRect};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::{clamp_f64_u8, premul_trunc, unpremul_trunc, wrap_index};
use crate::surface::ImageBuffer;

const MAX_ORDER: u32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMode {
    #[default]
    Duplicate,
    Wrap,
    None,
}

/// `feConvolveMatrix`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConvolveMatrix {
    #[serde(default = "default_order")]
    pub order: (u32, u32),
    /// Row-major, `order.0 * order.1` entries.
    #[serde(default)]
    pub kernel_matrix: Vec<f64>,
    /// `None` or zero means the kernel sum (or 1 when that is zero).
    #[serde(default)]
    pub divisor: Option<f64>,
    /// Added after division, in unit scale.
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub target_x: Option<u32>,
    #[serde(default)]
    pub target_y: Option<u32>,
    #[serde(default)]
    pub edge_mode: EdgeMode,
    #[serde(default)]
    pub kernel_unit_length: Option<(f64, f64)>,
    #[serde(default)]
    pub preserve_alpha: bool,
}

fn default_order() -> (u32, u32) {
    (3, 3)
}

impl Default for ConvolveMatrix {
    fn default() -> Self {
        Self {
            order: default_order(),
            kernel_matrix: Vec::new(),
            divisor: None,
            bias: 0.0,
            target_x: None,
            target_y: None,
            edge_mode: EdgeMode::default(),
            kernel_unit_length: None,
            preserve_alpha: false,
        }
    }
}

impl ConvolveMatrix {
    pub fn validate(&self) -> FxResult<()> {
        let (ox, oy) = self.order;
        if !(1..=MAX_ORDER).contains(&ox) || !(1..=MAX_ORDER).contains(&oy) {
            return Err(FxError::validation(format!(
                "kernel order {ox}x{oy} outside 1..={MAX_ORDER}"
            )));
        }
        let expected = (ox * oy) as usize;
        if self.kernel_matrix.len() != expected {
            return Err(FxError::validation(format!(
                "kernel matrix has {} values, order {ox}x{oy} needs {expected}",
                self.kernel_matrix.len()
            )));
        }
        if self.target_x.is_some_and(|t| t >= ox) || self.target_y.is_some_and(|t| t >= oy) {
            return Err(FxError::validation("kernel target outside the kernel"));
        }
        Ok(())
    }

    fn target(&self) -> (u32, u32) {
        (
            self.target_x.unwrap_or(self.order.0 / 2),
            self.target_y.unwrap_or(self.order.1 / 2),
        )
    }

    pub fn effective_divisor(&self) -> f64 {
        match self.divisor {
            Some(d) if d != 0.0 => d,
            _ => {
                let sum: f64 = self.kernel_matrix.iter().sum();
                if sum == 0.0 { 1.0 } else { sum }
            }
        }
    }
}

fn edge_sample(mode: EdgeMode, v: i32, lo: i32, hi: i32) -> Option<i32> {
    if (lo..hi).contains(&v) {
        return Some(v);
    }
    match mode {
        EdgeMode::Duplicate => Some(v.clamp(lo, hi - 1)),
        EdgeMode::Wrap => Some(lo + wrap_index(v - lo, hi - lo)),
        EdgeMode::None => None,
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &ConvolveMatrix,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    if let Err(err) = params.validate() {
        tracing::debug!(error = %err, "convolve matrix skipped");
        return Ok(());
    }
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let paffine = ctx.paffine().as_coeffs();
    let (tx, ty) = params.target();
    let target_x = f64::from(tx) * paffine[0];
    let target_y = f64::from(ty) * paffine[3];
    let (dx, dy) = match params.kernel_unit_length {
        Some((kx, ky)) if kx != 0.0 || ky != 0.0 => (kx * paffine[0], ky * paffine[3]),
        _ => (1.0, 1.0),
    };

    let kernel = Kernel {
        order: (params.order.0 as i32, params.order.1 as i32),
        matrix: &params.kernel_matrix,
        divisor: params.effective_divisor(),
        bias: params.bias * 255.0,
        edge_mode: params.edge_mode,
        target: (target_x, target_y),
        step: (dx, dy),
    };
    let channels = if params.preserve_alpha { 3 } else { 4 };
    let map = ctx.channel_map();
    let src = &*input.image;
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
                let mut px = [0u8; 4];
                for (ch, slot) in px.iter_mut().enumerate().take(channels) {
                    *slot = kernel.apply(src, bounds, x, y, ch, map);
                }
                if params.preserve_alpha {
                    px[3] = src.byte(x, y, map.alpha());
                }
                let o = x as usize * 4;
                for ch in 0..3 {
                    row[o + map.offset(ch)] = premul_trunc(px[ch], px[3]);
                }
                row[o + map.alpha()] = px[3];
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

struct Kernel<'a> {
    order: (i32, i32),
    matrix: &'a [f64],
    divisor: f64,
    bias: f64,
    edge_mode: EdgeMode,
    target: (f64, f64),
    step: (f64, f64),
}

impl Kernel<'_> {
    /// Straight-alpha result for logical channel `ch` at `(x, y)`.
    fn apply(
        &self,
        src: &ImageBuffer,
        bounds: IRect,
        x: i32,
        y: i32,
        ch: usize,
        map: ChannelMap,
    ) -> u8 {
        let (ox, oy) = self.order;
        let mut sum = 0.0;
        for i in 0..oy {
            for j in 0..ox {
                let sx = (f64::from(x) - self.target.0 + f64::from(j) * self.step.0) as i32;
                let sy = (f64::from(y) - self.target.1 + f64::from(i) * self.step.1) as i32;
                let (Some(sx), Some(sy)) = (
                    edge_sample(self.edge_mode, sx, bounds.x0, bounds.x1),
                    edge_sample(self.edge_mode, sy, bounds.y0, bounds.y1),
                ) else {
                    continue;
                };
                let alpha = src.byte(sx, sy, map.alpha());
                let sval = match (ch, alpha) {
                    (3, _) => i32::from(alpha),
                    (_, 0) => 0,
                    _ => unpremul_trunc(src.byte(sx, sy, map.offset(ch)), alpha).min(255),
                };
                let k = self.matrix[((ox - j - 1) + (oy - i - 1) * ox) as usize];
                sum += f64::from(sval) * k;
            }
        }
        clamp_f64_u8(sum / self.divisor + self.bias)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/convolve_matrix.rs"]
mod tests;
