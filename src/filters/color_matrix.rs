use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::clamp_u8;

/// Luminance weights shared by `saturate`, `hueRotate` and `luminanceToAlpha`.
pub const LUMA: [f64; 3] = [0.2125, 0.7154, 0.0721];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMatrixKind {
    #[default]
    Matrix,
    Saturate,
    HueRotate,
    LuminanceToAlpha,
}

/// `feColorMatrix`. `values` is read according to `kind`: 20 row-major entries for
/// `matrix`, one saturation factor for `saturate`, one angle in degrees for `hue_rotate`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorMatrix {
    #[serde(default)]
    pub kind: ColorMatrixKind,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl ColorMatrix {
    pub fn matrix(values: impl Into<Vec<f64>>) -> Self {
        Self {
            kind: ColorMatrixKind::Matrix,
            values: values.into(),
        }
    }

    pub fn saturate(s: f64) -> Self {
        Self {
            kind: ColorMatrixKind::Saturate,
            values: vec![s],
        }
    }

    pub fn hue_rotate(degrees: f64) -> Self {
        Self {
            kind: ColorMatrixKind::HueRotate,
            values: vec![degrees],
        }
    }

    pub fn luminance_to_alpha() -> Self {
        Self {
            kind: ColorMatrixKind::LuminanceToAlpha,
            values: Vec::new(),
        }
    }

    pub fn validate(&self) -> FxResult<()> {
        match self.kind {
            ColorMatrixKind::Matrix if self.values.len() != 20 => Err(FxError::validation(
                format!("color matrix needs 20 values, got {}", self.values.len()),
            )),
            ColorMatrixKind::Saturate | ColorMatrixKind::HueRotate if self.values.len() > 1 => {
                Err(FxError::validation(format!(
                    "{:?} takes a single value, got {}",
                    self.kind,
                    self.values.len()
                )))
            }
            _ => Ok(()),
        }
    }

    /// The 4×5 matrix in unit scale.
    pub fn coefficients(&self) -> [f64; 20] {
        let mut m = [0.0; 20];
        let [l0, l1, l2] = LUMA;
        match self.kind {
            ColorMatrixKind::Matrix => {
                if self.values.len() == 20 {
                    m.copy_from_slice(&self.values);
                }
            }
            ColorMatrixKind::Saturate => {
                let s = self.values.first().copied().unwrap_or(1.0);
                for row in 0..3 {
                    for (col, l) in LUMA.iter().enumerate() {
                        m[row * 5 + col] = if row == col {
                            l + (1.0 - l) * s
                        } else {
                            l - l * s
                        };
                    }
                }
                m[18] = 1.0;
            }
            ColorMatrixKind::HueRotate => {
                let rad = self.values.first().copied().unwrap_or(0.0).to_radians();
                let (sin, cos) = rad.sin_cos();
                m[0] = l0 + cos * (1.0 - l0) - sin * l0;
                m[1] = l1 - cos * l1 - sin * l1;
                m[2] = l2 - cos * l2 + sin * (1.0 - l2);
                m[5] = l0 - cos * l0 + sin * 0.143;
                m[6] = l1 + cos * (1.0 - l1) + sin * 0.140;
                m[7] = l2 - cos * l2 - sin * 0.283;
                m[10] = l0 - cos * l0 - sin * (1.0 - l0);
                m[11] = l1 - cos * l1 + sin * l1;
                m[12] = l2 + cos * (1.0 - l2) + sin * l2;
                m[18] = 1.0;
            }
            ColorMatrixKind::LuminanceToAlpha => {
                m[15] = l0;
                m[16] = l1;
                m[17] = l2;
            }
        }
        m
    }

    /// Fixed-point matrix, every coefficient scaled by 255 and truncated.
    pub fn fixed_point(&self) -> [i32; 20] {
        self.coefficients().map(|v| (v * 255.0) as i32)
    }
}

/// Apply a fixed-point matrix to one premultiplied logical-RGBA pixel.
pub(crate) fn apply(m: &[i32; 20], px: [u8; 4]) -> [u8; 4] {
    let alpha = i32::from(px[3]);
    let mut out = [0u8; 4];
    for (row, o) in out.iter_mut().enumerate() {
        let k = &m[row * 5..row * 5 + 5];
        if alpha == 0 {
            *o = clamp_u8(k[4]);
            continue;
        }
        let mut sum = 0;
        for ch in 0..3 {
            sum += k[ch] * i32::from(px[ch]) / alpha;
        }
        sum += k[3] * alpha / 255;
        sum += k[4];
        *o = clamp_u8(sum);
    }
    for ch in 0..3 {
        out[ch] = (u32::from(out[ch]) * u32::from(out[3]) / 255) as u8;
    }
    out
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &ColorMatrix,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let matrix = params.fixed_point();
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
                let px = apply(&matrix, src.rgba(x, y, map));
                let o = x as usize * 4;
                for (ch, v) in px.into_iter().enumerate() {
                    row[o + map.offset(ch)] = v;
                }
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/color_matrix.rs"]
mod tests;
