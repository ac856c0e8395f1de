//! `feGaussianBlur`: a true Gaussian kernel for small deviations, three box blurs otherwise.

use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::to_i32;
use crate::foundation::error::{FxError, FxResult};
use crate::surface::ImageBuffer;

/// Deviations at or above this use the box-blur approximation.
const BOX_BLUR_THRESHOLD: f64 = 10.0;
/// Deviations above this on either axis make the blur a copy.
const MAX_DEVIATION: f64 = 1000.0;
/// Integration samples per kernel cell.
const QUANTA: i32 = 50;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GaussianBlur {
    #[serde(default)]
    pub std_deviation: (f64, f64),
}

impl GaussianBlur {
    pub fn validate(&self) -> FxResult<()> {
        let (sx, sy) = self.std_deviation;
        if sx < 0.0 || sy < 0.0 || !sx.is_finite() || !sy.is_finite() {
            return Err(FxError::validation(format!(
                "stdDeviation ({sx}, {sy}) must be finite and non-negative"
            )));
        }
        Ok(())
    }
}

/// Box width approximating a Gaussian of deviation `sigma`.
pub fn box_width(sigma: f64) -> i32 {
    (sigma * 3.0 * (2.0 * std::f64::consts::PI).sqrt() / 4.0 + 0.5) as i32
}

/// Normalized, symmetric kernel for a deviation of `sigma`.
///
/// Cells are integrated numerically over `QUANTA` samples; the kernel spans two
/// deviations of `sigma + 1` on each side.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let std_dev = sigma + 1.0;
    let radius = std_dev * 2.0;
    let len = ((2.0 * (radius - 0.5).ceil() + 1.0) as i32).max(1);
    let two_var = 2.0 * std_dev * std_dev;
    let mid = len / 2;

    let mut matrix = vec![0.0; len as usize];
    for i in mid + 1..len {
        let base = f64::from(i - mid) - 0.5;
        let mut sum = 0.0;
        for j in 1..=QUANTA {
            let r = base + 0.02 * f64::from(j);
            if r <= radius {
                sum += (-(r * r) / two_var).exp();
            }
        }
        matrix[i as usize] = sum / f64::from(QUANTA);
    }
    for i in 0..=mid {
        matrix[i as usize] = matrix[(len - 1 - i) as usize];
    }

    let mut sum = 0.0;
    for j in 0..=QUANTA {
        let r = -0.5 + 0.02 * f64::from(j);
        sum += (-(r * r) / two_var).exp();
    }
    matrix[mid as usize] = sum / f64::from(QUANTA + 1);

    let total: f64 = matrix.iter().sum();
    for v in &mut matrix {
        *v /= total;
    }
    matrix
}

/// One moving-average pass over a line of RGBA pixels.
///
/// Even widths are centred half a pixel to the right (`even_offset = 1`) or left
/// (`even_offset = -1`) of the output pixel. Pixels past either end are not counted.
fn box_blur_line(box_width: i32, even_offset: i32, src: &[u8], dest: &mut [u8]) {
    let len = (src.len() / 4) as i32;
    let mut lead = 0;
    let mut output = if box_width % 2 != 0 {
        lead - (box_width - 1) / 2
    } else if even_offset == 1 {
        lead + 1 - box_width / 2
    } else {
        lead - box_width / 2
    };
    let mut trail = lead - box_width;
    let mut ac = [0i32; 4];

    while output < len {
        let coverage = (if lead < len { lead } else { len - 1 }) - (if trail >= 0 { trail } else { -1 });
        for ch in 0..4 {
            if lead < len {
                ac[ch] += i32::from(src[(lead * 4) as usize + ch]);
            }
            if trail >= 0 {
                ac[ch] -= i32::from(src[(trail * 4) as usize + ch]);
            }
            if output >= 0 {
                dest[(output * 4) as usize + ch] = ((ac[ch] + coverage / 2) / coverage) as u8;
            }
        }
        lead += 1;
        output += 1;
        trail += 1;
    }
}

/// Convolve a line with `matrix`, renormalizing where the kernel hangs off either end.
fn gaussian_blur_line(matrix: &[f64], src: &[u8], dest: &mut [u8]) {
    let len = (src.len() / 4) as i32;
    let mlen = matrix.len() as i32;
    let mid = mlen / 2;

    for row in 0..len {
        let k0 = (mid - row).max(0);
        let k1 = (len - row + mid).min(mlen);
        let clipped = k0 > 0 || k1 < mlen;
        let scale: f64 = if clipped {
            matrix[k0 as usize..k1 as usize].iter().sum()
        } else {
            1.0
        };
        for ch in 0..4 {
            let mut sum = 0.0;
            for k in k0..k1 {
                let p = row - mid + k;
                sum += matrix[k as usize] * f64::from(src[(p * 4) as usize + ch]);
            }
            let v = if clipped { sum / scale } else { sum };
            dest[(row * 4) as usize + ch] = (v + 0.5) as u8;
        }
    }
}

enum LineBlur {
    Box(i32),
    Gaussian(Vec<f64>),
}

impl LineBlur {
    fn for_deviation(sigma: f64) -> Self {
        if sigma < BOX_BLUR_THRESHOLD {
            LineBlur::Gaussian(gaussian_kernel(sigma))
        } else {
            LineBlur::Box(box_width(sigma))
        }
    }

    fn run(&self, src: &[u8], dest: &mut [u8], scratch: &mut (Vec<u8>, Vec<u8>)) {
        match self {
            LineBlur::Gaussian(matrix) => gaussian_blur_line(matrix, src, dest),
            LineBlur::Box(width) => {
                let (a, b) = scratch;
                a.resize(src.len(), 0);
                b.resize(src.len(), 0);
                if width % 2 != 0 {
                    box_blur_line(*width, 0, src, a);
                    box_blur_line(*width, 0, a, b);
                    box_blur_line(*width, 0, b, dest);
                } else {
                    box_blur_line(*width, -1, src, a);
                    box_blur_line(*width, 1, a, b);
                    box_blur_line(width + 1, 0, b, dest);
                }
            }
        }
    }
}

/// Blur a whole buffer with device-space deviations `sx`, `sy`.
pub fn blur_image(src: &ImageBuffer, sx: f64, sy: f64) -> FxResult<ImageBuffer> {
    let (sx, sy) = (sx.max(0.0), sy.max(0.0));
    if (sx == 0.0 && sy == 0.0) || sx > MAX_DEVIATION || sy > MAX_DEVIATION {
        return Ok(src.clone());
    }

    let horizontal = if sx != 0.0 {
        let blur = LineBlur::for_deviation(sx);
        let mut out = src.new_like()?;
        let stride = out.stride();
        out.data_mut()
            .par_chunks_mut(stride)
            .zip(src.data().par_chunks(stride))
            .for_each_init(
                || (Vec::new(), Vec::new()),
                |scratch, (dst, line)| blur.run(line, dst, scratch),
            );
        Some(out)
    } else {
        None
    };

    if sy == 0.0 {
        return horizontal.map_or_else(|| Ok(src.clone()), Ok);
    }

    let blur = LineBlur::for_deviation(sy);
    let from = horizontal.as_ref().unwrap_or(src);
    let height = to_i32(from.height());
    let columns: Vec<Vec<u8>> = (0..to_i32(from.width()))
        .into_par_iter()
        .map_init(
            || (Vec::new(), Vec::new()),
            |scratch, x| {
                let mut column = Vec::with_capacity(height as usize * 4);
                for y in 0..height {
                    column.extend_from_slice(&from.pixel(x, y));
                }
                let mut blurred = vec![0u8; column.len()];
                blur.run(&column, &mut blurred, scratch);
                blurred
            },
        )
        .collect();

    let mut out = match horizontal {
        Some(h) => h,
        None => src.new_like()?,
    };
    for (x, column) in columns.iter().enumerate() {
        for (y, px) in column.chunks_exact(4).enumerate() {
            out.set_pixel(x as i32, y as i32, [px[0], px[1], px[2], px[3]]);
        }
    }
    Ok(out)
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &GaussianBlur,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let paffine = ctx.paffine().as_coeffs();
    let (sdx, sdy) = params.std_deviation;
    let sx = (sdx.max(0.0) * paffine[0]).abs();
    let sy = (sdy.max(0.0) * paffine[3]).abs();

    let mut out = blur_image(&input.image, sx, sy)?;
    out.clear_outside(bounds);
    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/gaussian_blur.rs"]
mod tests;
