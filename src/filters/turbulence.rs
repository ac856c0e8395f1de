//! `feTurbulence`: Perlin noise summed over octaves.

use rayon::prelude::*;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::{Point, Rect};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::{clamp_f64_u8, premul_trunc};
use crate::render::bbox::invertible;

const RAND_M: i64 = 2_147_483_647;
const RAND_A: i64 = 16_807;
const RAND_Q: i64 = 127_773;
const RAND_R: i64 = 2_836;
const BSIZE: usize = 0x100;
const BM: i32 = 0xff;
const PERLIN_N: i32 = 0x1000;
const TABLE_LEN: usize = BSIZE + BSIZE + 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    FractalNoise,
    #[default]
    Turbulence,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StitchTiles {
    Stitch,
    #[default]
    NoStitch,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Turbulence {
    #[serde(default)]
    pub base_frequency: (f64, f64),
    #[serde(default = "default_octaves")]
    pub num_octaves: i32,
    #[serde(default)]
    pub seed: i32,
    #[serde(default)]
    pub stitch_tiles: StitchTiles,
    #[serde(default)]
    pub kind: NoiseKind,
}

fn default_octaves() -> i32 {
    1
}

impl Default for Turbulence {
    fn default() -> Self {
        Self {
            base_frequency: (0.0, 0.0),
            num_octaves: default_octaves(),
            seed: 0,
            stitch_tiles: StitchTiles::default(),
            kind: NoiseKind::default(),
        }
    }
}

impl Turbulence {
    pub fn validate(&self) -> FxResult<()> {
        let (fx, fy) = self.base_frequency;
        if fx < 0.0 || fy < 0.0 || !fx.is_finite() || !fy.is_finite() {
            return Err(FxError::validation(format!(
                "baseFrequency ({fx}, {fy}) must be finite and non-negative"
            )));
        }
        if self.num_octaves < 0 {
            return Err(FxError::validation("numOctaves must not be negative"));
        }
        Ok(())
    }
}

fn setup_seed(seed: i32) -> i64 {
    let mut s = i64::from(seed);
    if s <= 0 {
        s = -(s % (RAND_M - 1)) + 1;
    }
    s.min(RAND_M - 1)
}

/// One Park-Miller step.
fn random(seed: i64) -> i64 {
    let r = RAND_A * (seed % RAND_Q) - RAND_R * (seed / RAND_Q);
    if r <= 0 { r + RAND_M } else { r }
}

/// Lattice permutation and per-channel gradient tables for one seed.
pub(crate) struct NoiseTables {
    lattice: Vec<usize>,
    /// `TABLE_LEN` entries per channel.
    gradient: Vec<[f64; 2]>,
}

impl NoiseTables {
    pub(crate) fn new(seed: i32) -> Self {
        let mut s = setup_seed(seed);
        let mut lattice = vec![0usize; TABLE_LEN];
        let mut gradient = vec![[0.0f64; 2]; 4 * TABLE_LEN];

        for k in 0..4 {
            for i in 0..BSIZE {
                lattice[i] = i;
                let g = &mut gradient[k * TABLE_LEN + i];
                for v in g.iter_mut() {
                    s = random(s);
                    *v = ((s % (2 * BSIZE as i64)) - BSIZE as i64) as f64 / BSIZE as f64;
                }
                let len = (g[0] * g[0] + g[1] * g[1]).sqrt();
                g[0] /= len;
                g[1] /= len;
            }
        }

        for i in (1..BSIZE).rev() {
            s = random(s);
            let j = (s % BSIZE as i64) as usize;
            lattice.swap(i, j);
        }

        for i in 0..BSIZE + 2 {
            lattice[BSIZE + i] = lattice[i];
            for k in 0..4 {
                gradient[k * TABLE_LEN + BSIZE + i] = gradient[k * TABLE_LEN + i];
            }
        }

        Self { lattice, gradient }
    }

    fn grad(&self, channel: usize, i: usize) -> [f64; 2] {
        self.gradient[channel * TABLE_LEN + i]
    }

    fn noise2(&self, channel: usize, vec: [f64; 2], stitch: Option<&Stitch>) -> f64 {
        let (mut bx0, rx0) = lattice(vec[0] + f64::from(PERLIN_N));
        let mut bx1 = bx0.wrapping_add(1);
        let rx1 = rx0 - 1.0;
        let (mut by0, ry0) = lattice(vec[1] + f64::from(PERLIN_N));
        let mut by1 = by0.wrapping_add(1);
        let ry1 = ry0 - 1.0;

        if let Some(st) = stitch {
            if bx0 >= st.wrap_x {
                bx0 = bx0.wrapping_sub(st.width);
            }
            if bx1 >= st.wrap_x {
                bx1 = bx1.wrapping_sub(st.width);
            }
            if by0 >= st.wrap_y {
                by0 = by0.wrapping_sub(st.height);
            }
            if by1 >= st.wrap_y {
                by1 = by1.wrapping_sub(st.height);
            }
        }

        let (bx0, bx1) = ((bx0 & BM) as usize, (bx1 & BM) as usize);
        let (by0, by1) = ((by0 & BM) as usize, (by1 & BM) as usize);
        let i = self.lattice[bx0];
        let j = self.lattice[bx1];
        let b00 = self.lattice[i + by0];
        let b10 = self.lattice[j + by0];
        let b01 = self.lattice[i + by1];
        let b11 = self.lattice[j + by1];

        let sx = s_curve(rx0);
        let sy = s_curve(ry0);
        let dot = |b: usize, rx: f64, ry: f64| {
            let q = self.grad(channel, b);
            rx * q[0] + ry * q[1]
        };
        let a = lerp(sx, dot(b00, rx0, ry0), dot(b10, rx1, ry0));
        let b = lerp(sx, dot(b01, rx0, ry1), dot(b11, rx1, ry1));
        lerp(sy, a, b)
    }
}

/// Integer lattice cell and fractional offset of `t`.
///
/// The cell wraps modulo 2^32 like a C `int`, so high octaves keep the low bits the
/// lattice masks with `BM` instead of saturating.
fn lattice(t: f64) -> (i32, f64) {
    let whole = t.trunc();
    let cell = whole.rem_euclid(4_294_967_296.0) as u32 as i32;
    (cell, t - whole)
}

fn s_curve(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Lattice wraparound for seamless tiles, in octave-0 lattice units.
#[derive(Clone, Copy, Debug)]
struct Stitch {
    width: i32,
    height: i32,
    wrap_x: i32,
    wrap_y: i32,
}

/// Frequencies and stitch setup for one evaluation over `tile` (in primitive space).
#[derive(Clone, Copy, Debug)]
struct Octaves {
    freq: (f64, f64),
    stitch: Option<Stitch>,
    count: i32,
    fractal: bool,
}

fn stitch_frequency(freq: f64, extent: f64) -> f64 {
    if freq == 0.0 || extent <= 0.0 {
        return freq;
    }
    let lo = (extent * freq).floor() / extent;
    let hi = (extent * freq).ceil() / extent;
    if freq / lo < hi / freq { lo } else { hi }
}

impl Octaves {
    fn new(params: &Turbulence, tile: Rect) -> Self {
        let mut freq = params.base_frequency;
        let mut stitch = None;
        if params.stitch_tiles == StitchTiles::Stitch {
            freq.0 = stitch_frequency(freq.0, tile.width());
            freq.1 = stitch_frequency(freq.1, tile.height());
            let width = lattice(tile.width() * freq.0 + 0.5).0;
            let height = lattice(tile.height() * freq.1 + 0.5).0;
            stitch = Some(Stitch {
                width,
                height,
                wrap_x: lattice(tile.x0 * freq.0).0.wrapping_add(PERLIN_N).wrapping_add(width),
                wrap_y: lattice(tile.y0 * freq.1).0.wrapping_add(PERLIN_N).wrapping_add(height),
            });
        }
        Self {
            freq,
            stitch,
            count: params.num_octaves,
            fractal: params.kind == NoiseKind::FractalNoise,
        }
    }

    fn sum(&self, tables: &NoiseTables, channel: usize, point: Point) -> f64 {
        let mut vec = [point.x * self.freq.0, point.y * self.freq.1];
        let mut stitch = self.stitch;
        let mut ratio = 1.0;
        let mut total = 0.0;
        for _ in 0..self.count {
            let n = tables.noise2(channel, vec, stitch.as_ref());
            total += if self.fractal { n / ratio } else { n.abs() / ratio };
            vec[0] *= 2.0;
            vec[1] *= 2.0;
            ratio *= 2.0;
            if let Some(st) = &mut stitch {
                st.width = st.width.wrapping_mul(2);
                st.wrap_x = st.wrap_x.wrapping_mul(2).wrapping_sub(PERLIN_N);
                st.height = st.height.wrapping_mul(2);
                st.wrap_y = st.wrap_y.wrapping_mul(2).wrapping_sub(PERLIN_N);
            }
        }
        total
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Turbulence,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let paffine = ctx.paffine();
    if !invertible(paffine) {
        tracing::debug!("turbulence primitive transform is singular");
        return Ok(());
    }
    let to_user = paffine.inverse();
    let input_bounds = ctx.get(&p.input)?.map(|r| r.bounds);
    let Some(bounds) = ctx.resolve_bounds(p, input_bounds) else {
        return Ok(());
    };

    let tile = to_user.transform_rect_bbox(Rect::new(
        f64::from(bounds.x0),
        f64::from(bounds.y0),
        f64::from(bounds.x1),
        f64::from(bounds.y1),
    ));
    let octaves = Octaves::new(params, tile);
    let tables = NoiseTables::new(params.seed);
    let map = ctx.channel_map();
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
                let point = to_user * Point::new(f64::from(x), f64::from(y));
                let mut px = [0u8; 4];
                for (ch, v) in px.iter_mut().enumerate() {
                    let n = octaves.sum(&tables, ch, point);
                    let level = if octaves.fractal {
                        (n * 255.0 + 255.0) / 2.0
                    } else {
                        n * 255.0
                    };
                    *v = clamp_f64_u8(level);
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

#[cfg(test)]
#[path = "../../tests/unit/filters/turbulence.rs"]
mod tests;
