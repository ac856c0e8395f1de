use rayon::prelude::*;
use smallvec::SmallVec;

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::Channel;
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::{clamp_u8, premul_trunc, unpremul_trunc};

const MAX_TABLE_VALUES: usize = 256;

/// One `feFuncX` transfer function, in unit scale.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferFunction {
    #[default]
    Identity,
    Table {
        #[serde(default)]
        values: Vec<f64>,
    },
    Discrete {
        #[serde(default)]
        values: Vec<f64>,
    },
    Linear {
        #[serde(default = "one")]
        slope: f64,
        #[serde(default)]
        intercept: f64,
    },
    Gamma {
        #[serde(default = "one")]
        amplitude: f64,
        #[serde(default = "one")]
        exponent: f64,
        #[serde(default)]
        offset: f64,
    },
}

fn one() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FuncNode {
    pub channel: Channel,
    #[serde(flatten)]
    pub function: TransferFunction,
}

/// `feComponentTransfer`. When several functions target one channel the last one wins.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComponentTransfer {
    #[serde(default)]
    pub functions: Vec<FuncNode>,
}

impl ComponentTransfer {
    pub fn validate(&self) -> FxResult<()> {
        for f in &self.functions {
            match &f.function {
                TransferFunction::Table { values } | TransferFunction::Discrete { values }
                    if values.len() > MAX_TABLE_VALUES =>
                {
                    return Err(FxError::validation(format!(
                        "{:?} transfer table has {} values, at most {MAX_TABLE_VALUES} allowed",
                        f.channel,
                        values.len()
                    )));
                }
                TransferFunction::Gamma { exponent, .. } if !exponent.is_finite() => {
                    return Err(FxError::validation("gamma exponent must be finite"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Effective function per logical channel.
    fn per_channel(&self) -> [ScaledFunction; 4] {
        let mut out: [ScaledFunction; 4] = Default::default();
        for f in &self.functions {
            out[f.channel.logical_index()] = ScaledFunction::from(&f.function);
        }
        out
    }
}

/// Fixed-point form: every level is pre-multiplied by 255 and truncated.
#[derive(Clone, Debug, Default)]
enum ScaledFunction {
    #[default]
    Identity,
    Table(SmallVec<[i32; 16]>),
    Discrete(SmallVec<[i32; 16]>),
    Linear {
        slope: i32,
        intercept: i32,
    },
    Gamma {
        amplitude: i32,
        exponent: f64,
        offset: i32,
    },
}

fn scale(v: f64) -> i32 {
    (v * 255.0) as i32
}

impl From<&TransferFunction> for ScaledFunction {
    fn from(f: &TransferFunction) -> Self {
        match f {
            TransferFunction::Identity => ScaledFunction::Identity,
            TransferFunction::Table { values } => {
                ScaledFunction::Table(values.iter().copied().map(scale).collect())
            }
            TransferFunction::Discrete { values } => {
                ScaledFunction::Discrete(values.iter().copied().map(scale).collect())
            }
            TransferFunction::Linear { slope, intercept } => ScaledFunction::Linear {
                slope: scale(*slope),
                intercept: scale(*intercept),
            },
            TransferFunction::Gamma {
                amplitude,
                exponent,
                offset,
            } => ScaledFunction::Gamma {
                amplitude: scale(*amplitude),
                exponent: *exponent,
                offset: scale(*offset),
            },
        }
    }
}

/// `base^exp` in 0..255 fixed point.
///
/// For `base` in 0..=255 the running value never grows, so it settles after at most
/// 255 steps whatever the exponent.
fn fixpow(base: i32, exp: i32) -> i32 {
    let mut out = 255;
    for _ in 0..exp.max(0) {
        let next = out * base / 255;
        if next == out {
            break;
        }
        out = next;
    }
    out
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl ScaledFunction {
    fn eval(&self, c: i32) -> i32 {
        match self {
            ScaledFunction::Identity => c,
            ScaledFunction::Table(values) => {
                if values.is_empty() {
                    return c;
                }
                let n = values.len() as i32;
                let k = c * (n - 1) / 255;
                let vk = i64::from(values[k.min(n - 1) as usize]);
                let vk1 = i64::from(values[(k + 1).min(n - 1) as usize]);
                let distance = i64::from(c * (n - 1) - k * 255);
                saturate(vk + distance * (vk1 - vk) / 255)
            }
            ScaledFunction::Discrete(values) => {
                if values.is_empty() {
                    return c;
                }
                let n = values.len() as i32;
                let k = c * n / 255;
                values[k.clamp(0, n - 1) as usize]
            }
            ScaledFunction::Linear { slope, intercept } => {
                saturate(i64::from(*slope) * i64::from(c) / 255 + i64::from(*intercept))
            }
            ScaledFunction::Gamma {
                amplitude,
                exponent,
                offset,
            } => {
                if exponent.floor() == *exponent {
                    let pow = i64::from(fixpow(c, *exponent as i32));
                    saturate(i64::from(*amplitude) * pow / 255 + i64::from(*offset))
                } else {
                    let pow = (f64::from(c) / 255.0).powf(*exponent);
                    (f64::from(*amplitude) * pow + f64::from(*offset)) as i32
                }
            }
        }
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &ComponentTransfer,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let funcs = params.per_channel();
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
                let px = src.rgba(x, y, map);
                let a = px[3];
                let mut lit = [0u8; 4];
                for (ch, f) in funcs.iter().enumerate() {
                    let inval = match (ch, a) {
                        (3, _) => i32::from(a),
                        (_, 0) => 0,
                        _ => unpremul_trunc(px[ch], a),
                    };
                    lit[ch] = clamp_u8(f.eval(inval));
                }
                let o = x as usize * 4;
                for ch in 0..3 {
                    row[o + map.offset(ch)] = premul_trunc(lit[ch], lit[3]);
                }
                row[o + map.alpha()] = lit[3];
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/component_transfer.rs"]
mod tests;
