//! `feDiffuseLighting` and `feSpecularLighting`.
//!
//! Both treat the input's alpha channel as a height map scaled by `surface_scale`, estimate a
//! surface normal with Sobel-style kernels, and shade it with the last listed light source.

use rayon::prelude::*;

use crate::filters::light_source::{LightSource, Vec3};
use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::{Affine, Color, IRect, Point};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::clamp_f64_u8;
use crate::render::bbox::invertible;
use crate::surface::ImageBuffer;

/// Normal kernels indexed by `row * 3 + col`, where row/col pick the top/left edge (0), the
/// interior (1) or the bottom/right edge (2). Each carries its normalisation factor.
const KERNELS_X: [([i32; 9], f64); 9] = [
    ([0, 0, 0, 0, -2, 2, 0, -1, 1], 2.0 / 3.0),
    ([0, 0, 0, -2, 0, 2, -1, 0, 1], 1.0 / 3.0),
    ([0, 0, 0, -2, 2, 0, -1, 1, 0], 2.0 / 3.0),
    ([0, -1, 1, 0, -2, 2, 0, -1, 1], 1.0 / 2.0),
    ([-1, 0, 1, -2, 0, 2, -1, 0, 1], 1.0 / 4.0),
    ([-1, 1, 0, -2, 2, 0, -1, 1, 0], 1.0 / 2.0),
    ([0, -1, 1, 0, -2, 2, 0, 0, 0], 2.0 / 3.0),
    ([-1, 0, 1, -2, 0, 2, 0, 0, 0], 1.0 / 3.0),
    ([-1, 1, 0, -2, 2, 0, 0, 0, 0], 2.0 / 3.0),
];

const KERNELS_Y: [([i32; 9], f64); 9] = [
    ([0, 0, 0, 0, -2, -1, 0, 2, 1], 2.0 / 3.0),
    ([0, 0, 0, -1, -2, -1, 1, 2, 1], 1.0 / 3.0),
    ([0, 0, 0, -1, -2, 0, 1, 2, 0], 2.0 / 3.0),
    ([0, -2, -1, 0, 0, 0, 0, 2, 1], 1.0 / 2.0),
    ([-1, -2, -1, 0, 0, 0, 1, 2, 1], 1.0 / 4.0),
    ([-1, -2, 0, 0, 0, 0, 1, 2, 0], 1.0 / 2.0),
    ([0, -2, -1, 0, 2, 1, 0, 0, 0], 2.0 / 3.0),
    ([0, -2, -1, 1, 2, 1, 0, 0, 0], 1.0 / 3.0),
    ([-1, -2, 0, 1, 2, 0, 0, 0, 0], 2.0 / 3.0),
];

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DiffuseLighting {
    #[serde(default = "one")]
    pub surface_scale: f64,
    #[serde(default = "one")]
    pub diffuse_constant: f64,
    #[serde(default)]
    pub kernel_unit_length: Option<(f64, f64)>,
    #[serde(default = "white")]
    pub lighting_color: Color,
    /// Light source children; the last one is used.
    #[serde(default)]
    pub lights: Vec<LightSource>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpecularLighting {
    #[serde(default = "one")]
    pub surface_scale: f64,
    #[serde(default = "one")]
    pub specular_constant: f64,
    #[serde(default = "one")]
    pub specular_exponent: f64,
    #[serde(default)]
    pub kernel_unit_length: Option<(f64, f64)>,
    #[serde(default = "white")]
    pub lighting_color: Color,
    #[serde(default)]
    pub lights: Vec<LightSource>,
}

fn one() -> f64 {
    1.0
}

fn white() -> Color {
    Color::WHITE
}

impl Default for DiffuseLighting {
    fn default() -> Self {
        Self {
            surface_scale: 1.0,
            diffuse_constant: 1.0,
            kernel_unit_length: None,
            lighting_color: Color::WHITE,
            lights: Vec::new(),
        }
    }
}

impl Default for SpecularLighting {
    fn default() -> Self {
        Self {
            surface_scale: 1.0,
            specular_constant: 1.0,
            specular_exponent: 1.0,
            kernel_unit_length: None,
            lighting_color: Color::WHITE,
            lights: Vec::new(),
        }
    }
}

fn validate_common(surface_scale: f64, kernel_unit_length: Option<(f64, f64)>) -> FxResult<()> {
    if !surface_scale.is_finite() {
        return Err(FxError::validation("surfaceScale must be finite"));
    }
    if let Some((dx, dy)) = kernel_unit_length
        && !(dx > 0.0 && dy > 0.0)
    {
        return Err(FxError::validation(format!(
            "kernelUnitLength ({dx}, {dy}) must be positive"
        )));
    }
    Ok(())
}

impl DiffuseLighting {
    pub fn validate(&self) -> FxResult<()> {
        validate_common(self.surface_scale, self.kernel_unit_length)?;
        if !(self.diffuse_constant >= 0.0) {
            return Err(FxError::validation("diffuseConstant must be non-negative"));
        }
        Ok(())
    }
}

impl SpecularLighting {
    pub fn validate(&self) -> FxResult<()> {
        validate_common(self.surface_scale, self.kernel_unit_length)?;
        if !(self.specular_constant >= 0.0) {
            return Err(FxError::validation("specularConstant must be non-negative"));
        }
        if !(1.0..=128.0).contains(&self.specular_exponent) {
            return Err(FxError::validation(format!(
                "specularExponent {} outside 1..=128",
                self.specular_exponent
            )));
        }
        Ok(())
    }
}

/// Sample spacing for normal estimation: `step` in pixels, `unit` in primitive units.
#[derive(Clone, Copy, Debug)]
struct Spacing {
    step: (f64, f64),
    unit: (f64, f64),
}

impl Spacing {
    fn new(kernel_unit_length: Option<(f64, f64)>, paffine: Affine) -> Self {
        let [xx, _, _, yy, _, _] = paffine.as_coeffs();
        match kernel_unit_length {
            Some((kx, ky)) if kx > 0.0 && ky > 0.0 => Self {
                step: (kx * xx, ky * yy),
                unit: (kx, ky),
            },
            _ => {
                let inv = |v: f64| if v != 0.0 { 1.0 / v } else { 1.0 };
                Self {
                    step: (1.0, 1.0),
                    unit: (inv(xx), inv(yy)),
                }
            }
        }
    }
}

/// The input alpha channel viewed as a height field.
struct HeightMap<'a> {
    image: &'a ImageBuffer,
    bounds: IRect,
    alpha: usize,
    surface_scale: f64,
    spacing: Spacing,
}

impl HeightMap<'_> {
    fn height(&self, x: i32, y: i32) -> f64 {
        self.surface_scale / 255.0 * f64::from(self.image.byte(x, y, self.alpha))
    }

    fn normal(&self, x: i32, y: i32) -> Vec3 {
        let (dx, dy) = self.spacing.step;
        let (fx, fy) = (f64::from(x), f64::from(y));
        let b = self.bounds;

        let col = if fx + dx >= f64::from(b.x1 - 1) {
            2
        } else if fx - dx < f64::from(b.x0 + 1) {
            0
        } else {
            1
        };
        let row = if fy + dy >= f64::from(b.y1 - 1) {
            2
        } else if fy - dy < f64::from(b.y0 + 1) {
            0
        } else {
            1
        };
        let (kx, factor_x) = KERNELS_X[row * 3 + col];
        let (ky, factor_y) = KERNELS_Y[row * 3 + col];

        let mut sx = 0.0;
        let mut sy = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                let k = i * 3 + j;
                if kx[k] == 0 && ky[k] == 0 {
                    continue;
                }
                let ox = fx + (j as f64 - 1.0) * dx;
                let oy = fy + (i as f64 - 1.0) * dy;
                let v = f64::from(self.image.sample_bilinear(ox, oy, self.alpha, b));
                sx += f64::from(kx[k]) * v;
                sy += f64::from(ky[k]) * v;
            }
        }

        let nx = -self.surface_scale * factor_x / self.spacing.unit.0 * sx / 255.0;
        let ny = -self.surface_scale * factor_y / self.spacing.unit.1 * sy / 255.0;
        Vec3::new(nx, ny, 1.0).normalize()
    }
}

/// Per-pixel lighting inputs handed to a shading function.
#[derive(Clone, Copy, Debug)]
struct Fragment {
    normal: Vec3,
    to_light: Vec3,
    color: Vec3,
}

struct Surface<'a> {
    scale: f64,
    kernel_unit_length: Option<(f64, f64)>,
    color: Color,
    lights: &'a [LightSource],
}

fn render_lit<F>(
    p: &FilterPrimitive,
    surface: Surface<'_>,
    ctx: &mut FilterContext<'_>,
    shade: F,
) -> FxResult<()>
where
    F: Fn(Fragment) -> [u8; 4] + Sync,
{
    let Some(light) = surface.lights.last() else {
        tracing::debug!(result = %p.result, "lighting primitive has no light source");
        return Ok(());
    };
    let paffine = ctx.paffine();
    if !invertible(paffine) {
        tracing::debug!("lighting primitive transform is singular");
        return Ok(());
    }
    let to_user = paffine.inverse();
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let map = ctx.channel_map();
    let heights = HeightMap {
        image: &input.image,
        bounds,
        alpha: map.alpha(),
        surface_scale: surface.scale,
        spacing: Spacing::new(surface.kernel_unit_length, paffine),
    };
    let base_color = Vec3::new(
        f64::from(surface.color.r) / 255.0,
        f64::from(surface.color.g) / 255.0,
        f64::from(surface.color.b) / 255.0,
    );
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
                let z = heights.height(x, y);
                let user = to_user * Point::new(f64::from(x), f64::from(y));
                let px = shade(Fragment {
                    normal: heights.normal(x, y),
                    to_light: light.direction(user, z),
                    color: light.color(base_color, user, z),
                });
                let o = x as usize * 4;
                for ch in 0..3 {
                    row[o + map.offset(ch)] = px[ch];
                }
                row[o + map.alpha()] = px[3];
            }
        });

    ctx.store(&p.result, out, bounds);
    Ok(())
}

/// Lambertian shading: opaque output, `kd · N·L · colour`.
fn shade_diffuse(diffuse_constant: f64, f: Fragment) -> [u8; 4] {
    let factor = diffuse_constant * f.normal.dot(f.to_light) * 255.0;
    [
        clamp_f64_u8(factor * f.color.x),
        clamp_f64_u8(factor * f.color.y),
        clamp_f64_u8(factor * f.color.z),
        255,
    ]
}

/// Phong highlight on the half vector; alpha is the brightest lit channel.
fn shade_specular(constant: f64, exponent: f64, f: Fragment) -> [u8; 4] {
    let half = Vec3::new(f.to_light.x, f.to_light.y, f.to_light.z + 1.0).normalize();
    let factor = constant * f.normal.dot(half).powf(exponent) * 255.0;
    let peak = f.color.max_component().max(0.0) * factor;
    let peak = if peak.is_nan() { 0.0 } else { peak.clamp(0.0, 255.0) };
    [
        clamp_f64_u8(f.color.x * peak),
        clamp_f64_u8(f.color.y * peak),
        clamp_f64_u8(f.color.z * peak),
        clamp_f64_u8(peak),
    ]
}

pub(crate) fn render_diffuse(
    p: &FilterPrimitive,
    params: &DiffuseLighting,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let kd = params.diffuse_constant;
    let surface = Surface {
        scale: params.surface_scale,
        kernel_unit_length: params.kernel_unit_length,
        color: params.lighting_color,
        lights: &params.lights,
    };
    render_lit(p, surface, ctx, |f| shade_diffuse(kd, f))
}

pub(crate) fn render_specular(
    p: &FilterPrimitive,
    params: &SpecularLighting,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let (ks, exponent) = (params.specular_constant, params.specular_exponent);
    let surface = Surface {
        scale: params.surface_scale,
        kernel_unit_length: params.kernel_unit_length,
        color: params.lighting_color,
        lights: &params.lights,
    };
    render_lit(p, surface, ctx, |f| shade_specular(ks, exponent, f))
}

#[cfg(test)]
#[path = "../../tests/unit/filters/lighting.rs"]
mod tests;
