use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::Color;
use crate::foundation::error::FxResult;
use crate::foundation::math::{mul_div255_u8, premul_trunc};

/// `feFlood`, with `flood-color` and `flood-opacity` already resolved from style.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Flood {
    #[serde(default)]
    pub color: Color,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for Flood {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            opacity: default_opacity(),
        }
    }
}

impl Flood {
    /// Premultiplied logical RGBA.
    pub fn pixel(&self) -> [u8; 4] {
        let opacity = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u16;
        let a = mul_div255_u8(u16::from(self.color.a), opacity);
        [
            premul_trunc(self.color.r, a),
            premul_trunc(self.color.g, a),
            premul_trunc(self.color.b, a),
            a,
        ]
    }
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Flood,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(bounds) = ctx.resolve_bounds(p, None) else {
        return Ok(());
    };
    let map = ctx.channel_map();
    let px = params.pixel();
    let mut out = ctx.new_surface()?;
    for y in bounds.y0..bounds.y1 {
        for x in bounds.x0..bounds.x1 {
            out.set_rgba(x, y, map, px);
        }
    }
    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/flood.rs"]
mod tests;
