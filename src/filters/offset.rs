use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::to_i32;
use crate::foundation::error::FxResult;

/// `feOffset`, in primitive units.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Offset {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Offset,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let Some(bounds) = ctx.resolve_bounds(p, Some(input.bounds)) else {
        return Ok(());
    };

    let [xx, yx, xy, yy, _, _] = ctx.paffine().as_coeffs();
    // Any shift past the surface edge moves every pixel out of bounds.
    let (w, h) = (to_i32(ctx.width()), to_i32(ctx.height()));
    let ox = ((xx * params.dx + xy * params.dy) as i32).clamp(-w, w);
    let oy = ((yx * params.dx + yy * params.dy) as i32).clamp(-h, h);

    let src = &*input.image;
    let mut out = ctx.new_surface()?;
    for y in bounds.y0..bounds.y1 {
        let sy = y - oy;
        if sy < bounds.y0 || sy >= bounds.y1 {
            continue;
        }
        for x in bounds.x0..bounds.x1 {
            let sx = x - ox;
            if sx < bounds.x0 || sx >= bounds.x1 {
                continue;
            }
            out.set_pixel(x, y, src.pixel(sx, sy));
        }
    }

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/offset.rs"]
mod tests;
