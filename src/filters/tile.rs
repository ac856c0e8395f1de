use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::error::FxResult;
use crate::foundation::math::wrap_index;

/// `feTile`: repeats the input's own bounds across the primitive subregion.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tile {}

pub(crate) fn render(
    p: &FilterPrimitive,
    _params: &Tile,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(input) = ctx.get(&p.input)? else {
        return Ok(());
    };
    let tile = input.bounds.clamp_to_size(ctx.width(), ctx.height());
    if tile.is_empty() {
        tracing::debug!(result = %p.result, "tile input has empty bounds");
        return Ok(());
    }
    let Some(bounds) = ctx.resolve_bounds(p, None) else {
        return Ok(());
    };

    let src = &*input.image;
    let mut out = ctx.new_surface()?;
    for y in bounds.y0..bounds.y1 {
        let sy = tile.y0 + wrap_index(y - tile.y0, tile.height());
        for x in bounds.x0..bounds.x1 {
            let sx = tile.x0 + wrap_index(x - tile.x0, tile.width());
            out.set_pixel(x, y, src.pixel(sx, sy));
        }
    }

    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/tile.rs"]
mod tests;
