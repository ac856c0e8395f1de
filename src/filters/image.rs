use image::imageops::{self, FilterType};

use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::core::{ChannelMap, IRect};
use crate::foundation::error::FxResult;
use crate::foundation::math::premul_trunc;
use crate::surface::ImageBuffer;

/// `feImage`: a scene node rendered under the primitive transform, or an external raster
/// stretched over the primitive subregion.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Image {
    #[serde(default)]
    pub href: String,
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Image,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    if params.href.is_empty() {
        tracing::debug!("feImage without href");
        return Ok(());
    }
    let Some(bounds) = ctx.resolve_bounds(p, None) else {
        return Ok(());
    };

    let mut out = ctx.new_surface()?;
    let (paffine, width, height) = (ctx.paffine(), ctx.width(), ctx.height());
    if let Some(node) = ctx.host().render_node(&params.href, paffine, width, height)? {
        out.copy_rect_from(&node, bounds);
    } else if let Some(raster) = ctx.host().load_image(&params.href)? {
        place_raster(&mut out, &raster, bounds, ctx.channel_map());
    } else {
        tracing::debug!(href = %params.href, "feImage reference not found");
        return Ok(());
    }

    ctx.store(&p.result, out, bounds);
    Ok(())
}

/// Stretch straight-alpha `raster` over `rect` and premultiply it into `out`.
fn place_raster(
    out: &mut ImageBuffer,
    raster: &image::RgbaImage,
    rect: IRect,
    map: ChannelMap,
) {
    let rect = rect.clamp_to_size(out.width(), out.height());
    if rect.is_empty() || raster.width() == 0 || raster.height() == 0 {
        return;
    }
    let scaled = imageops::resize(
        raster,
        rect.width() as u32,
        rect.height() as u32,
        FilterType::Triangle,
    );
    for (sx, sy, px) in scaled.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let rgba = [premul_trunc(r, a), premul_trunc(g, a), premul_trunc(b, a), a];
        out.set_rgba(rect.x0 + sx as i32, rect.y0 + sy as i32, map, rgba);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/image.rs"]
mod tests;
