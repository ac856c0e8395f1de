use crate::foundation::core::{ChannelMap, IRect};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8};
use crate::surface::ImageBuffer;

/// Premultiplied pixel in logical R, G, B, A order.
pub type PremulRgba8 = [u8; 4];

/// Porter-Duff operators plus additive `add`, as used for layer compositing and `feComposite`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOp {
    Clear,
    Source,
    #[default]
    Over,
    In,
    Out,
    Atop,
    Dest,
    DestOver,
    DestIn,
    DestOut,
    DestAtop,
    Xor,
    Add,
}

impl CompositeOp {
    /// Source and destination factors `(Fa, Fb)` on the 0..=255 scale.
    fn factors(self, sa: u8, da: u8) -> (u16, u16) {
        let (sa, da) = (u16::from(sa), u16::from(da));
        match self {
            CompositeOp::Clear => (0, 0),
            CompositeOp::Source => (255, 0),
            CompositeOp::Over => (255, 255 - sa),
            CompositeOp::In => (da, 0),
            CompositeOp::Out => (255 - da, 0),
            CompositeOp::Atop => (da, 255 - sa),
            CompositeOp::Dest => (0, 255),
            CompositeOp::DestOver => (255 - da, 255),
            CompositeOp::DestIn => (0, sa),
            CompositeOp::DestOut => (0, 255 - sa),
            CompositeOp::DestAtop => (255 - da, sa),
            CompositeOp::Xor => (255 - da, 255 - sa),
            CompositeOp::Add => (255, 255),
        }
    }
}

pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

pub fn composite(op: CompositeOp, src: PremulRgba8, dst: PremulRgba8) -> PremulRgba8 {
    let (fa, fb) = op.factors(src[3], dst[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(
            mul_div255_u8(u16::from(src[i]), fa),
            mul_div255_u8(u16::from(dst[i]), fb),
        );
    }
    out
}

/// `dst + (out - dst) * coverage / 255`, per channel.
pub fn lerp_coverage(dst: PremulRgba8, out: PremulRgba8, coverage: u8) -> PremulRgba8 {
    match coverage {
        0 => dst,
        255 => out,
        c => {
            let c = i32::from(c);
            let mut r = [0u8; 4];
            for i in 0..4 {
                let d = i32::from(dst[i]);
                let delta = i32::from(out[i]) - d;
                r[i] = (d + (delta * c + 127 * delta.signum()) / 255).clamp(0, 255) as u8;
            }
            r
        }
    }
}

/// Paint `src` onto `dst` with `op`.
///
/// Each pixel's coverage is `opacity`, further multiplied by the matching byte of `coverage`
/// (one byte per pixel, e.g. a mask or clip) when given.
pub fn paint_in_place(
    dst: &mut ImageBuffer,
    src: &ImageBuffer,
    op: CompositeOp,
    opacity: u8,
    coverage: Option<&[u8]>,
    map: ChannelMap,
) -> FxResult<()> {
    if !dst.same_size(src) {
        return Err(FxError::evaluation(
            "paint_in_place expects equal-sized rgba8 buffers",
        ));
    }
    let pixels = src.data().len() / 4;
    if let Some(cov) = coverage
        && cov.len() != pixels
    {
        return Err(FxError::evaluation(
            "paint_in_place coverage must hold one byte per pixel",
        ));
    }

    let (w, h) = (src.width() as i32, src.height() as i32);
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let mut c = opacity;
            if let Some(cov) = coverage {
                c = mul_div255_u8(u16::from(c), u16::from(cov[idx]));
            }
            if c == 0 {
                continue;
            }
            let s = src.rgba(x, y, map);
            let d = dst.rgba(x, y, map);
            let out = lerp_coverage(d, composite(op, s, d), c);
            dst.set_rgba(x, y, map, out);
        }
    }
    Ok(())
}

/// Source-over `src` onto `dst` inside `rect` only.
pub fn over_rect_in_place(
    dst: &mut ImageBuffer,
    src: &ImageBuffer,
    rect: IRect,
    map: ChannelMap,
) -> FxResult<()> {
    if !dst.same_size(src) {
        return Err(FxError::evaluation(
            "over_rect_in_place expects equal-sized rgba8 buffers",
        ));
    }
    let rect = rect.clamp_to_size(dst.width(), dst.height());
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            let s = src.rgba(x, y, map);
            if s[3] == 0 {
                continue;
            }
            let d = dst.rgba(x, y, map);
            dst.set_rgba(x, y, map, over(d, s, 1.0));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
