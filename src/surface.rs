//! Premultiplied RGBA8 pixel buffers.
//!
//! An [`ImageBuffer`] is exclusively owned while its producer writes it. Publishing it (into a
//! filter result cache, or as a finished layer) wraps it in a [`SharedImage`], after which it is
//! read-only; anything that wants different pixels allocates a new buffer.

use std::rc::Rc;

use crate::foundation::core::{ChannelMap, IRect, to_i32};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::premul_trunc;

/// Reference-counted, read-only handle to a published buffer.
pub type SharedImage = Rc<ImageBuffer>;

/// Four bytes of one pixel in physical order.
pub type Pixel = [u8; 4];

#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl std::fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

fn byte_len(width: u32, height: u32) -> FxResult<(usize, usize)> {
    let stride = (width as usize)
        .checked_mul(4)
        .ok_or_else(|| FxError::allocation("surface stride overflow"))?;
    let len = stride
        .checked_mul(height as usize)
        .ok_or_else(|| FxError::allocation("surface size overflow"))?;
    Ok((stride, len))
}

impl ImageBuffer {
    /// Allocate a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> FxResult<Self> {
        let (stride, len) = byte_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            FxError::allocation(format!("cannot allocate {width}x{height} surface: {e}"))
        })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Wrap existing premultiplied bytes.
    pub fn from_premul_bytes(width: u32, height: u32, data: Vec<u8>) -> FxResult<Self> {
        let (stride, len) = byte_len(width, height)?;
        if data.len() != len {
            return Err(FxError::evaluation(format!(
                "pixel buffer length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Build from straight-alpha RGBA bytes, premultiplying into `map` order.
    pub fn from_straight_rgba(
        width: u32,
        height: u32,
        rgba: &[u8],
        map: ChannelMap,
    ) -> FxResult<Self> {
        let mut out = Self::new(width, height)?;
        if rgba.len() != out.data.len() {
            return Err(FxError::evaluation(format!(
                "straight rgba length {} does not match {width}x{height}x4",
                rgba.len()
            )));
        }
        for (dst, src) in out.data.chunks_exact_mut(4).zip(rgba.chunks_exact(4)) {
            let a = src[3];
            for ch in 0..3 {
                dst[map.offset(ch)] = premul_trunc(src[ch], a);
            }
            dst[map.alpha()] = a;
        }
        Ok(out)
    }

    /// A transparent buffer with the same dimensions.
    pub fn new_like(&self) -> FxResult<Self> {
        Self::new(self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn bounds(&self) -> IRect {
        IRect::from_size(self.width, self.height)
    }

    pub fn same_size(&self, other: &ImageBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn share(self) -> SharedImage {
        Rc::new(self)
    }

    /// Byte offset of pixel `(x, y)`; callers guarantee the coordinate is in range.
    #[inline]
    pub fn offset(&self, x: i32, y: i32) -> usize {
        y as usize * self.stride + x as usize * 4
    }

    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Pixel {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, px: Pixel) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// One byte at physical channel offset `ch`.
    #[inline]
    pub fn byte(&self, x: i32, y: i32, ch: usize) -> u8 {
        self.data[self.offset(x, y) + ch]
    }

    /// Pixel in logical R, G, B, A order.
    #[inline]
    pub fn rgba(&self, x: i32, y: i32, map: ChannelMap) -> [u8; 4] {
        let px = self.pixel(x, y);
        [
            px[map.offset(0)],
            px[map.offset(1)],
            px[map.offset(2)],
            px[map.offset(3)],
        ]
    }

    #[inline]
    pub fn set_rgba(&mut self, x: i32, y: i32, map: ChannelMap, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        for (ch, v) in rgba.into_iter().enumerate() {
            self.data[i + map.offset(ch)] = v;
        }
    }

    pub fn row(&self, y: i32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.stride]
    }

    /// Copy `src` pixels within `rect` (clamped to both buffers).
    pub fn copy_rect_from(&mut self, src: &ImageBuffer, rect: IRect) {
        let rect = rect
            .clamp_to_size(self.width, self.height)
            .clamp_to_size(src.width, src.height);
        if rect.is_empty() {
            return;
        }
        let bytes = rect.width() as usize * 4;
        for y in rect.y0..rect.y1 {
            let so = src.offset(rect.x0, y);
            let d = self.offset(rect.x0, y);
            self.data[d..d + bytes].copy_from_slice(&src.data[so..so + bytes]);
        }
    }

    /// Bilinear sample of physical channel `ch` at a fractional position.
    ///
    /// Taps outside `bounds` contribute zero.
    pub fn sample_bilinear(&self, ox: f64, oy: f64, ch: usize, bounds: IRect) -> u8 {
        let (fx, fy) = (ox.floor(), oy.floor());
        let (cx, cy) = (ox.ceil(), oy.ceil());
        let (xm, ym) = (ox - fx, oy - fy);
        let bounds = bounds.clamp_to_size(self.width, self.height);
        let tap = |x: f64, y: f64| -> f64 {
            let (x, y) = (x as i32, y as i32);
            if bounds.contains(x, y) {
                f64::from(self.byte(x, y, ch))
            } else {
                0.0
            }
        };
        let c = tap(fx, fy) * (1.0 - xm) * (1.0 - ym)
            + tap(cx, fy) * xm * (1.0 - ym)
            + tap(cx, cy) * xm * ym
            + tap(fx, cy) * (1.0 - xm) * ym;
        c as u8
    }

    /// Zero every pixel outside `keep`.
    pub fn clear_outside(&mut self, keep: IRect) {
        let keep = keep.clamp_to_size(self.width, self.height);
        for y in 0..to_i32(self.height) {
            let row_start = y as usize * self.stride;
            let row = &mut self.data[row_start..row_start + self.stride];
            if y < keep.y0 || y >= keep.y1 || keep.is_empty() {
                row.fill(0);
                continue;
            }
            row[..keep.x0 as usize * 4].fill(0);
            row[keep.x1 as usize * 4..].fill(0);
        }
    }

    /// Straight-alpha RGBA bytes in logical order, rounding like an export would.
    pub fn to_straight_rgba(&self, map: ChannelMap) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let a = px[map.alpha()];
            if a == 0 {
                out.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            let a32 = u32::from(a);
            for ch in 0..3 {
                let c = u32::from(px[map.offset(ch)]);
                out.push(((c * 255 + a32 / 2) / a32).min(255) as u8);
            }
            out.push(a);
        }
        out
    }

    /// A fresh buffer holding only the alpha channel of `self`.
    pub fn alpha_only(&self, map: ChannelMap) -> FxResult<ImageBuffer> {
        let mut out = self.new_like()?;
        let a = map.alpha();
        for (dst, src) in out.data.chunks_exact_mut(4).zip(self.data.chunks_exact(4)) {
            dst[a] = src[a];
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../tests/unit/surface.rs"]
mod tests;
