use std::collections::HashMap;

use crate::filters::{FilterHost, FilterNode, FilterPrimitive, evaluate_filter};
use crate::foundation::core::{Affine, ChannelMap, CoordUnits, Length, Rect};
use crate::foundation::error::FxResult;
use crate::render::bbox::BoundingBox;
use crate::surface::{ImageBuffer, SharedImage};

/// Host with a fixed transform, an optional background and canned external content.
pub(crate) struct TestHost {
    pub affine: Affine,
    pub viewport: (f64, f64),
    pub background: Option<ImageBuffer>,
    pub background_calls: usize,
    pub images: HashMap<String, image::RgbaImage>,
    pub nodes: HashMap<String, [u8; 4]>,
}

impl TestHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            affine: Affine::IDENTITY,
            viewport: (f64::from(width), f64::from(height)),
            background: None,
            background_calls: 0,
            images: HashMap::new(),
            nodes: HashMap::new(),
        }
    }
}

impl FilterHost for TestHost {
    fn affine(&self) -> Affine {
        self.affine
    }

    fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    fn background(&mut self) -> FxResult<ImageBuffer> {
        self.background_calls += 1;
        match &self.background {
            Some(bg) => Ok(bg.clone()),
            None => ImageBuffer::new(self.viewport.0 as u32, self.viewport.1 as u32),
        }
    }

    fn render_node(
        &mut self,
        href: &str,
        _affine: Affine,
        width: u32,
        height: u32,
    ) -> FxResult<Option<ImageBuffer>> {
        let Some(px) = self.nodes.get(href) else {
            return Ok(None);
        };
        let mut out = ImageBuffer::new(width, height)?;
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                out.set_pixel(x, y, *px);
            }
        }
        Ok(Some(out))
    }

    fn load_image(&mut self, href: &str) -> FxResult<Option<image::RgbaImage>> {
        Ok(self.images.get(href).cloned())
    }
}

pub(crate) fn solid(width: u32, height: u32, px: [u8; 4]) -> ImageBuffer {
    let data = px.repeat((width * height) as usize);
    ImageBuffer::from_premul_bytes(width, height, data).unwrap()
}

/// Deterministic, non-uniform premultiplied test pattern.
pub(crate) fn pattern(width: u32, height: u32) -> ImageBuffer {
    let mut out = ImageBuffer::new(width, height).unwrap();
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let a = ((x * 37 + y * 91) % 256) as u8;
            let c = |k: i32| (((x * k + y * 13) % 256) as u32 * u32::from(a) / 255) as u8;
            out.set_pixel(x, y, [c(11), c(23), c(47), a]);
        }
    }
    out
}

/// A filter whose region is exactly the `width × height` surface in user space.
pub(crate) fn user_filter(
    width: u32,
    height: u32,
    primitives: impl IntoIterator<Item = FilterPrimitive>,
) -> FilterNode {
    FilterNode {
        x: Length::User(0.0),
        y: Length::User(0.0),
        width: Length::User(f64::from(width)),
        height: Length::User(f64::from(height)),
        filter_units: CoordUnits::UserSpaceOnUse,
        primitive_units: CoordUnits::UserSpaceOnUse,
        ..FilterNode::with_primitives(primitives)
    }
}

pub(crate) fn element_bbox(width: u32, height: u32) -> BoundingBox {
    BoundingBox::with_rect(
        Rect::new(0.0, 0.0, f64::from(width), f64::from(height)),
        Affine::IDENTITY,
    )
}

pub(crate) fn run(filter: &FilterNode, source: ImageBuffer) -> SharedImage {
    let (w, h) = (source.width(), source.height());
    let mut host = TestHost::new(w, h);
    run_with(filter, source, &mut host)
}

pub(crate) fn run_with(filter: &FilterNode, source: ImageBuffer, host: &mut TestHost) -> SharedImage {
    let bbox = element_bbox(source.width(), source.height());
    evaluate_filter(filter, source.share(), host, &bbox, ChannelMap::RGBA).unwrap()
}
