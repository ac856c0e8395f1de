use std::collections::HashMap;

use crate::filters::FilterNode;
use crate::foundation::core::{Affine, ChannelMap, CoordUnits, IRect};
use crate::foundation::error::{FxError, FxResult};
use crate::render::bbox::BoundingBox;
use crate::surface::{ImageBuffer, SharedImage};

pub const SOURCE_GRAPHIC: &str = "SourceGraphic";
pub const SOURCE_ALPHA: &str = "SourceAlpha";
pub const BACKGROUND_IMAGE: &str = "BackgroundImage";
pub const BACKGROUND_ALPHA: &str = "BackgroundAlpha";

/// What a filter evaluation needs from the drawing context that invoked it.
pub trait FilterHost {
    /// User-space transform of the filtered element.
    fn affine(&self) -> Affine;

    /// Current viewport size, used to resolve percentages in user-space units.
    fn viewport(&self) -> (f64, f64);

    /// The enclosing layers flattened bottom to top, sized like the source graphic.
    fn background(&mut self) -> FxResult<ImageBuffer>;

    /// Render the scene node named `href` into a `width × height` buffer using `affine` as
    /// its user transform. `Ok(None)` when no such node exists.
    fn render_node(
        &mut self,
        href: &str,
        affine: Affine,
        width: u32,
        height: u32,
    ) -> FxResult<Option<ImageBuffer>>;

    /// Load an external raster as straight-alpha RGBA. `Ok(None)` when it cannot be found.
    fn load_image(&mut self, href: &str) -> FxResult<Option<image::RgbaImage>>;
}

/// A published primitive output: a shared buffer plus the pixel bounds it is valid in.
#[derive(Clone, Debug)]
pub struct FilterResult {
    pub image: SharedImage,
    pub bounds: IRect,
}

/// Per-evaluation state. Created at the start of one filter evaluation and dropped at its end.
pub struct FilterContext<'a> {
    host: &'a mut dyn FilterHost,
    source: SharedImage,
    background: Option<SharedImage>,
    width: u32,
    height: u32,
    pub(crate) affine: Affine,
    pub(crate) paffine: Affine,
    channel_map: ChannelMap,
    results: HashMap<String, FilterResult>,
    last: FilterResult,
    pub(crate) filter: &'a FilterNode,
    pub(crate) viewport: (f64, f64),
}

impl<'a> FilterContext<'a> {
    pub fn new(
        filter: &'a FilterNode,
        source: SharedImage,
        host: &'a mut dyn FilterHost,
        bbox: &BoundingBox,
        channel_map: ChannelMap,
    ) -> Self {
        let element = host.affine();
        let viewport = host.viewport();
        let bbox_transform = bbox.unit_transform();
        let in_units = |units: CoordUnits| match units {
            CoordUnits::ObjectBoundingBox => element * bbox_transform,
            CoordUnits::UserSpaceOnUse => element,
        };
        let affine = in_units(filter.filter_units);
        let paffine = in_units(filter.primitive_units);
        let (width, height) = (source.width(), source.height());

        let mut ctx = Self {
            host,
            source: source.clone(),
            background: None,
            width,
            height,
            affine,
            paffine,
            channel_map,
            results: HashMap::new(),
            last: FilterResult {
                image: source,
                bounds: IRect::default(),
            },
            filter,
            viewport,
        };
        ctx.last.bounds = ctx.filter_region();
        ctx
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channel_map(&self) -> ChannelMap {
        self.channel_map
    }

    pub fn affine(&self) -> Affine {
        self.affine
    }

    /// Primitive-space transform.
    pub fn paffine(&self) -> Affine {
        self.paffine
    }

    pub fn last_result(&self) -> &FilterResult {
        &self.last
    }

    pub(crate) fn host(&mut self) -> &mut dyn FilterHost {
        &mut *self.host
    }

    /// A transparent buffer the size of the source graphic.
    pub fn new_surface(&self) -> FxResult<ImageBuffer> {
        ImageBuffer::new(self.width, self.height)
    }

    /// Publish `image` as the last result and, when `name` is non-empty, under `name`.
    pub fn store(&mut self, name: &str, image: ImageBuffer, bounds: IRect) {
        let result = FilterResult {
            image: image.share(),
            bounds,
        };
        if !name.is_empty() {
            self.results.insert(name.to_owned(), result.clone());
        }
        self.last = result;
    }

    /// Publish a result whose valid area is the whole surface.
    pub fn store_full(&mut self, name: &str, image: ImageBuffer) {
        let bounds = IRect::from_size(self.width, self.height);
        self.store(name, image, bounds);
    }

    /// Resolve a named input.
    ///
    /// Reserved names map to the source and background graphics, `""`/`"none"` to the last
    /// result. A name that was never stored yields `Ok(None)`.
    pub fn get(&mut self, name: &str) -> FxResult<Option<FilterResult>> {
        let region = self.filter_region();
        let found = match name {
            SOURCE_GRAPHIC => Some(FilterResult {
                image: self.source.clone(),
                bounds: region,
            }),
            SOURCE_ALPHA => Some(FilterResult {
                image: self.source.alpha_only(self.channel_map)?.share(),
                bounds: region,
            }),
            BACKGROUND_IMAGE => Some(FilterResult {
                image: self.background()?,
                bounds: region,
            }),
            BACKGROUND_ALPHA => {
                let bg = self.background()?;
                Some(FilterResult {
                    image: bg.alpha_only(self.channel_map)?.share(),
                    bounds: region,
                })
            }
            "" | "none" => Some(self.last.clone()),
            other => self.results.get(other).cloned(),
        };
        if found.is_none() {
            tracing::debug!(input = name, "unresolved filter input");
        }
        Ok(found)
    }

    fn background(&mut self) -> FxResult<SharedImage> {
        if let Some(bg) = &self.background {
            return Ok(bg.clone());
        }
        let bg = self.host.background()?;
        if bg.width() != self.width || bg.height() != self.height {
            return Err(FxError::evaluation(format!(
                "background is {}x{}, expected {}x{}",
                bg.width(),
                bg.height(),
                self.width,
                self.height
            )));
        }
        let bg = bg.share();
        self.background = Some(bg.clone());
        Ok(bg)
    }

    pub(crate) fn into_output(self) -> SharedImage {
        self.last.image
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/context.rs"]
mod tests;
