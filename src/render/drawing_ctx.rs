use std::path::PathBuf;

use anyhow::Context as _;

use crate::effects::composite::{CompositeOp, lerp_coverage, over, paint_in_place};
use crate::filters::{FilterHost, evaluate_filter};
use crate::foundation::core::{Affine, ChannelMap, Color, CoordUnits, Rect};
use crate::foundation::error::{FxError, FxResult};
use crate::render::bbox::BoundingBox;
use crate::render::clip::intersect_coverage;
use crate::render::rasterize;
use crate::render::state::LayerState;
use crate::scene::{Document, Node, NodeKind, Shape};
use crate::surface::{ImageBuffer, SharedImage};

/// Nested `render_node` calls allowed before giving up on a reference cycle.
const MAX_NESTING: usize = 16;

/// One offscreen target with the extents drawn into it so far.
#[derive(Debug)]
struct RenderLayer {
    target: ImageBuffer,
    /// Coverage applied to everything painted into `target`; `None` means unclipped.
    clip: Option<Vec<u8>>,
    bbox: BoundingBox,
    /// Device-space extent of painted pixels.
    ink_bbox: BoundingBox,
}

impl RenderLayer {
    fn new(target: ImageBuffer, clip: Option<Vec<u8>>, affine: Affine) -> Self {
        Self {
            target,
            clip,
            bbox: BoundingBox::new(affine),
            ink_bbox: BoundingBox::new(Affine::IDENTITY),
        }
    }
}

#[derive(Debug)]
struct Frame {
    state: LayerState,
    saved_clip: Option<Vec<u8>>,
    pushed: bool,
}

/// Drawing state for one document: the current transform and a stack of discrete layers.
///
/// Every element is bracketed by [`DrawingCtx::push_discrete_layer`] and
/// [`DrawingCtx::pop_discrete_layer`]. A push only allocates an offscreen target when the
/// element's [`LayerState`] needs one; otherwise drawing lands directly on the parent.
pub struct DrawingCtx<'d> {
    doc: &'d Document,
    width: u32,
    height: u32,
    channel_map: ChannelMap,
    affine: Affine,
    base: RenderLayer,
    layers: Vec<RenderLayer>,
    frames: Vec<Frame>,
    assets_root: Option<PathBuf>,
    depth: usize,
}

impl<'d> DrawingCtx<'d> {
    pub fn new(
        doc: &'d Document,
        width: u32,
        height: u32,
        channel_map: ChannelMap,
    ) -> FxResult<Self> {
        let target = ImageBuffer::new(width, height)?;
        Ok(Self {
            doc,
            width,
            height,
            channel_map,
            affine: Affine::IDENTITY,
            base: RenderLayer::new(target, None, Affine::IDENTITY),
            layers: Vec::new(),
            frames: Vec::new(),
            assets_root: None,
            depth: 0,
        })
    }

    /// A context sized to the document canvas with RGBA byte order.
    pub fn for_document(doc: &'d Document) -> FxResult<Self> {
        Self::new(doc, doc.canvas.width, doc.canvas.height, ChannelMap::RGBA)
    }

    /// Directory that external image references are resolved against.
    pub fn with_assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets_root = Some(root.into());
        self
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

    pub fn set_affine(&mut self, affine: Affine) {
        self.affine = affine;
    }

    pub(crate) fn viewport_size(&self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }

    /// Number of offscreen layers currently open.
    pub fn layer_depth(&self) -> usize {
        self.layers.len()
    }

    /// The bottom-most target.
    pub fn target(&self) -> &ImageBuffer {
        &self.base.target
    }

    pub fn into_target(self) -> ImageBuffer {
        self.base.target
    }

    /// Geometric bounding box of the current layer.
    pub fn bbox(&self) -> &BoundingBox {
        &self.top().bbox
    }

    /// Painted-pixel bounding box of the current layer, in device space.
    pub fn ink_bbox(&self) -> &BoundingBox {
        &self.top().ink_bbox
    }

    fn top(&self) -> &RenderLayer {
        self.layers.last().unwrap_or(&self.base)
    }

    fn top_mut(&mut self) -> &mut RenderLayer {
        self.layers.last_mut().unwrap_or(&mut self.base)
    }

    /// Draw the document root.
    pub fn draw(&mut self) -> FxResult<()> {
        let doc = self.doc;
        self.draw_node(&doc.root)
    }

    pub fn draw_node(&mut self, node: &Node) -> FxResult<()> {
        let saved = self.affine;
        self.affine = saved * node.transform;
        self.push_discrete_layer(&node.state);
        let drawn = match &node.kind {
            NodeKind::Group { children } => children.iter().try_for_each(|c| self.draw_node(c)),
            NodeKind::Shape { shape, fill } => {
                self.fill_shape(shape, *fill);
                Ok(())
            }
        };
        let popped = self.pop_discrete_layer();
        self.affine = saved;
        drawn.and(popped)
    }

    /// Open a layer for an element with `state`.
    ///
    /// User-space clip-paths are intersected into the current clip right away. Clip-paths in
    /// objectBoundingBox units wait for the layer's bounding box and force an offscreen layer.
    #[tracing::instrument(level = "trace", skip_all, fields(depth = self.frames.len()))]
    pub fn push_discrete_layer(&mut self, state: &LayerState) {
        let doc = self.doc;
        let saved_clip = self.top().clip.clone();

        let mut late_clip = false;
        if let Some(name) = &state.clip_path {
            match doc.resources.clip_paths.get(name) {
                Some(clip) if clip.units == CoordUnits::ObjectBoundingBox => late_clip = true,
                Some(clip) => {
                    let coverage = self.clip_coverage(clip, self.bbox());
                    let top = self.top_mut();
                    top.clip = Some(intersect_coverage(top.clip.take(), coverage));
                }
                None => tracing::debug!(clip_path = %name, "clip-path not found"),
            }
        }

        let mut pushed = false;
        if !state.is_passthrough(late_clip) {
            match ImageBuffer::new(self.width, self.height) {
                Ok(target) => {
                    self.layers
                        .push(RenderLayer::new(target, None, self.affine));
                    pushed = true;
                }
                Err(err) => tracing::warn!(error = %err, "layer allocation failed; drawing in place"),
            }
        }

        self.frames.push(Frame {
            state: state.clone(),
            saved_clip,
            pushed,
        });
    }

    /// Close the layer opened by the matching [`Self::push_discrete_layer`], filtering,
    /// clipping, masking and compositing it onto its parent.
    #[tracing::instrument(level = "trace", skip_all, fields(depth = self.frames.len()))]
    pub fn pop_discrete_layer(&mut self) -> FxResult<()> {
        let Some(frame) = self.frames.pop() else {
            return Err(FxError::evaluation(
                "pop_discrete_layer without a matching push",
            ));
        };
        let result = if frame.pushed {
            match self.layers.pop() {
                Some(child) => self.composite_layer(child, &frame.state),
                None => Err(FxError::evaluation("layer stack underflow")),
            }
        } else {
            Ok(())
        };
        self.top_mut().clip = frame.saved_clip;
        result
    }

    fn composite_layer(&mut self, child: RenderLayer, state: &LayerState) -> FxResult<()> {
        let doc = self.doc;
        let map = self.channel_map;
        let bbox = child.bbox;

        let mut surface: SharedImage = child.target.share();
        if let Some(name) = &state.filter {
            match doc.resources.filters.get(name) {
                Some(filter) => match evaluate_filter(filter, surface.clone(), self, &bbox, map) {
                    Ok(out) => surface = out,
                    Err(err) => {
                        tracing::warn!(filter = %name, error = %err, "filter failed; compositing unfiltered layer");
                    }
                },
                None => tracing::debug!(filter = %name, "filter not found"),
            }
        }

        let mut coverage = self.top().clip.clone();
        if let Some(name) = &state.clip_path
            && let Some(clip) = doc.resources.clip_paths.get(name)
            && clip.units == CoordUnits::ObjectBoundingBox
        {
            let late = self.clip_coverage(clip, &bbox);
            coverage = Some(intersect_coverage(coverage, late));
        }

        let mut opacity = state.opacity_u8();
        if let Some(name) = &state.mask {
            let Some(mask) = doc.resources.masks.get(name) else {
                tracing::debug!(mask = %name, "mask not found; layer dropped");
                self.merge_extents(&bbox, &child.ink_bbox);
                return Ok(());
            };
            let masked = self.mask_coverage(mask, &bbox, opacity)?;
            coverage = Some(intersect_coverage(coverage, masked));
            opacity = 255;
        }

        let parent = self.top_mut();
        paint_in_place(
            &mut parent.target,
            &surface,
            state.comp_op,
            opacity,
            coverage.as_deref(),
            map,
        )?;
        self.merge_extents(&bbox, &child.ink_bbox);
        Ok(())
    }

    fn merge_extents(&mut self, bbox: &BoundingBox, ink: &BoundingBox) {
        let parent = self.top_mut();
        parent.bbox.insert(bbox);
        parent.ink_bbox.insert(ink);
    }

    /// Open a scratch layer that is not tied to a scene element.
    pub(crate) fn begin_offscreen(&mut self, clip: Option<Vec<u8>>) -> FxResult<()> {
        let target = ImageBuffer::new(self.width, self.height)?;
        self.layers.push(RenderLayer::new(target, clip, self.affine));
        Ok(())
    }

    pub(crate) fn end_offscreen(&mut self) -> FxResult<ImageBuffer> {
        self.layers
            .pop()
            .map(|layer| layer.target)
            .ok_or_else(|| FxError::evaluation("layer stack underflow"))
    }

    fn fill_shape(&mut self, shape: &Shape, fill: Color) {
        let (w, h) = (self.width, self.height);
        let affine = self.affine;
        let map = self.channel_map;
        let src = fill.to_premul();
        let geometric = BoundingBox::with_rect(shape.bounds(), affine);

        let RenderLayer {
            target,
            clip,
            bbox,
            ink_bbox,
        } = self.top_mut();

        let mut ink: Option<(i32, i32, i32, i32)> = None;
        rasterize(shape, affine, w, h, |x, y| {
            let c = clip
                .as_ref()
                .map_or(255, |c| c[y as usize * w as usize + x as usize]);
            if c == 0 {
                return;
            }
            let d = target.rgba(x, y, map);
            target.set_rgba(x, y, map, lerp_coverage(d, over(d, src, 1.0), c));
            ink = Some(match ink {
                None => (x, y, x + 1, y + 1),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
            });
        });

        bbox.insert(&geometric);
        if let Some((x0, y0, x1, y1)) = ink {
            let painted = Rect::new(f64::from(x0), f64::from(y0), f64::from(x1), f64::from(y1));
            ink_bbox.insert(&BoundingBox::with_rect(painted, Affine::IDENTITY));
        }
    }
}

impl FilterHost for DrawingCtx<'_> {
    fn affine(&self) -> Affine {
        self.affine
    }

    fn viewport(&self) -> (f64, f64) {
        self.viewport_size()
    }

    fn background(&mut self) -> FxResult<ImageBuffer> {
        let mut out = ImageBuffer::new(self.width, self.height)?;
        for layer in std::iter::once(&self.base).chain(&self.layers) {
            paint_in_place(
                &mut out,
                &layer.target,
                CompositeOp::Over,
                255,
                None,
                self.channel_map,
            )?;
        }
        Ok(out)
    }

    fn render_node(
        &mut self,
        href: &str,
        affine: Affine,
        width: u32,
        height: u32,
    ) -> FxResult<Option<ImageBuffer>> {
        let doc = self.doc;
        let Some(node) = doc.find_node(href) else {
            return Ok(None);
        };
        if self.depth >= MAX_NESTING {
            return Err(FxError::evaluation(format!(
                "node '{href}' nested more than {MAX_NESTING} levels deep"
            )));
        }
        let mut sub = DrawingCtx::new(doc, width, height, self.channel_map)?;
        sub.assets_root = self.assets_root.clone();
        sub.depth = self.depth + 1;
        sub.affine = affine;
        sub.draw_node(node)?;
        Ok(Some(sub.into_target()))
    }

    fn load_image(&mut self, href: &str) -> FxResult<Option<image::RgbaImage>> {
        let Some(root) = &self.assets_root else {
            tracing::debug!(href, "no assets root for external image");
            return Ok(None);
        };
        let path = root.join(href);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read image '{}'", path.display()))?;
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("decode image '{}'", path.display()))?;
        Ok(Some(decoded.to_rgba8()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/drawing_ctx.rs"]
mod tests;
