//! Filter-effects engine: filter nodes, the named result cache and the primitive library.
//!
//! A [`FilterNode`] is an immutable description built once alongside the scene tree and
//! evaluated once per element that references it. [`evaluate_filter`] walks the node's
//! children in document order, resolving each primitive's inputs against a per-evaluation
//! [`FilterContext`] and storing its output there.

pub mod blend;
pub mod bounds;
pub mod color_matrix;
pub mod component_transfer;
pub mod composite;
pub mod context;
pub mod convolve_matrix;
pub mod displacement_map;
pub mod flood;
pub mod gaussian_blur;
pub mod image;
pub mod light_source;
pub mod lighting;
pub mod merge;
pub mod morphology;
pub mod offset;
pub mod tile;
pub mod turbulence;

use crate::foundation::core::{ChannelMap, CoordUnits, Length};
use crate::foundation::error::{FxError, FxResult};
use crate::render::bbox::BoundingBox;
use crate::surface::SharedImage;

pub use context::{FilterContext, FilterHost, FilterResult};

/// A `<filter>` element: region, unit systems and an ordered child list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterNode {
    #[serde(default = "default_region_origin")]
    pub x: Length,
    #[serde(default = "default_region_origin")]
    pub y: Length,
    #[serde(default = "default_region_extent")]
    pub width: Length,
    #[serde(default = "default_region_extent")]
    pub height: Length,
    #[serde(default = "default_filter_units")]
    pub filter_units: CoordUnits,
    #[serde(default)]
    pub primitive_units: CoordUnits,
    #[serde(default)]
    pub children: Vec<FilterChild>,
}

fn default_region_origin() -> Length {
    Length::Percent(-0.1)
}

fn default_region_extent() -> Length {
    Length::Percent(1.2)
}

fn default_filter_units() -> CoordUnits {
    CoordUnits::ObjectBoundingBox
}

impl Default for FilterNode {
    fn default() -> Self {
        Self {
            x: default_region_origin(),
            y: default_region_origin(),
            width: default_region_extent(),
            height: default_region_extent(),
            filter_units: default_filter_units(),
            primitive_units: CoordUnits::UserSpaceOnUse,
            children: Vec::new(),
        }
    }
}

impl FilterNode {
    pub fn with_primitives(primitives: impl IntoIterator<Item = FilterPrimitive>) -> Self {
        Self {
            children: primitives.into_iter().map(FilterChild::Primitive).collect(),
            ..Self::default()
        }
    }

    pub fn primitives(&self) -> impl Iterator<Item = &FilterPrimitive> {
        self.children.iter().filter_map(|c| match c {
            FilterChild::Primitive(p) => Some(p),
            FilterChild::Other(_) => None,
        })
    }

    /// Check primitive parameters the way an attribute parser would.
    pub fn validate(&self) -> FxResult<()> {
        for (i, p) in self.primitives().enumerate() {
            p.validate()
                .map_err(|e| FxError::validation(format!("primitive #{i}: {e}")))?;
        }
        Ok(())
    }
}

/// A child of a filter element. Non-primitive children are carried through and skipped.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterChild {
    Primitive(FilterPrimitive),
    /// Any other node kind, by element name.
    Other(String),
}

/// One filter primitive with its common attributes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterPrimitive {
    #[serde(default)]
    pub x: Option<Length>,
    #[serde(default)]
    pub y: Option<Length>,
    #[serde(default)]
    pub width: Option<Length>,
    #[serde(default)]
    pub height: Option<Length>,
    /// Input name; empty or `none` means the previous result.
    #[serde(default, rename = "in")]
    pub input: String,
    /// Result name; empty means the output only becomes the last result.
    #[serde(default)]
    pub result: String,
    #[serde(flatten)]
    pub kind: PrimitiveKind,
}

impl FilterPrimitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            x: None,
            y: None,
            width: None,
            height: None,
            input: String::new(),
            result: String::new(),
            kind,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }

    pub fn with_subregion(
        mut self,
        x: Option<Length>,
        y: Option<Length>,
        width: Option<Length>,
        height: Option<Length>,
    ) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    pub fn has_subregion(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.width.is_some() || self.height.is_some()
    }

    pub fn validate(&self) -> FxResult<()> {
        match &self.kind {
            PrimitiveKind::ColorMatrix(p) => p.validate(),
            PrimitiveKind::ComponentTransfer(p) => p.validate(),
            PrimitiveKind::ConvolveMatrix(p) => p.validate(),
            PrimitiveKind::GaussianBlur(p) => p.validate(),
            PrimitiveKind::Morphology(p) => p.validate(),
            PrimitiveKind::Turbulence(p) => p.validate(),
            PrimitiveKind::DiffuseLighting(p) => p.validate(),
            PrimitiveKind::SpecularLighting(p) => p.validate(),
            PrimitiveKind::Blend(_)
            | PrimitiveKind::Composite(_)
            | PrimitiveKind::DisplacementMap(_)
            | PrimitiveKind::Flood(_)
            | PrimitiveKind::Image(_)
            | PrimitiveKind::Merge(_)
            | PrimitiveKind::MergeNode
            | PrimitiveKind::Offset(_)
            | PrimitiveKind::Tile(_) => Ok(()),
        }
    }
}

/// Per-kind parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrimitiveKind {
    Blend(blend::Blend),
    ColorMatrix(color_matrix::ColorMatrix),
    ComponentTransfer(component_transfer::ComponentTransfer),
    Composite(composite::Composite),
    ConvolveMatrix(convolve_matrix::ConvolveMatrix),
    DiffuseLighting(lighting::DiffuseLighting),
    DisplacementMap(displacement_map::DisplacementMap),
    Morphology(morphology::Morphology),
    Flood(flood::Flood),
    GaussianBlur(gaussian_blur::GaussianBlur),
    Image(image::Image),
    Merge(merge::Merge),
    /// A merge node outside a merge element; evaluates to nothing.
    MergeNode,
    Offset(offset::Offset),
    SpecularLighting(lighting::SpecularLighting),
    Tile(tile::Tile),
    Turbulence(turbulence::Turbulence),
}

/// Run `filter` over `source` and return the final result.
///
/// `bbox` is the filtered element's bounding box; it anchors objectBoundingBox units.
/// Individual primitives that fail (missing input, empty region, allocation failure) produce
/// nothing and evaluation carries on with the next one.
#[tracing::instrument(skip_all, fields(children = filter.children.len()))]
pub fn evaluate_filter(
    filter: &FilterNode,
    source: SharedImage,
    host: &mut dyn FilterHost,
    bbox: &BoundingBox,
    channel_map: ChannelMap,
) -> FxResult<SharedImage> {
    let mut ctx = FilterContext::new(filter, source, host, bbox, channel_map);

    for (index, child) in filter.children.iter().enumerate() {
        let FilterChild::Primitive(primitive) = child else {
            tracing::debug!(index, "skipping non-primitive filter child");
            continue;
        };
        if let Err(err) = render_primitive(primitive, &mut ctx) {
            tracing::warn!(index, result = %primitive.result, error = %err, "filter primitive aborted");
        }
    }

    Ok(ctx.into_output())
}

fn render_primitive(p: &FilterPrimitive, ctx: &mut FilterContext<'_>) -> FxResult<()> {
    match &p.kind {
        PrimitiveKind::Blend(params) => blend::render(p, params, ctx),
        PrimitiveKind::ColorMatrix(params) => color_matrix::render(p, params, ctx),
        PrimitiveKind::ComponentTransfer(params) => component_transfer::render(p, params, ctx),
        PrimitiveKind::Composite(params) => composite::render(p, params, ctx),
        PrimitiveKind::ConvolveMatrix(params) => convolve_matrix::render(p, params, ctx),
        PrimitiveKind::DiffuseLighting(params) => lighting::render_diffuse(p, params, ctx),
        PrimitiveKind::DisplacementMap(params) => displacement_map::render(p, params, ctx),
        PrimitiveKind::Morphology(params) => morphology::render(p, params, ctx),
        PrimitiveKind::Flood(params) => flood::render(p, params, ctx),
        PrimitiveKind::GaussianBlur(params) => gaussian_blur::render(p, params, ctx),
        PrimitiveKind::Image(params) => image::render(p, params, ctx),
        PrimitiveKind::Merge(params) => merge::render(p, params, ctx),
        PrimitiveKind::MergeNode => {
            tracing::debug!("stray merge node has no output");
            Ok(())
        }
        PrimitiveKind::Offset(params) => offset::render(p, params, ctx),
        PrimitiveKind::SpecularLighting(params) => lighting::render_specular(p, params, ctx),
        PrimitiveKind::Tile(params) => tile::render(p, params, ctx),
        PrimitiveKind::Turbulence(params) => turbulence::render(p, params, ctx),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filters/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "../../tests/unit/filters/evaluate.rs"]
mod tests;
