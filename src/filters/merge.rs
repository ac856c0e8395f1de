use crate::effects::composite::over_rect_in_place;
use crate::filters::{FilterContext, FilterPrimitive};
use crate::foundation::error::FxResult;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MergeNode {
    #[serde(default, rename = "in")]
    pub input: String,
}

impl MergeNode {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// `feMerge`: the node inputs stacked with source-over, first node at the bottom.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Merge {
    #[serde(default)]
    pub nodes: Vec<MergeNode>,
}

pub(crate) fn render(
    p: &FilterPrimitive,
    params: &Merge,
    ctx: &mut FilterContext<'_>,
) -> FxResult<()> {
    let Some(bounds) = ctx.resolve_bounds(p, None) else {
        return Ok(());
    };
    let map = ctx.channel_map();
    let mut out = ctx.new_surface()?;
    for node in &params.nodes {
        let Some(layer) = ctx.get(&node.input)? else {
            continue;
        };
        over_rect_in_place(&mut out, &layer.image, bounds, map)?;
    }
    ctx.store(&p.result, out, bounds);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filters/merge.rs"]
mod tests;
