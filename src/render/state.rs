use crate::effects::composite::CompositeOp;

/// `enable-background`: whether an element starts a new background image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnableBackground {
    #[default]
    Accumulate,
    New,
}

/// Per-element compositing state consulted when a discrete layer is pushed and popped.
///
/// Effects are referenced by resource name and resolved against the document when the layer is
/// popped.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerState {
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub comp_op: CompositeOp,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub clip_path: Option<String>,
    #[serde(default)]
    pub enable_background: EnableBackground,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for LayerState {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
            comp_op: CompositeOp::Over,
            filter: None,
            mask: None,
            clip_path: None,
            enable_background: EnableBackground::Accumulate,
        }
    }
}

impl LayerState {
    /// Opacity on the 0..=255 scale.
    pub fn opacity_u8(&self) -> u8 {
        let o = if self.opacity.is_nan() { 1.0 } else { self.opacity };
        (o.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// True when drawing can go straight to the parent target without an offscreen layer.
    ///
    /// `late_clip` is set when the clip-path is in objectBoundingBox units and therefore has to
    /// be applied after the layer is complete.
    pub fn is_passthrough(&self, late_clip: bool) -> bool {
        self.opacity_u8() == 255
            && self.filter.is_none()
            && self.mask.is_none()
            && !late_clip
            && self.comp_op == CompositeOp::Over
            && self.enable_background == EnableBackground::Accumulate
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/state.rs"]
mod tests;
