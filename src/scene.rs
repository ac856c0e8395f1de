//! Scene description consumed by the drawing context.
//!
//! Geometry is limited to filled rectangles and circles; the interesting part is the layer state
//! each node carries and the filters, masks and clip-paths it references.

use std::collections::BTreeMap;

use crate::filters::FilterNode;
use crate::foundation::core::{Affine, Color, Point, Rect};
use crate::foundation::error::{FxError, FxResult};
use crate::render::clip::ClipPath;
use crate::render::mask::Mask;
use crate::render::state::LayerState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// Named effect definitions referenced from [`LayerState`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub filters: BTreeMap<String, FilterNode>,
    #[serde(default)]
    pub masks: BTreeMap<String, Mask>,
    #[serde(default)]
    pub clip_paths: BTreeMap<String, ClipPath>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub canvas: Canvas,
    #[serde(default)]
    pub resources: Resources,
    pub root: Node,
}

impl Document {
    pub fn from_json(json: &str) -> FxResult<Self> {
        let doc: Document = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> FxResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(FxError::validation("canvas width/height must be > 0"));
        }
        for (name, filter) in &self.resources.filters {
            filter
                .validate()
                .map_err(|e| FxError::validation(format!("filter '{name}': {e}")))?;
        }
        Ok(())
    }

    /// Depth-first lookup by `id`, searching the root tree and then resource contents.
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        let id = id.strip_prefix('#').unwrap_or(id);
        self.root.find(id).or_else(|| {
            let masks = self.resources.masks.values().flat_map(|m| &m.children);
            let clips = self.resources.clip_paths.values().flat_map(|c| &c.children);
            masks.chain(clips).find_map(|n| n.find(id))
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "identity")]
    pub transform: Affine,
    #[serde(flatten)]
    pub state: LayerState,
    #[serde(flatten)]
    pub kind: NodeKind,
}

fn identity() -> Affine {
    Affine::IDENTITY
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Group {
        #[serde(default)]
        children: Vec<Node>,
    },
    Shape {
        shape: Shape,
        #[serde(default)]
        fill: Color,
    },
}

impl Node {
    pub fn group(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Group { children })
    }

    pub fn shape(shape: Shape, fill: Color) -> Self {
        Self::new(NodeKind::Shape { shape, fill })
    }

    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            transform: Affine::IDENTITY,
            state: LayerState::default(),
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_state(mut self, state: LayerState) -> Self {
        self.state = state;
        self
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Group { children } => children,
            NodeKind::Shape { .. } => &[],
        }
    }

    fn find(&self, id: &str) -> Option<&Node> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
}

impl Shape {
    /// Geometric bounds in user space.
    pub fn bounds(&self) -> Rect {
        match *self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => Rect::new(x, y, x + width.max(0.0), y + height.max(0.0)),
            Shape::Circle { cx, cy, r } => {
                let r = r.max(0.0);
                Rect::new(cx - r, cy - r, cx + r, cy + r)
            }
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        match *self {
            Shape::Rect { .. } => {
                let b = self.bounds();
                p.x >= b.x0 && p.x < b.x1 && p.y >= b.y0 && p.y < b.y1
            }
            Shape::Circle { cx, cy, r } => {
                let (dx, dy) = (p.x - cx, p.y - cy);
                dx * dx + dy * dy <= r * r
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/scene.rs"]
mod tests;
