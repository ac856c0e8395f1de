#![forbid(unsafe_code)]

pub mod effects;
pub mod filters;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod surface;

pub use effects::composite::CompositeOp;
pub use filters::{FilterNode, FilterPrimitive, PrimitiveKind, evaluate_filter};
pub use foundation::core::{ChannelMap, Color, CoordUnits, IRect, Length};
pub use foundation::error::{FxError, FxResult};
pub use render::bbox::BoundingBox;
pub use render::{DrawingCtx, LayerState};
pub use scene::{Document, Node, Shape};
pub use surface::{ImageBuffer, SharedImage};
