//! Region handling: loose per-axis specs and resolved bounding boxes.

mod bbox;
mod normalize;

pub use bbox::BoundingBox;
pub use normalize::{normalize, AxisSpec};
