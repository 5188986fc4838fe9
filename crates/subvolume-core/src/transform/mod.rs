//! Affine resampling of whole arrays and of sub-regions.
//!
//! - [`transform`]: resample only the output box, reading the minimal window
//! - [`affine_transform`]: resample a whole in-memory array
//! - [`gaussian_filter`]: the presmoothing filter on its own

mod mode;
mod sampler;
mod smoothing;
mod subvolume;
mod types;

pub use mode::BoundaryMode;
pub use smoothing::{gaussian_filter, kernel_radius};
pub use subvolume::{affine_transform, transform};
pub use types::{InterpolationOrder, TransformOptions};
