//! Subvolume Core - affine resampling of large n-dimensional arrays
//!
//! Computes the result of an affine transform restricted to an output
//! bounding box, reading only the part of the source array the box depends
//! on. Results match transforming the whole array and cropping.
//!
//! - [`index`]: region normalization and bounding boxes
//! - [`affine`]: homogeneous matrices and the scale/rotation/shear builder
//! - [`transform`]: the resampling engine
//!
//! Sources implement [`ArrayLike`]; in-memory `ndarray` arrays already do.

mod array;
pub mod affine;
pub mod error;
pub mod index;
pub mod transform;

pub use affine::{build, AffineMatrix, AffineParams};
pub use array::{ArrayLike, ReadError};
pub use error::{Error, Result};
pub use index::{normalize, AxisSpec, BoundingBox};
pub use transform::{
    affine_transform, gaussian_filter, transform, BoundaryMode, InterpolationOrder,
    TransformOptions,
};
