//! Affine matrices and their construction from scale, rotation, translation
//! and shear parameters.

mod builder;
mod matrix;

pub use builder::{build, AffineParams};
pub use matrix::AffineMatrix;
