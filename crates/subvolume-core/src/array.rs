//! The read contract between the resampler and array storage.
//!
//! Storage backends (in-memory arrays, chunked stores, image files) expose a
//! fixed shape and read-only access to axis-aligned regions. The resampler
//! only ever borrows a source for the duration of one call.

use ndarray::{ArrayBase, ArrayD, Data, Dimension};

use crate::index::BoundingBox;

/// Error type returned by storage backends.
///
/// Kept opaque so backend failures reach the caller unchanged.
pub type ReadError = Box<dyn std::error::Error + Send + Sync>;

/// A read-only n-dimensional array, possibly larger than memory.
///
/// Implementations must return an array whose shape equals
/// `bbox.shape()` for any box within [`ArrayLike::shape`]. Reads are
/// side-effect free from the caller's point of view; implementations that are
/// also `Sync` may be read from several threads at once.
pub trait ArrayLike {
    /// Extent of each axis.
    fn shape(&self) -> &[usize];

    /// Read the region covered by `bbox` into memory.
    fn read(&self, bbox: &BoundingBox) -> Result<ArrayD<f64>, ReadError>;

    /// Number of axes.
    fn ndim(&self) -> usize {
        self.shape().len()
    }
}

impl<S, D> ArrayLike for ArrayBase<S, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    fn shape(&self) -> &[usize] {
        ArrayBase::shape(self)
    }

    fn read(&self, bbox: &BoundingBox) -> Result<ArrayD<f64>, ReadError> {
        bbox.check_within(ArrayBase::shape(self))?;
        Ok(bbox.slice_of(self).to_owned().into_dyn())
    }
}

impl<T: ArrayLike + ?Sized> ArrayLike for &T {
    fn shape(&self) -> &[usize] {
        (**self).shape()
    }

    fn read(&self, bbox: &BoundingBox) -> Result<ArrayD<f64>, ReadError> {
        (**self).read(bbox)
    }
}

impl<T: ArrayLike + ?Sized> ArrayLike for Box<T> {
    fn shape(&self) -> &[usize] {
        (**self).shape()
    }

    fn read(&self, bbox: &BoundingBox) -> Result<ArrayD<f64>, ReadError> {
        (**self).read(bbox)
    }
}
