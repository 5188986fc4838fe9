//! Concrete axis-aligned regions.

use std::fmt;
use std::ops::Range;

use ndarray::{ArrayBase, ArrayView, Data, Dimension, Slice};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A fully resolved axis-aligned region: one half-open `start..stop` range
/// per axis, with `start <= stop`.
///
/// Produced by [`normalize`](crate::index::normalize) or built directly from
/// ranges. Whether the bounds fit a particular array is checked where the box
/// is used, see [`BoundingBox::check_within`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    ranges: Vec<Range<usize>>,
}

impl BoundingBox {
    /// Create a bounding box from per-axis ranges.
    ///
    /// Reversed ranges (`start > stop`) are rejected.
    pub fn new(ranges: Vec<Range<usize>>) -> Result<Self> {
        for (axis, range) in ranges.iter().enumerate() {
            if range.start > range.end {
                return Err(Error::Bounds {
                    axis,
                    value: range.start as i64,
                    extent: range.end,
                });
            }
        }
        Ok(Self { ranges })
    }

    /// The box covering an entire array of the given shape.
    pub fn full(shape: &[usize]) -> Self {
        Self {
            ranges: shape.iter().map(|&n| 0..n).collect(),
        }
    }

    pub(crate) fn from_ranges_unchecked(ranges: Vec<Range<usize>>) -> Self {
        debug_assert!(ranges.iter().all(|r| r.start <= r.end));
        Self { ranges }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.ranges.len()
    }

    /// Per-axis ranges.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Per-axis extents (`stop - start`).
    pub fn shape(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.end - r.start).collect()
    }

    /// Per-axis start indices.
    pub fn origin(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.start).collect()
    }

    /// Total number of elements covered.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// True when any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.ranges.iter().any(|r| r.start == r.end)
    }

    /// Check that the box has the rank of `shape` and lies within it.
    pub fn check_within(&self, shape: &[usize]) -> Result<()> {
        if self.ndim() != shape.len() {
            return Err(Error::dimension("bounding box rank", shape.len(), self.ndim()));
        }
        for (axis, (range, &extent)) in self.ranges.iter().zip(shape).enumerate() {
            if range.end > extent {
                return Err(Error::Bounds {
                    axis,
                    value: range.end as i64,
                    extent,
                });
            }
        }
        Ok(())
    }

    /// True when the box has the rank of `shape` and lies within it.
    pub fn contains(&self, shape: &[usize]) -> bool {
        self.check_within(shape).is_ok()
    }

    /// Intersection with another box of the same rank, `None` if the two
    /// boxes do not overlap on some axis.
    pub fn intersect(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if self.ndim() != other.ndim() {
            return None;
        }
        let mut ranges = Vec::with_capacity(self.ndim());
        for (a, b) in self.ranges.iter().zip(&other.ranges) {
            let start = a.start.max(b.start);
            let stop = a.end.min(b.end);
            if start >= stop {
                return None;
            }
            ranges.push(start..stop);
        }
        Some(BoundingBox { ranges })
    }

    /// View of the part of `array` covered by this box.
    ///
    /// The caller is responsible for the box lying within the array; ndarray
    /// panics on out-of-bounds slices.
    pub fn slice_of<'a, S, D>(&self, array: &'a ArrayBase<S, D>) -> ArrayView<'a, S::Elem, D>
    where
        S: Data,
        D: Dimension,
    {
        array.slice_each_axis(|ax| {
            let range = &self.ranges[ax.axis.index()];
            Slice::from(range.start..range.end)
        })
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", range.start, range.end)?;
        }
        write!(f, "]")
    }
}
