//! Regular chunk grids and region assembly.

use std::ops::Range;

use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use subvolume_core::BoundingBox;

use crate::error::{Result, StorageError};

/// A shape split into equally sized chunks; edge chunks are clipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkGrid {
    shape: Vec<usize>,
    chunks: Vec<usize>,
}

impl ChunkGrid {
    pub(crate) fn new(shape: &[usize], chunks: &[usize]) -> Result<Self> {
        if chunks.len() != shape.len() {
            return Err(StorageError::ShapeMismatch {
                what: "chunk rank",
                expected: shape.to_vec(),
                actual: chunks.to_vec(),
            });
        }
        if chunks.contains(&0) {
            return Err(StorageError::InvalidLayout(format!(
                "chunk shape {chunks:?} has a zero extent"
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            chunks: chunks.to_vec(),
        })
    }

    pub(crate) fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub(crate) fn chunks(&self) -> &[usize] {
        &self.chunks
    }

    /// Number of chunks along each axis.
    pub(crate) fn grid_shape(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(&n, &c)| n.div_ceil(c))
            .collect()
    }

    /// Region of the array covered by the chunk at `index`.
    pub(crate) fn chunk_box(&self, index: &[usize]) -> Result<BoundingBox> {
        let ranges = index
            .iter()
            .zip(self.shape.iter().zip(&self.chunks))
            .map(|(&i, (&n, &c))| (i * c).min(n)..((i + 1) * c).min(n))
            .collect();
        Ok(BoundingBox::new(ranges)?)
    }

    /// Indices of all chunks overlapping `bbox`, in row-major order.
    pub(crate) fn chunks_in(&self, bbox: &BoundingBox) -> Vec<Vec<usize>> {
        if bbox.is_empty() {
            return Vec::new();
        }
        let spans: Vec<Range<usize>> = bbox
            .ranges()
            .iter()
            .zip(&self.chunks)
            .map(|(r, &c)| r.start / c..(r.end - 1) / c + 1)
            .collect();
        let mut out = Vec::new();
        let mut index: Vec<usize> = spans.iter().map(|s| s.start).collect();
        loop {
            out.push(index.clone());
            // Odometer increment, last axis fastest
            let mut axis = index.len();
            loop {
                if axis == 0 {
                    return out;
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < spans[axis].end {
                    break;
                }
                index[axis] = spans[axis].start;
            }
        }
    }

    /// Row-major list of every chunk index.
    pub(crate) fn all_chunks(&self) -> Vec<Vec<usize>> {
        self.chunks_in(&BoundingBox::full(&self.shape))
    }

    /// Assemble the region `bbox` from the chunks overlapping it.
    pub(crate) fn assemble<F>(&self, bbox: &BoundingBox, mut read_chunk: F) -> Result<ArrayD<f64>>
    where
        F: FnMut(&[usize]) -> Result<ArrayD<f64>>,
    {
        bbox.check_within(&self.shape)?;
        let mut out = ArrayD::zeros(IxDyn(&bbox.shape()));
        for index in self.chunks_in(bbox) {
            let chunk_box = self.chunk_box(&index)?;
            let chunk = read_chunk(&index)?;
            if chunk.shape() != chunk_box.shape().as_slice() {
                return Err(StorageError::ShapeMismatch {
                    what: "chunk",
                    expected: chunk_box.shape(),
                    actual: chunk.shape().to_vec(),
                });
            }
            let Some(overlap) = chunk_box.intersect(bbox) else {
                continue;
            };
            let src = local(chunk.view(), &overlap, &chunk_box.origin());
            out.slice_each_axis_mut(|ax| {
                let r = &overlap.ranges()[ax.axis.index()];
                let o = bbox.ranges()[ax.axis.index()].start;
                Slice::from(r.start - o..r.end - o)
            })
            .assign(&src);
        }
        Ok(out)
    }
}

/// View of `region` inside an array whose first element sits at `origin`.
fn local<'a>(
    mut view: ArrayViewD<'a, f64>,
    region: &BoundingBox,
    origin: &[usize],
) -> ArrayViewD<'a, f64> {
    view.slice_each_axis_inplace(|ax| {
        let r = &region.ranges()[ax.axis.index()];
        let o = origin[ax.axis.index()];
        Slice::from(r.start - o..r.end - o)
    });
    view
}
