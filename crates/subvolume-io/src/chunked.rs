//! In-memory chunked arrays.

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{ArrayD, ArrayViewD};
use subvolume_core::{ArrayLike, BoundingBox, ReadError};

use crate::error::Result;
use crate::grid::ChunkGrid;

/// An array held as a grid of separately stored chunks.
///
/// Reads assemble the requested region from the overlapping chunks only and
/// count every chunk they touch, which makes it easy to check how much of a
/// source an operation actually reads.
#[derive(Debug)]
pub struct ChunkedArray {
    grid: ChunkGrid,
    chunks: Vec<ArrayD<f64>>,
    chunk_reads: AtomicUsize,
}

impl ChunkedArray {
    /// Split `data` into chunks of shape `chunks`.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the chunk rank differs from the array rank,
    /// `InvalidLayout` if a chunk extent is zero.
    pub fn from_array(data: ArrayViewD<'_, f64>, chunks: &[usize]) -> Result<Self> {
        let grid = ChunkGrid::new(data.shape(), chunks)?;
        let mut stored = Vec::new();
        for index in grid.all_chunks() {
            stored.push(grid.chunk_box(&index)?.slice_of(&data).to_owned());
        }
        Ok(Self {
            grid,
            chunks: stored,
            chunk_reads: AtomicUsize::new(0),
        })
    }

    /// Chunk shape.
    pub fn chunk_shape(&self) -> &[usize] {
        self.grid.chunks()
    }

    /// Number of chunks along each axis.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.grid.grid_shape()
    }

    /// Total number of chunk reads since creation or the last reset.
    pub fn chunk_reads(&self) -> usize {
        self.chunk_reads.load(Ordering::Relaxed)
    }

    pub fn reset_chunk_reads(&self) {
        self.chunk_reads.store(0, Ordering::Relaxed);
    }

    /// Read the region covered by `bbox`.
    pub fn read_region(&self, bbox: &BoundingBox) -> Result<ArrayD<f64>> {
        let grid_shape = self.grid.grid_shape();
        self.grid.assemble(bbox, |index| {
            self.chunk_reads.fetch_add(1, Ordering::Relaxed);
            let flat = index
                .iter()
                .zip(&grid_shape)
                .fold(0, |acc, (&i, &n)| acc * n + i);
            Ok(self.chunks[flat].clone())
        })
    }
}

impl ArrayLike for ChunkedArray {
    fn shape(&self) -> &[usize] {
        self.grid.shape()
    }

    fn read(&self, bbox: &BoundingBox) -> std::result::Result<ArrayD<f64>, ReadError> {
        Ok(self.read_region(bbox)?)
    }
}
