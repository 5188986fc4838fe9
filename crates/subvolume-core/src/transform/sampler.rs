//! Point sampling over an in-memory window of the source array.
//!
//! A [`Window`] holds a fetched region of the source together with its
//! position in the full array. Samples are addressed by *global* input
//! indices: the boundary policy is resolved against the full source extent,
//! then the window origin is subtracted. Keeping the coordinate arithmetic in
//! the global frame makes windowed results identical to sampling the whole
//! array.

use std::cell::Cell;

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use super::{BoundaryMode, InterpolationOrder};
use crate::affine::AffineMatrix;
use crate::index::BoundingBox;

/// A fetched region of the source array.
pub(crate) struct Window<'a> {
    values: Vec<f64>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    origin: Vec<usize>,
    full_shape: &'a [usize],
    mode: BoundaryMode,
    cval: f64,
    spilled: Cell<usize>,
}

impl<'a> Window<'a> {
    /// Wrap `data`, which covers the source region starting at `origin`.
    pub(crate) fn new(
        data: ArrayViewD<'_, f64>,
        origin: Vec<usize>,
        full_shape: &'a [usize],
        mode: BoundaryMode,
        cval: f64,
    ) -> Self {
        let shape = data.shape().to_vec();
        let mut strides = vec![1; shape.len()];
        for axis in (0..shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }
        // Logical (row-major) order regardless of the memory layout of `data`
        let values = data.iter().copied().collect();
        Self {
            values,
            shape,
            strides,
            origin,
            full_shape,
            mode,
            cval,
            spilled: Cell::new(0),
        }
    }

    /// Number of lookups that resolved outside the window and were clamped.
    pub(crate) fn spilled(&self) -> usize {
        self.spilled.get()
    }

    /// Value at a global input index.
    fn value(&self, index: &[i64]) -> f64 {
        let mut offset = 0;
        for axis in 0..index.len() {
            let Some(global) = self.mode.resolve(index[axis], self.full_shape[axis]) else {
                return self.cval;
            };
            let len = self.shape[axis];
            let local = global as i64 - self.origin[axis] as i64;
            let local = if local < 0 || local >= len as i64 {
                self.spilled.set(self.spilled.get() + 1);
                local.clamp(0, len as i64 - 1)
            } else {
                local
            };
            offset += local as usize * self.strides[axis];
        }
        self.values[offset]
    }

    /// Sample at a continuous global input coordinate.
    fn sample(&self, coord: &[f64], order: InterpolationOrder, scratch: &mut Scratch) -> f64 {
        match order {
            InterpolationOrder::Nearest => {
                for (i, &x) in coord.iter().enumerate() {
                    scratch.index[i] = (x + 0.5).floor() as i64;
                }
                self.value(&scratch.index)
            }
            InterpolationOrder::Linear => {
                let ndim = coord.len();
                for (i, &x) in coord.iter().enumerate() {
                    let f = x.floor();
                    scratch.base[i] = f as i64;
                    scratch.frac[i] = x - f;
                }
                let mut acc = 0.0;
                for corner in 0..1usize << ndim {
                    let mut weight = 1.0;
                    for axis in 0..ndim {
                        let upper = (corner >> axis) & 1 == 1;
                        let f = scratch.frac[axis];
                        weight *= if upper { f } else { 1.0 - f };
                        scratch.index[axis] = scratch.base[axis] + upper as i64;
                    }
                    // Zero-weight neighbours may lie past the window edge
                    if weight != 0.0 {
                        acc += weight * self.value(&scratch.index);
                    }
                }
                acc
            }
        }
    }
}

/// Per-call buffers reused across output points.
struct Scratch {
    index: Vec<i64>,
    base: Vec<i64>,
    frac: Vec<f64>,
}

impl Scratch {
    fn new(ndim: usize) -> Self {
        Self {
            index: vec![0; ndim],
            base: vec![0; ndim],
            frac: vec![0.0; ndim],
        }
    }
}

/// `coord = L * point + t`, accumulated in a fixed order.
pub(crate) fn map_point(matrix: &AffineMatrix, point: &[f64], coord: &mut [f64]) {
    let m = matrix.as_array();
    let d = point.len();
    for i in 0..d {
        let mut acc = m[[i, d]];
        for j in 0..d {
            acc += m[[i, j]] * point[j];
        }
        coord[i] = acc;
    }
}

/// Resample every output index of `output` (global output coordinates)
/// from `window`.
pub(crate) fn resample(
    window: &Window<'_>,
    matrix: &AffineMatrix,
    output: &BoundingBox,
    order: InterpolationOrder,
) -> ArrayD<f64> {
    let origin = output.origin();
    let ndim = origin.len();
    let mut point = vec![0.0; ndim];
    let mut coord = vec![0.0; ndim];
    let mut scratch = Scratch::new(ndim);

    ArrayD::from_shape_fn(IxDyn(&output.shape()), |idx| {
        for axis in 0..ndim {
            point[axis] = (origin[axis] + idx[axis]) as f64;
        }
        map_point(matrix, &point, &mut coord);
        window.sample(&coord, order, &mut scratch)
    })
}
