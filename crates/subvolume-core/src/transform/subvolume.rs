//! Affine resampling restricted to an output bounding box.
//!
//! # Algorithm
//!
//! 1. Map the `2^d` corners of the output box through the matrix and take
//!    the axis-aligned hull of the results.
//! 2. Pad the hull by the interpolation support plus one sample, and by the
//!    smoothing kernel radius when presmoothing.
//! 3. Resolve the padded hull through the boundary policy against the source
//!    shape. In `Constant` mode this is the intersection with the source; the
//!    reflecting modes also cover the samples mirrored back into the array.
//!    If nothing remains, return the fill value without reading.
//! 4. Read exactly that window.
//! 5. Presmooth the window if requested.
//! 6. Sample each output index. The output origin enters through the global
//!    output indices and the window origin is subtracted from the sampled
//!    integer indices, which localizes the matrix to the fetched window
//!    without perturbing the floating-point coordinates.

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use super::sampler::{map_point, resample, Window};
use super::smoothing::{gaussian_filter, kernel_radius, smooth_window};
use super::TransformOptions;
use crate::affine::AffineMatrix;
use crate::array::ArrayLike;
use crate::error::{Error, Result};
use crate::index::BoundingBox;

/// Compute the transformed source restricted to `output`.
///
/// The result has shape `output.shape()` and equals
/// `affine_transform(source, matrix, ..)` cropped to `output`, while reading
/// only the part of `source` the box depends on.
///
/// # Errors
///
/// Raised before any read:
/// - `UnsupportedOperation` for an interpolation order other than 0 or 1
/// - `InvalidValue` for a negative or non-finite sigma
/// - `DimensionMismatch` if the ranks of matrix, box and source differ
/// - `DegenerateTransform` if the linear part is not invertible
///
/// Raised after reading:
/// - `Storage` for any error from the source, unchanged
/// - `ShapeMismatch` if the source returns an array of the wrong shape
///
/// # Example
///
/// ```ignore
/// use subvolume_core::{affine, index, transform, TransformOptions};
///
/// let matrix = affine::build(&[2.0, 2.0], &[45.0], None, None)?;
/// let bbox = index::normalize(&[(..256).into(), (..256).into()], source.shape())?;
/// let out = transform::transform(&source, &matrix, &bbox, &TransformOptions::new().with_order(1))?;
/// assert_eq!(out.shape(), &[256, 256]);
/// ```
pub fn transform<A>(
    source: &A,
    matrix: &AffineMatrix,
    output: &BoundingBox,
    options: &TransformOptions,
) -> Result<ArrayD<f64>>
where
    A: ArrayLike + ?Sized,
{
    let (order, sigma) = options.validate()?;
    let ndim = matrix.ndim();
    if output.ndim() != ndim {
        return Err(Error::dimension("output bounding box rank", ndim, output.ndim()));
    }
    let shape = source.shape().to_vec();
    if shape.len() != ndim {
        return Err(Error::dimension("source rank", ndim, shape.len()));
    }
    matrix.check_invertible()?;

    let out_shape = output.shape();
    if output.is_empty() {
        return Ok(ArrayD::from_elem(IxDyn(&out_shape), options.cval));
    }

    let pad = (order.support() + 1 + sigma.map_or(0, kernel_radius)) as i64;
    let hull = mapped_hull(matrix, output);

    let mut ranges = Vec::with_capacity(ndim);
    for (axis, &(min, max)) in hull.iter().enumerate() {
        let lo = min.floor() as i64 - pad;
        let hi = max.ceil() as i64 + pad;
        match options.mode.image(lo, hi, shape[axis]) {
            Some(range) => ranges.push(range),
            None => {
                tracing::debug!(
                    output = %output,
                    axis,
                    lo,
                    hi,
                    "mapped region lies outside the source, filling with cval"
                );
                return Ok(ArrayD::from_elem(IxDyn(&out_shape), options.cval));
            }
        }
    }
    let input = BoundingBox::from_ranges_unchecked(ranges);
    tracing::debug!(output = %output, input = %input, "reading input window");

    let mut data = source.read(&input).map_err(Error::Storage)?;
    let expected = input.shape();
    if data.shape() != expected.as_slice() {
        return Err(Error::ShapeMismatch {
            what: "storage read",
            expected,
            actual: data.shape().to_vec(),
        });
    }

    let origin = input.origin();
    if let Some(sigma) = sigma {
        smooth_window(&mut data, &origin, &shape, sigma, options.mode, options.cval);
    }

    let window = Window::new(data.view(), origin, &shape, options.mode, options.cval);
    let result = resample(&window, matrix, output, order);
    if window.spilled() > 0 {
        tracing::warn!(
            output = %output,
            input = %input,
            spilled = window.spilled(),
            "samples fell outside the fetched window and were clamped"
        );
    }
    Ok(result)
}

/// Transform a whole in-memory array.
///
/// Every index of an array of shape `output_shape` is mapped through
/// `matrix` and sampled from `input` (presmoothed first when `sigma` is set).
/// This is the reference result [`transform`] reproduces for sub-regions.
///
/// # Errors
///
/// As for [`transform`], minus the storage errors.
pub fn affine_transform(
    input: ArrayViewD<'_, f64>,
    matrix: &AffineMatrix,
    output_shape: &[usize],
    options: &TransformOptions,
) -> Result<ArrayD<f64>> {
    let (order, sigma) = options.validate()?;
    let ndim = matrix.ndim();
    if input.ndim() != ndim {
        return Err(Error::dimension("input rank", ndim, input.ndim()));
    }
    if output_shape.len() != ndim {
        return Err(Error::dimension("output shape rank", ndim, output_shape.len()));
    }
    matrix.check_invertible()?;

    let shape = input.shape().to_vec();
    let smoothed;
    let data = match sigma {
        Some(sigma) => {
            smoothed = gaussian_filter(input.view(), sigma, options.mode, options.cval)?;
            smoothed.view()
        }
        None => input.view(),
    };

    let window = Window::new(data, vec![0; ndim], &shape, options.mode, options.cval);
    Ok(resample(&window, matrix, &BoundingBox::full(output_shape), order))
}

/// Per-axis `(min, max)` of the mapped corners of a non-empty box.
fn mapped_hull(matrix: &AffineMatrix, bbox: &BoundingBox) -> Vec<(f64, f64)> {
    let ndim = bbox.ndim();
    let mut hull = vec![(f64::INFINITY, f64::NEG_INFINITY); ndim];
    let mut corner = vec![0.0; ndim];
    let mut mapped = vec![0.0; ndim];

    for mask in 0..1usize << ndim {
        for (axis, range) in bbox.ranges().iter().enumerate() {
            let upper = (mask >> axis) & 1 == 1;
            corner[axis] = if upper { range.end - 1 } else { range.start } as f64;
        }
        map_point(matrix, &corner, &mut mapped);
        for (h, &x) in hull.iter_mut().zip(&mapped) {
            h.0 = h.0.min(x);
            h.1 = h.1.max(x);
        }
    }
    hull
}
