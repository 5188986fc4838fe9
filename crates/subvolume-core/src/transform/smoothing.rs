//! Separable Gaussian presmoothing.
//!
//! Smoothing before resampling acts as an anti-aliasing filter when a
//! transform shrinks content. The kernel is truncated at `4 * sigma` and
//! normalized to unit sum.
//!
//! Windowed smoothing resolves the boundary policy against the full source
//! extent, so values further than [`kernel_radius`] from an interior window
//! edge equal those of smoothing the whole array.

use ndarray::{ArrayD, ArrayViewD, Axis};

use super::BoundaryMode;
use crate::error::{Error, Result};

/// Kernel half-width in units of sigma.
const TRUNCATE: f64 = 4.0;

/// Half-width of the smoothing kernel in samples.
pub fn kernel_radius(sigma: f64) -> usize {
    (TRUNCATE * sigma + 0.5) as usize
}

/// Normalized 1D Gaussian kernel of length `2 * radius + 1`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = kernel_radius(sigma) as i64;
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-(x * x) as f64 / two_sigma2).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Smooth a whole array.
///
/// # Errors
///
/// `InvalidValue` if `sigma` is negative or not finite.
pub fn gaussian_filter(
    input: ArrayViewD<'_, f64>,
    sigma: f64,
    mode: BoundaryMode,
    cval: f64,
) -> Result<ArrayD<f64>> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(Error::invalid("sigma", format!("{sigma} is not a finite non-negative value")));
    }
    let mut data = input.to_owned();
    if sigma > 0.0 {
        let full_shape = input.shape().to_vec();
        let origin = vec![0; full_shape.len()];
        smooth_window(&mut data, &origin, &full_shape, sigma, mode, cval);
    }
    Ok(data)
}

/// Smooth `data`, a window of a larger array starting at `origin`, in place.
pub(crate) fn smooth_window(
    data: &mut ArrayD<f64>,
    origin: &[usize],
    full_shape: &[usize],
    sigma: f64,
    mode: BoundaryMode,
    cval: f64,
) {
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;
    let mut line = Vec::new();

    for axis in 0..data.ndim() {
        let len = data.len_of(Axis(axis)) as i64;
        if len == 0 {
            continue;
        }
        let start = origin[axis] as i64;
        let extent = full_shape[axis];

        for mut lane in data.lanes_mut(Axis(axis)) {
            line.clear();
            line.extend(lane.iter().copied());

            let at = |l: i64| -> f64 {
                if (0..len).contains(&l) {
                    return line[l as usize];
                }
                match mode.resolve(start + l, extent) {
                    None => cval,
                    Some(g) => line[(g as i64 - start).clamp(0, len - 1) as usize],
                }
            };

            for (p, out) in lane.iter_mut().enumerate() {
                let p = p as i64;
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    acc += w * at(p + k as i64 - radius);
                }
                *out = acc;
            }
        }
    }
}
