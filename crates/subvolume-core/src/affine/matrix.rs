//! Homogeneous affine matrices.
//!
//! An [`AffineMatrix`] of dimensionality `d` is a `(d + 1) x (d + 1)` matrix
//! whose last row is `[0, ..., 0, 1]`. It follows the backward-mapping
//! convention: multiplying an *output* coordinate (in homogeneous form) yields
//! the *input* coordinate to sample.
//!
//! ```text
//! | l00 l01 t0 |   | o0 |   | i0 |
//! | l10 l11 t1 | * | o1 | = | i1 |
//! |  0   0   1 |   |  1 |   |  1 |
//! ```

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relative tolerance below which the linear part counts as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// A validated homogeneous affine matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Array2<f64>", into = "Array2<f64>")]
pub struct AffineMatrix {
    matrix: Array2<f64>,
}

impl AffineMatrix {
    /// Wrap a matrix, validating its layout.
    ///
    /// Accepts either the full `(d + 1) x (d + 1)` homogeneous form or the
    /// `d x (d + 1)` form with the homogeneous row left implicit.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` for any other shape or `d == 0`
    /// - `InvalidValue` for non-finite entries or a last row other than
    ///   `[0, ..., 0, 1]`
    pub fn from_array(matrix: Array2<f64>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if cols < 2 {
            return Err(Error::dimension("affine matrix columns", 2, cols));
        }
        let ndim = cols - 1;

        let matrix = if rows == ndim {
            let mut full = Array2::zeros((ndim + 1, ndim + 1));
            full.slice_mut(s![..ndim, ..]).assign(&matrix);
            full[[ndim, ndim]] = 1.0;
            full
        } else if rows == ndim + 1 {
            matrix
        } else {
            return Err(Error::dimension("affine matrix rows", ndim + 1, rows));
        };

        if let Some(v) = matrix.iter().find(|v| !v.is_finite()) {
            return Err(Error::invalid("affine matrix", format!("non-finite entry {v}")));
        }

        let last = matrix.row(ndim);
        let homogeneous = last
            .iter()
            .enumerate()
            .all(|(j, &v)| if j == ndim { v == 1.0 } else { v == 0.0 });
        if !homogeneous {
            return Err(Error::invalid(
                "affine matrix",
                format!("last row must be [0, ..., 0, 1], got {last}"),
            ));
        }

        Ok(Self { matrix })
    }

    /// Build from a linear part and a translation vector.
    pub fn from_parts(linear: ArrayView2<f64>, translation: ArrayView1<f64>) -> Result<Self> {
        let (rows, cols) = linear.dim();
        if rows != cols {
            return Err(Error::dimension("linear part columns", rows, cols));
        }
        if translation.len() != rows {
            return Err(Error::dimension("translation length", rows, translation.len()));
        }
        let mut matrix = Array2::zeros((rows + 1, rows + 1));
        matrix.slice_mut(s![..rows, ..rows]).assign(&linear);
        matrix.slice_mut(s![..rows, rows]).assign(&translation);
        matrix[[rows, rows]] = 1.0;
        Self::from_array(matrix)
    }

    /// The identity transform in `ndim` dimensions.
    pub fn identity(ndim: usize) -> Self {
        Self {
            matrix: Array2::eye(ndim + 1),
        }
    }

    /// Spatial dimensionality `d`.
    pub fn ndim(&self) -> usize {
        self.matrix.nrows() - 1
    }

    /// The full homogeneous matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// The top-left `d x d` block.
    pub fn linear(&self) -> ArrayView2<'_, f64> {
        let d = self.ndim();
        self.matrix.slice(s![..d, ..d])
    }

    /// The translation column (rows `0..d`).
    pub fn translation(&self) -> ArrayView1<'_, f64> {
        let d = self.ndim();
        self.matrix.slice(s![..d, d])
    }

    /// Map a `d`-dimensional point.
    ///
    /// # Panics
    ///
    /// Panics if `point.len() != self.ndim()`.
    pub fn apply(&self, point: &[f64]) -> Vec<f64> {
        let d = self.ndim();
        assert_eq!(point.len(), d, "point rank must match matrix rank");
        (0..d)
            .map(|i| {
                let row = self.matrix.row(i);
                let mut acc = row[d];
                for (j, &p) in point.iter().enumerate() {
                    acc += row[j] * p;
                }
                acc
            })
            .collect()
    }

    /// Matrix product `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineMatrix) -> Result<AffineMatrix> {
        if self.ndim() != other.ndim() {
            return Err(Error::dimension("composed matrix rank", self.ndim(), other.ndim()));
        }
        Ok(Self {
            matrix: self.matrix.dot(&other.matrix),
        })
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        let (det, _) = lu_determinant(self.linear().to_owned());
        det
    }

    /// Fail with `DegenerateTransform` unless the linear part is invertible.
    pub fn check_invertible(&self) -> Result<()> {
        let (det, singular) = lu_determinant(self.linear().to_owned());
        if singular {
            return Err(Error::DegenerateTransform { determinant: det });
        }
        Ok(())
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Result<AffineMatrix> {
        let inv_linear = invert(self.linear().to_owned())?;
        let inv_translation: Array1<f64> = -inv_linear.dot(&self.translation());
        Self::from_parts(inv_linear.view(), inv_translation.view())
    }

    /// Re-express the transform for a sub-problem.
    ///
    /// The returned matrix maps an output index *relative to* `output_origin`
    /// to an input coordinate *relative to* `input_origin`:
    ///
    /// ```text
    /// t' = L * output_origin + t - input_origin
    /// ```
    pub fn localize(&self, output_origin: &[usize], input_origin: &[usize]) -> Result<AffineMatrix> {
        let d = self.ndim();
        if output_origin.len() != d {
            return Err(Error::dimension("output origin rank", d, output_origin.len()));
        }
        if input_origin.len() != d {
            return Err(Error::dimension("input origin rank", d, input_origin.len()));
        }

        let out: Vec<f64> = output_origin.iter().map(|&v| v as f64).collect();
        let shifted = self.apply(&out);

        let mut matrix = self.matrix.clone();
        for i in 0..d {
            matrix[[i, d]] = shifted[i] - input_origin[i] as f64;
        }
        Ok(Self { matrix })
    }
}

impl TryFrom<Array2<f64>> for AffineMatrix {
    type Error = Error;

    fn try_from(matrix: Array2<f64>) -> Result<Self> {
        Self::from_array(matrix)
    }
}

impl From<AffineMatrix> for Array2<f64> {
    fn from(m: AffineMatrix) -> Self {
        m.matrix
    }
}

/// Determinant by LU decomposition with partial pivoting.
///
/// Returns the determinant and whether the matrix is numerically singular
/// relative to the magnitude of its entries.
fn lu_determinant(mut a: Array2<f64>) -> (f64, bool) {
    let n = a.nrows();
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return (0.0, true);
    }

    let mut det = 1.0;
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= SINGULAR_TOLERANCE * scale {
            return (0.0, true);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            det = -det;
        }
        let p = a[[col, col]];
        det *= p;
        for row in col + 1..n {
            let factor = a[[row, col]] / p;
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
        }
    }
    (det, false)
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(mut a: Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let (det, singular) = lu_determinant(a.clone());
    if singular {
        return Err(Error::DegenerateTransform { determinant: det });
    }

    let mut inv = Array2::<f64>::eye(n);
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
                inv.swap([pivot, k], [col, k]);
            }
        }
        let p = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= p;
            inv[[col, k]] /= p;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }
    Ok(inv)
}
