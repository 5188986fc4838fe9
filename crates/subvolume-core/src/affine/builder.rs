//! Construction of affine matrices from semantic parameters.
//!
//! # Convention
//!
//! The linear part is `L = S * R * H` where
//! - `S` is the diagonal scale matrix,
//! - `R` is the rotation (angles in degrees, positive = counter-clockwise),
//! - `H` is the unit upper-triangular shear matrix (identity by default).
//!
//! For 3D, `R = R0(a) * R1(b) * R2(c)`: rotation about the first axis, then
//! the second, then the third. Downstream results depend on this order.
//!
//! The translation occupies the last column. Since matrices map output
//! coordinates to input coordinates, a scale of 2 samples every second input
//! element, shrinking the content.

use ndarray::{array, Array1, Array2};
use serde::{Deserialize, Serialize};

use super::AffineMatrix;
use crate::error::{Error, Result};

/// Semantic parameters of an affine transform.
///
/// Deserializable so transforms can be read from configuration files:
///
/// ```ignore
/// let params: AffineParams = serde_json::from_str(
///     r#"{"scale": [2.0, 2.0], "rotation": [45.0], "translation": [-1.0, 1.0]}"#,
/// )?;
/// let matrix = params.build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineParams {
    /// Per-axis scale factors; their count determines the dimensionality.
    pub scale: Vec<f64>,
    /// Rotation angles in degrees: one for 2D, three for 3D.
    pub rotation: Vec<f64>,
    /// Translation vector, zero when absent.
    #[serde(default)]
    pub translation: Option<Vec<f64>>,
    /// Shear factors (`[s01]` for 2D, `[s01, s02, s12]` for 3D), none when absent.
    #[serde(default)]
    pub shear: Option<Vec<f64>>,
}

impl AffineParams {
    /// Build the matrix described by these parameters.
    pub fn build(&self) -> Result<AffineMatrix> {
        build(
            &self.scale,
            &self.rotation,
            self.translation.as_deref(),
            self.shear.as_deref(),
        )
    }
}

/// Build a homogeneous affine matrix.
///
/// # Arguments
///
/// * `scale` - Per-axis scale factors, length 2 or 3
/// * `rotation` - Angles in degrees: 1 for 2D, 3 for 3D
/// * `translation` - Optional translation, same length as `scale`
/// * `shear` - Optional shear factors: 1 for 2D, 3 for 3D
///
/// # Errors
///
/// `DimensionMismatch` if the dimensionality is not 2 or 3, or if any
/// parameter length disagrees with it.
///
/// # Example
///
/// ```ignore
/// use subvolume_core::affine::build;
///
/// let m = build(&[2.0, 2.0], &[45.0], None, None)?;
/// assert_eq!(m.ndim(), 2);
/// ```
pub fn build(
    scale: &[f64],
    rotation: &[f64],
    translation: Option<&[f64]>,
    shear: Option<&[f64]>,
) -> Result<AffineMatrix> {
    let ndim = scale.len();
    let n_angles = match ndim {
        2 => 1,
        3 => 3,
        _ => return Err(Error::dimension("scale length (2 or 3)", 3, ndim)),
    };
    if rotation.len() != n_angles {
        return Err(Error::dimension("rotation angles", n_angles, rotation.len()));
    }
    if let Some(t) = translation {
        if t.len() != ndim {
            return Err(Error::dimension("translation length", ndim, t.len()));
        }
    }
    if let Some(h) = shear {
        if h.len() != n_angles {
            return Err(Error::dimension("shear factors", n_angles, h.len()));
        }
    }

    let s = Array2::from_diag(&Array1::from(scale.to_vec()));
    let r = if ndim == 2 {
        rotation_2d(rotation[0])
    } else {
        rotation_3d(rotation[0], rotation[1], rotation[2])
    };
    let h = shear.map_or_else(|| Array2::eye(ndim), |h| shear_matrix(ndim, h));

    let linear = s.dot(&r).dot(&h);
    let translation = translation.map_or_else(|| Array1::zeros(ndim), |t| Array1::from(t.to_vec()));

    AffineMatrix::from_parts(linear.view(), translation.view())
}

/// Standard 2D rotation, counter-clockwise for positive angles.
fn rotation_2d(degrees: f64) -> Array2<f64> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    array![[cos, -sin], [sin, cos]]
}

/// `R0(a) * R1(b) * R2(c)`, each an elementary rotation about one axis.
fn rotation_3d(a: f64, b: f64, c: f64) -> Array2<f64> {
    let (sa, ca) = a.to_radians().sin_cos();
    let (sb, cb) = b.to_radians().sin_cos();
    let (sc, cc) = c.to_radians().sin_cos();

    let r0 = array![[1.0, 0.0, 0.0], [0.0, ca, -sa], [0.0, sa, ca]];
    let r1 = array![[cb, 0.0, sb], [0.0, 1.0, 0.0], [-sb, 0.0, cb]];
    let r2 = array![[cc, -sc, 0.0], [sc, cc, 0.0], [0.0, 0.0, 1.0]];

    r0.dot(&r1).dot(&r2)
}

/// Unit upper-triangular shear, factors filled row by row above the diagonal.
fn shear_matrix(ndim: usize, factors: &[f64]) -> Array2<f64> {
    let mut h = Array2::eye(ndim);
    let mut k = 0;
    for i in 0..ndim {
        for j in i + 1..ndim {
            h[[i, j]] = factors[k];
            k += 1;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &Array2<f64>, expected: &Array2<f64>) {
        assert_eq!(actual.dim(), expected.dim());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "\n{actual}\n!=\n{expected}");
        }
    }

    #[test]
    fn test_identity_parameters() {
        let m = build(&[1.0, 1.0], &[0.0], None, None).unwrap();
        assert_close(m.as_array(), &Array2::eye(3));

        let m = build(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0], None, None).unwrap();
        assert_close(m.as_array(), &Array2::eye(4));
    }

    #[test]
    fn test_scale_only() {
        let m = build(&[2.0, 0.5], &[0.0], None, None).unwrap();
        assert_close(
            m.as_array(),
            &array![[2.0, 0.0, 0.0], [0.0, 0.5, 0.0], [0.0, 0.0, 1.0]],
        );
    }

    #[test]
    fn test_rotation_2d_counter_clockwise() {
        let m = build(&[1.0, 1.0], &[90.0], None, None).unwrap();
        let p = m.apply(&[1.0, 0.0]);
        assert!((p[0] - 0.0).abs() < 1e-12);
        assert!((p[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_applied_before_rotation() {
        let m = build(&[2.0, 3.0], &[30.0], None, None).unwrap();
        let r = rotation_2d(30.0);
        let expected = array![
            [2.0 * r[[0, 0]], 2.0 * r[[0, 1]], 0.0],
            [3.0 * r[[1, 0]], 3.0 * r[[1, 1]], 0.0],
            [0.0, 0.0, 1.0]
        ];
        assert_close(m.as_array(), &expected);
    }

    #[test]
    fn test_translation_in_last_column() {
        let m = build(&[2.0, 2.0], &[45.0], Some(&[-1.0, 1.0][..]), None).unwrap();
        assert_eq!(m.translation().to_vec(), vec![-1.0, 1.0]);
        assert_eq!(m.as_array().row(2).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rotation_3d_order() {
        let m = build(&[1.0, 1.0, 1.0], &[15.0, 30.0, 0.0], None, None).unwrap();
        let expected = rotation_3d(15.0, 0.0, 0.0).dot(&rotation_3d(0.0, 30.0, 0.0));
        assert_close(&m.linear().to_owned(), &expected);

        // Elementary rotations about different axes do not commute
        let swapped = rotation_3d(0.0, 30.0, 0.0).dot(&rotation_3d(15.0, 0.0, 0.0));
        let diff: f64 = (&m.linear() - &swapped).iter().map(|v| v.abs()).sum();
        assert!(diff > 1e-3);
    }

    #[test]
    fn test_rotation_3d_single_axes() {
        // About axis 2 only: acts on axes 0 and 1
        let m = build(&[1.0, 1.0, 1.0], &[0.0, 0.0, 90.0], None, None).unwrap();
        let p = m.apply(&[1.0, 0.0, 0.0]);
        assert!((p[0]).abs() < 1e-12 && (p[1] - 1.0).abs() < 1e-12 && p[2].abs() < 1e-12);

        // About axis 0 only: acts on axes 1 and 2
        let m = build(&[1.0, 1.0, 1.0], &[90.0, 0.0, 0.0], None, None).unwrap();
        let p = m.apply(&[0.0, 1.0, 0.0]);
        assert!(p[0].abs() < 1e-12 && p[1].abs() < 1e-12 && (p[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_is_orthonormal() {
        let m = build(&[1.0, 1.0, 1.0], &[24.0, 33.0, 99.0], None, None).unwrap();
        let l = m.linear();
        let prod = l.dot(&l.t());
        assert_close(&prod, &Array2::eye(3));
        assert!((m.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shear() {
        let m = build(&[1.0, 1.0], &[0.0], None, Some(&[0.5][..])).unwrap();
        assert_close(
            m.as_array(),
            &array![[1.0, 0.5, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        );

        let m = build(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0], None, Some(&[0.1, 0.2, 0.3][..])).unwrap();
        let l = m.linear();
        assert_eq!(l[[0, 1]], 0.1);
        assert_eq!(l[[0, 2]], 0.2);
        assert_eq!(l[[1, 2]], 0.3);
        assert_eq!(l[[1, 0]], 0.0);
    }

    #[test]
    fn test_unsupported_dimensionality() {
        assert!(matches!(
            build(&[1.0], &[0.0], None, None),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            build(&[1.0; 4], &[0.0; 3], None, None),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_inconsistent_lengths() {
        assert!(matches!(
            build(&[1.0, 1.0], &[0.0, 0.0, 0.0], None, None),
            Err(Error::DimensionMismatch {
                expected: 1,
                actual: 3,
                ..
            })
        ));
        assert!(build(&[1.0, 1.0, 1.0], &[0.0], None, None).is_err());
        assert!(build(&[1.0, 1.0], &[0.0], Some(&[1.0, 2.0, 3.0][..]), None).is_err());
        assert!(build(&[1.0, 1.0], &[0.0], None, Some(&[0.1, 0.2][..])).is_err());
    }

    #[test]
    fn test_zero_scale_builds_but_is_degenerate() {
        let m = build(&[0.0, 1.0], &[10.0], None, None).unwrap();
        assert!(matches!(
            m.check_invertible(),
            Err(Error::DegenerateTransform { .. })
        ));
    }

    #[test]
    fn test_params_from_json() {
        let params: AffineParams = serde_json::from_str(
            r#"{"scale": [0.5, 1.5], "rotation": [23.0], "translation": [23.0, -14.0]}"#,
        )
        .unwrap();
        let m = params.build().unwrap();
        let direct = build(&[0.5, 1.5], &[23.0], Some(&[23.0, -14.0][..]), None).unwrap();
        assert_eq!(m, direct);
    }
}
