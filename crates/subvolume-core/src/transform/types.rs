//! Resampling options.

use serde::{Deserialize, Serialize};

use super::BoundaryMode;
use crate::error::{Error, Result};

/// Interpolation order supported by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationOrder {
    /// Order 0: the nearest sample, `floor(x + 0.5)` per axis.
    #[default]
    Nearest,
    /// Order 1: multilinear interpolation of the `2^d` surrounding samples.
    Linear,
}

impl InterpolationOrder {
    /// Number of extra samples needed on each side of the mapped hull.
    pub fn support(self) -> usize {
        match self {
            InterpolationOrder::Nearest => 0,
            InterpolationOrder::Linear => 1,
        }
    }
}

impl TryFrom<u32> for InterpolationOrder {
    type Error = Error;

    /// Spline orders above 1 are not implemented.
    fn try_from(order: u32) -> Result<Self> {
        match order {
            0 => Ok(InterpolationOrder::Nearest),
            1 => Ok(InterpolationOrder::Linear),
            other => Err(Error::UnsupportedOperation(format!(
                "interpolation order {other} (supported orders are 0 and 1)"
            ))),
        }
    }
}

/// Options for [`transform`](super::transform) and
/// [`affine_transform`](super::affine_transform).
///
/// Missing fields take their defaults when deserializing, so a configuration
/// only needs to name what it changes:
///
/// ```ignore
/// let opts: TransformOptions = serde_json::from_str(r#"{"order": 1, "sigma": 1.0}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Interpolation order, 0 (nearest) or 1 (linear).
    pub order: u32,
    /// Standard deviation of the Gaussian presmoothing, none to disable.
    pub sigma: Option<f64>,
    /// Boundary policy for samples outside the source.
    pub mode: BoundaryMode,
    /// Fill value for `Constant` mode and empty reads.
    pub cval: f64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            order: 0,
            sigma: None,
            mode: BoundaryMode::Reflect,
            cval: 0.0,
        }
    }
}

impl TransformOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interpolation order.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Enable Gaussian presmoothing.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    /// Set the boundary policy.
    pub fn with_mode(mut self, mode: BoundaryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the fill value.
    pub fn with_cval(mut self, cval: f64) -> Self {
        self.cval = cval;
        self
    }

    /// Validate the order and smoothing parameters.
    pub(crate) fn validate(&self) -> Result<(InterpolationOrder, Option<f64>)> {
        let order = InterpolationOrder::try_from(self.order)?;
        let sigma = match self.sigma {
            None => None,
            Some(s) if !s.is_finite() || s < 0.0 => {
                return Err(Error::invalid("sigma", format!("{s} is not a finite non-negative value")))
            }
            Some(s) if s == 0.0 => None,
            Some(s) => Some(s),
        };
        Ok((order, sigma))
    }
}
