//! Resolution of loose region syntax into concrete bounding boxes.
//!
//! A region is written as a list of per-axis specs, mirroring the familiar
//! slice syntax of array libraries:
//!
//! - `..` / [`AxisSpec::Full`] covers the whole axis
//! - `a..b`, `a..`, `..b` / [`AxisSpec::Slice`] with optional bounds
//! - negative bounds count from the end of the axis (`-1` is `extent - 1`)
//! - an integer / [`AxisSpec::Index`] selects a single position
//! - one [`AxisSpec::Ellipsis`] stands for as many full axes as needed
//!
//! Trailing axes without a spec cover their full extent.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use serde::{Deserialize, Serialize};

use super::BoundingBox;
use crate::error::{Error, Result};

/// Specification for one axis of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSpec {
    /// The entire axis.
    #[default]
    Full,
    /// A half-open range; missing bounds default to the axis ends.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
    },
    /// A single position, resolved to `i..i + 1`.
    Index(i64),
    /// Expands to full axes so that the remaining specs align to the end.
    Ellipsis,
}

impl AxisSpec {
    /// Slice with both bounds given.
    pub fn range(start: i64, stop: i64) -> Self {
        AxisSpec::Slice {
            start: Some(start),
            stop: Some(stop),
        }
    }
}

impl From<Range<i64>> for AxisSpec {
    fn from(r: Range<i64>) -> Self {
        AxisSpec::range(r.start, r.end)
    }
}

impl From<RangeFrom<i64>> for AxisSpec {
    fn from(r: RangeFrom<i64>) -> Self {
        AxisSpec::Slice {
            start: Some(r.start),
            stop: None,
        }
    }
}

impl From<RangeTo<i64>> for AxisSpec {
    fn from(r: RangeTo<i64>) -> Self {
        AxisSpec::Slice {
            start: None,
            stop: Some(r.end),
        }
    }
}

impl From<RangeFull> for AxisSpec {
    fn from(_: RangeFull) -> Self {
        AxisSpec::Full
    }
}

impl From<i64> for AxisSpec {
    fn from(i: i64) -> Self {
        AxisSpec::Index(i)
    }
}

/// Resolve a region specification against `shape`.
///
/// # Errors
///
/// - `DimensionMismatch` when more axis specs than axes are given, or when
///   the region contains more than one ellipsis.
/// - `Bounds` when an axis spec lies entirely outside the array: a start past
///   the extent, a stop before zero, or an index outside `[0, extent)`.
///   Partially overlapping slices are clipped instead.
///
/// # Example
///
/// ```ignore
/// use subvolume_core::index::{normalize, AxisSpec};
///
/// let bb = normalize(&[AxisSpec::from(..256), AxisSpec::from(-100..)], &[512, 512])?;
/// assert_eq!(bb.ranges(), &[0..256, 412..512]);
/// ```
pub fn normalize(region: &[AxisSpec], shape: &[usize]) -> Result<BoundingBox> {
    let specs = expand_ellipsis(region, shape.len())?;

    let mut ranges = Vec::with_capacity(shape.len());
    for (axis, &extent) in shape.iter().enumerate() {
        let spec = specs.get(axis).copied().unwrap_or(AxisSpec::Full);
        let range = resolve_axis(axis, spec, extent)?;
        tracing::trace!(axis, ?spec, ?range, "resolved axis spec");
        ranges.push(range);
    }

    Ok(BoundingBox::from_ranges_unchecked(ranges))
}

fn expand_ellipsis(region: &[AxisSpec], ndim: usize) -> Result<Vec<AxisSpec>> {
    let ellipses = region
        .iter()
        .filter(|s| matches!(s, AxisSpec::Ellipsis))
        .count();
    if ellipses > 1 {
        return Err(Error::dimension("ellipsis count", 1, ellipses));
    }

    let explicit = region.len() - ellipses;
    if explicit > ndim {
        return Err(Error::dimension("region axis count", ndim, explicit));
    }

    let mut specs = Vec::with_capacity(ndim);
    for spec in region {
        match spec {
            AxisSpec::Ellipsis => {
                specs.extend(std::iter::repeat(AxisSpec::Full).take(ndim - explicit))
            }
            other => specs.push(*other),
        }
    }
    Ok(specs)
}

fn resolve_axis(axis: usize, spec: AxisSpec, extent: usize) -> Result<Range<usize>> {
    let n = extent as i64;
    match spec {
        AxisSpec::Full | AxisSpec::Ellipsis => Ok(0..extent),
        AxisSpec::Index(i) => {
            let resolved = if i < 0 { i + n } else { i };
            if resolved < 0 || resolved >= n {
                return Err(Error::Bounds {
                    axis,
                    value: i,
                    extent,
                });
            }
            let i = resolved as usize;
            Ok(i..i + 1)
        }
        AxisSpec::Slice { start, stop } => {
            let start = match start {
                None => 0,
                Some(s) if s < 0 => (s + n).max(0),
                Some(s) if s > n => {
                    return Err(Error::Bounds {
                        axis,
                        value: s,
                        extent,
                    })
                }
                Some(s) => s,
            };
            let stop = match stop {
                None => n,
                Some(s) => {
                    let resolved = if s < 0 { s + n } else { s };
                    if resolved < 0 {
                        return Err(Error::Bounds {
                            axis,
                            value: s,
                            extent,
                        });
                    }
                    resolved.min(n)
                }
            };
            // An inverted slice selects nothing
            let stop = stop.max(start);
            Ok(start as usize..stop as usize)
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
