//! Boundary policies for samples outside the source array.
//!
//! Index mapping for an axis of extent 4 (`a b c d`):
//!
//! ```text
//! Reflect   d c b a | a b c d | d c b a
//! Mirror      d c b | a b c d | c b a
//! Nearest   a a a a | a b c d | d d d d
//! Wrap      a b c d | a b c d | a b c d
//! Constant  k k k k | a b c d | k k k k   (k = cval)
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// How indices outside `[0, extent)` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Half-sample symmetric reflection about the edge.
    #[default]
    Reflect,
    /// Whole-sample symmetric reflection; the edge sample is not repeated.
    Mirror,
    /// Repeat the edge sample.
    Nearest,
    /// Periodic continuation.
    Wrap,
    /// Use the constant fill value.
    Constant,
}

impl BoundaryMode {
    /// Map a possibly out-of-range index onto `[0, extent)`.
    ///
    /// Returns `None` when the sample takes the fill value instead
    /// (`Constant` mode, or an empty axis).
    pub fn resolve(self, index: i64, extent: usize) -> Option<usize> {
        if extent == 0 {
            return None;
        }
        let n = extent as i64;
        if (0..n).contains(&index) {
            return Some(index as usize);
        }
        let resolved = match self {
            BoundaryMode::Constant => return None,
            BoundaryMode::Nearest => index.clamp(0, n - 1),
            BoundaryMode::Wrap => index.rem_euclid(n),
            BoundaryMode::Reflect => {
                let period = 2 * n;
                let m = index.rem_euclid(period);
                if m < n {
                    m
                } else {
                    period - 1 - m
                }
            }
            BoundaryMode::Mirror => {
                if n == 1 {
                    0
                } else {
                    let period = 2 * n - 2;
                    let m = index.rem_euclid(period);
                    if m < n {
                        m
                    } else {
                        period - m
                    }
                }
            }
        };
        Some(resolved as usize)
    }

    /// Smallest range of in-array indices that the inclusive index interval
    /// `lo..=hi` resolves to, `None` if every index takes the fill value.
    pub(crate) fn image(self, lo: i64, hi: i64, extent: usize) -> Option<Range<usize>> {
        if extent == 0 || lo > hi {
            return None;
        }
        let n = extent as i64;
        match self {
            BoundaryMode::Constant => {
                let start = lo.max(0);
                let stop = hi.min(n - 1);
                (start <= stop).then(|| start as usize..stop as usize + 1)
            }
            BoundaryMode::Nearest => {
                Some(lo.clamp(0, n - 1) as usize..hi.clamp(0, n - 1) as usize + 1)
            }
            BoundaryMode::Reflect | BoundaryMode::Mirror | BoundaryMode::Wrap => {
                let period = match self {
                    BoundaryMode::Reflect => 2 * n,
                    BoundaryMode::Mirror => (2 * n - 2).max(1),
                    _ => n,
                };
                if hi - lo + 1 >= period {
                    return Some(0..extent);
                }
                let mut min = usize::MAX;
                let mut max = 0;
                for i in lo..=hi {
                    if let Some(r) = self.resolve(i, extent) {
                        min = min.min(r);
                        max = max.max(r);
                    }
                }
                Some(min..max + 1)
            }
        }
    }
}
