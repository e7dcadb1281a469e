//! Shared contract for window distance strategies.

use crate::compact::CompactCache;
use crate::direct::DirectEuclidean;
use crate::distance::Distance;
use crate::error::DiscordError;
use crate::series::Series;
use crate::triangular::TriangularCache;

/// Distance oracle over the sliding windows of a single series.
///
/// Implementations compute the Euclidean distance between the two
/// length-`window_len` windows starting at `t1` and `t2`. The contract:
/// symmetric in its arguments, zero on the diagonal, and defined exactly for
/// start indices below [`num_windows`](WindowDistance::num_windows) —
/// querying any other start is a caller bug and panics.
///
/// `distance` takes `&mut self` because the caching strategies memoize on
/// read; an instance is single-threaded by construction.
pub trait WindowDistance {
    /// The shared window length L.
    fn window_len(&self) -> usize;

    /// Number of valid window start indices, `N − L + 1`.
    fn num_windows(&self) -> usize;

    /// Euclidean distance between the windows starting at `t1` and `t2`.
    ///
    /// # Panics
    ///
    /// Panics if `t1` or `t2` is not a valid window start.
    fn distance(&mut self, t1: usize, t2: usize) -> Distance;
}

/// Distance strategy selection, fixed at construction.
///
/// All three compute identical distances; they trade memory for amortized
/// query cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceStrategy {
    /// O(L) summation per call, no extra memory. The reference oracle for
    /// the cached variants.
    Direct,

    /// Jagged lower-triangular memo table over all window pairs; amortized
    /// O(1) per call once a pair's diagonal has been touched.
    TriangularMatrix,

    /// Flat memo array sized exactly to the non-overlapping pairs; the same
    /// recurrence as the triangular matrix at a fraction of the memory.
    #[default]
    CompactArray,
}

impl DistanceStrategy {
    /// Build a strategy instance over `series` with the given window length.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::WindowTooShort`] | `window_len` is zero |
    /// | [`DiscordError::WindowExceedsSeries`] | `window_len >= series.len()` |
    pub fn build<'a>(
        self,
        series: &'a Series,
        window_len: usize,
    ) -> Result<Box<dyn WindowDistance + 'a>, DiscordError> {
        Ok(match self {
            Self::Direct => Box::new(DirectEuclidean::new(series, window_len)?),
            Self::TriangularMatrix => Box::new(TriangularCache::new(series, window_len)?),
            Self::CompactArray => Box::new(CompactCache::new(series, window_len)?),
        })
    }
}

/// Reject window lengths the strategies cannot work with.
pub(crate) fn validate_window(series_len: usize, window_len: usize) -> Result<(), DiscordError> {
    if window_len == 0 {
        return Err(DiscordError::WindowTooShort { window_len });
    }
    if window_len >= series_len {
        return Err(DiscordError::WindowExceedsSeries {
            window_len,
            series_len,
        });
    }
    Ok(())
}

/// Squared Euclidean distance between the length-`len` windows of `data`
/// starting at `t1` and `t2`, summed without intermediate square roots.
#[inline]
pub(crate) fn squared_direct(data: &[f64], t1: usize, t2: usize, len: usize) -> f64 {
    let a = &data[t1..t1 + len];
    let b = &data[t2..t2 + len];
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Bounds check shared by every strategy's public entry point.
#[inline]
pub(crate) fn assert_valid_start(t: usize, num_windows: usize) {
    assert!(
        t < num_windows,
        "window start {t} out of range for {num_windows} windows"
    );
}
