//! Direct O(L)-per-call Euclidean strategy.

use crate::distance::Distance;
use crate::error::DiscordError;
use crate::metric::{WindowDistance, assert_valid_start, squared_direct, validate_window};
use crate::series::Series;

/// Stateless strategy: every call sums the squared element-wise differences
/// across the two windows. O(L) time per query, no extra memory.
///
/// Serves as the reference oracle for the cached strategies, and as the only
/// strategy that can be shared across threads — it holds no cache, so
/// [`between`](DirectEuclidean::between) works through a shared reference.
#[derive(Debug, Clone, Copy)]
pub struct DirectEuclidean<'a> {
    data: &'a [f64],
    window_len: usize,
    num_windows: usize,
}

impl<'a> DirectEuclidean<'a> {
    /// Create a direct strategy over `series` with the given window length.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::WindowTooShort`] | `window_len` is zero |
    /// | [`DiscordError::WindowExceedsSeries`] | `window_len >= series.len()` |
    pub fn new(series: &'a Series, window_len: usize) -> Result<Self, DiscordError> {
        validate_window(series.len(), window_len)?;
        Ok(Self {
            data: series.values(),
            window_len,
            num_windows: series.num_windows(window_len),
        })
    }

    /// Distance between the windows starting at `t1` and `t2`.
    ///
    /// Shared-reference twin of [`WindowDistance::distance`]; the parallel
    /// neighbor profile calls this from many threads at once.
    ///
    /// # Panics
    ///
    /// Panics if `t1` or `t2` is not a valid window start.
    #[must_use]
    pub fn between(&self, t1: usize, t2: usize) -> Distance {
        assert_valid_start(t1, self.num_windows);
        assert_valid_start(t2, self.num_windows);
        Distance::new(squared_direct(self.data, t1, t2, self.window_len).sqrt())
    }
}

impl WindowDistance for DirectEuclidean<'_> {
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn num_windows(&self) -> usize {
        self.num_windows
    }

    fn distance(&mut self, t1: usize, t2: usize) -> Distance {
        self.between(t1, t2)
    }
}
