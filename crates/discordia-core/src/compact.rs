//! Exact-count flat-array memo cache.

use tracing::debug;

use crate::distance::Distance;
use crate::error::DiscordError;
use crate::metric::{WindowDistance, assert_valid_start, squared_direct, validate_window};
use crate::series::Series;

/// Marks a cell that has not been filled yet. Never a valid squared
/// distance: the series is all-finite, so every real sum is finite.
const UNSET: f64 = f64::INFINITY;

/// Memoizing strategy backed by a single flat array holding only the pairs
/// the exclusion search can reach: ordered pairs `(t1, t2)` with
/// `t2 − t1 >= L`.
///
/// With `W = N − 2L + 1`, row `t1` has `W − t1` reachable partners, so the
/// store holds exactly `W * (W + 1) / 2` cells and the offset of `(t1, t2)`
/// is `t1 * (2W − t1 + 1) / 2 + (t2 − t1 − L)` by triangular-number
/// counting over the shrinking rows. The first row (`t1 = 0`) is computed
/// directly at construction; every other cell derives from the same shift
/// recurrence as [`TriangularCache`](crate::TriangularCache), filled on
/// demand with the same self-healing back-walk — the dependency of an
/// in-store cell sits one diagonal step up-left at the same offset, so it
/// is in store too, and the walk bottoms out on the eager first row.
///
/// Pairs inside the exclusion zone (`0 < |t1 − t2| < L`) have no cell. The
/// finder never asks for them; a caller that does gets a direct O(L)
/// computation rather than a read of some neighboring pair's cell.
#[derive(Debug)]
pub struct CompactCache<'a> {
    data: &'a [f64],
    window_len: usize,
    num_windows: usize,
    /// `W`: the number of rows with at least one reachable partner.
    rows: usize,
    cells: Vec<f64>,
}

impl<'a> CompactCache<'a> {
    /// Create the cache over `series`, precomputing the first row.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::WindowTooShort`] | `window_len` is zero |
    /// | [`DiscordError::WindowExceedsSeries`] | `window_len >= series.len()` |
    pub fn new(series: &'a Series, window_len: usize) -> Result<Self, DiscordError> {
        validate_window(series.len(), window_len)?;
        let data = series.values();
        let num_windows = series.num_windows(window_len);

        // No pair can sit a full window apart when N < 2L; the store is
        // empty and every off-diagonal query takes the direct path.
        let rows = (data.len() + 1).saturating_sub(2 * window_len);
        let mut cells = vec![UNSET; rows * (rows + 1) / 2];
        for t2 in window_len..window_len + rows {
            cells[t2 - window_len] = squared_direct(data, 0, t2, window_len);
        }

        debug!(
            windows = num_windows,
            cells = cells.len(),
            "compact cache initialized"
        );

        Ok(Self {
            data,
            window_len,
            num_windows,
            rows,
            cells,
        })
    }

    /// Flat offset of the ordered pair `(t1, t2)` with `t2 − t1 >= L`.
    fn index_of(&self, t1: usize, t2: usize) -> usize {
        debug_assert!(t2 - t1 >= self.window_len, "pair ({t1}, {t2}) overlaps");
        t1 * (2 * self.rows - t1 + 1) / 2 + (t2 - t1 - self.window_len)
    }

    /// Squared distance for the ordered pair `lo < hi` with
    /// `hi − lo >= L`, filling every missing cell on its diagonal.
    fn squared(&mut self, lo: usize, hi: usize) -> f64 {
        let idx = self.index_of(lo, hi);
        if self.cells[idx] != UNSET {
            return self.cells[idx];
        }

        // Nearest filled ancestor up the diagonal; row 0 bounds the walk.
        let mut back = 1;
        while self.cells[self.index_of(lo - back, hi - back)] == UNSET {
            back += 1;
        }

        let l = self.window_len;
        let mut sq = self.cells[self.index_of(lo - back, hi - back)];
        for step in (0..back).rev() {
            let (t1, t2) = (lo - step, hi - step);
            let head = self.data[t1 - 1] - self.data[t2 - 1];
            let tail = self.data[t1 + l - 1] - self.data[t2 + l - 1];
            sq = sq - head * head + tail * tail;
            let idx = self.index_of(t1, t2);
            self.cells[idx] = sq;
        }
        sq
    }
}

impl WindowDistance for CompactCache<'_> {
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn num_windows(&self) -> usize {
        self.num_windows
    }

    fn distance(&mut self, t1: usize, t2: usize) -> Distance {
        assert_valid_start(t1, self.num_windows);
        assert_valid_start(t2, self.num_windows);
        if t1 == t2 {
            return Distance::ZERO;
        }
        let (lo, hi) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if hi - lo < self.window_len {
            // Exclusion-zone pair: no cell reserved, not worth caching.
            return Distance::new(squared_direct(self.data, lo, hi, self.window_len).sqrt());
        }
        // Subtractive cancellation can leave an exact zero a few ulps
        // negative; clamp before the square root.
        Distance::new(self.squared(lo, hi).max(0.0).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::DirectEuclidean;

    fn series() -> Series {
        Series::new(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn store_sized_to_exact_pair_count() {
        // N = 9, L = 3: W = 4, pairs with offset >= 3 number 4+3+2+1 = 10.
        let s = series();
        let cache = CompactCache::new(&s, 3).unwrap();
        assert_eq!(cache.rows, 4);
        assert_eq!(cache.cells.len(), 10);
    }

    #[test]
    fn index_is_a_bijection_over_the_exclusion_pairs() {
        let s = series();
        let cache = CompactCache::new(&s, 3).unwrap();
        let mut seen = vec![false; cache.cells.len()];
        for t1 in 0..cache.num_windows {
            for t2 in (t1 + 3)..cache.num_windows {
                let idx = cache.index_of(t1, t2);
                assert!(!seen[idx], "offset {idx} assigned twice");
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&hit| hit), "store has unreachable cells");
    }

    #[test]
    fn matches_direct_oracle_on_every_pair() {
        let s = series();
        let oracle = DirectEuclidean::new(&s, 3).unwrap();
        let mut cache = CompactCache::new(&s, 3).unwrap();
        for i in 0..cache.num_windows {
            for j in 0..cache.num_windows {
                let expected = oracle.between(i, j).value();
                let got = cache.distance(i, j).value();
                assert!(
                    (got - expected).abs() < 1e-9,
                    "pair ({i}, {j}): got {got}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn exclusion_zone_pairs_fall_back_to_direct() {
        let s = series();
        let oracle = DirectEuclidean::new(&s, 3).unwrap();
        let mut cache = CompactCache::new(&s, 3).unwrap();
        // Overlapping by one position: offset 2 < L = 3.
        let got = cache.distance(1, 3).value();
        assert!((got - oracle.between(1, 3).value()).abs() < 1e-12);
        // The store is untouched by overlap queries.
        assert!(cache.cells.iter().skip(cache.rows).all(|&c| c == UNSET));
    }

    #[test]
    fn access_order_does_not_matter() {
        let s = series();
        let oracle = DirectEuclidean::new(&s, 3).unwrap();

        // Deepest cell first: forces the longest back-walk immediately.
        let mut cache = CompactCache::new(&s, 3).unwrap();
        let d = cache.distance(3, 6).value();
        assert!((d - oracle.between(3, 6).value()).abs() < 1e-9);

        for i in (0..cache.num_windows).rev() {
            for j in 0..cache.num_windows {
                let expected = oracle.between(i, j).value();
                let got = cache.distance(i, j).value();
                assert!((got - expected).abs() < 1e-9, "pair ({i}, {j})");
            }
        }
    }

    #[test]
    fn empty_store_when_no_pair_fits() {
        // N = 5, L = 3: no two windows can sit 3 apart.
        let s = Series::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let oracle = DirectEuclidean::new(&s, 3).unwrap();
        let mut cache = CompactCache::new(&s, 3).unwrap();
        assert_eq!(cache.cells.len(), 0);
        for i in 0..cache.num_windows {
            for j in 0..cache.num_windows {
                let expected = oracle.between(i, j).value();
                assert!((cache.distance(i, j).value() - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn self_distance_zero() {
        let s = series();
        let mut cache = CompactCache::new(&s, 3).unwrap();
        for t in 0..cache.num_windows {
            assert_eq!(cache.distance(t, t).value(), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let s = series();
        let mut cache = CompactCache::new(&s, 3).unwrap();
        for i in 0..cache.num_windows {
            for j in 0..cache.num_windows {
                assert_eq!(cache.distance(i, j).value(), cache.distance(j, i).value());
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_start_panics() {
        let s = series();
        let mut cache = CompactCache::new(&s, 3).unwrap();
        cache.distance(0, 7);
    }

    #[test]
    fn rejects_invalid_window() {
        let s = series();
        assert!(CompactCache::new(&s, 0).is_err());
        assert!(CompactCache::new(&s, 10).is_err());
    }
}
