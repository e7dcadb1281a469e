//! Lower-triangular memo cache with the incremental shift recurrence.

use tracing::debug;

use crate::distance::Distance;
use crate::error::DiscordError;
use crate::metric::{WindowDistance, assert_valid_start, squared_direct, validate_window};
use crate::series::Series;

/// Marks a cell that has not been filled yet. Never a valid squared
/// distance: the series is all-finite, so every real sum is finite.
const UNSET: f64 = f64::INFINITY;

/// Memoizing strategy backed by a jagged lower-triangular matrix.
///
/// Row `t2` holds the squared distances to every window `t1 <= t2`, so the
/// full store covers `M * (M + 1) / 2` cells for `M` windows. Construction
/// zeroes the diagonal and fills the first column by direct O(L) summation;
/// every other cell derives from its up-left diagonal neighbor — shifting
/// both windows forward by one position drops one squared difference at the
/// head and adds one at the tail:
///
/// `sq(t1, t2) = sq(t1−1, t2−1) − (x[t1−1] − x[t2−1])² + (x[t1+L−1] − x[t2+L−1])²`
///
/// Cells fill on first access. When a cell's dependency is itself unfilled,
/// the lookup walks back along the cell's diagonal to the nearest filled
/// ancestor and rolls the recurrence forward, memoizing every intermediate
/// cell — no access order is ever assumed. The walk always terminates: the
/// first column and the diagonal are filled at construction.
#[derive(Debug)]
pub struct TriangularCache<'a> {
    data: &'a [f64],
    window_len: usize,
    /// `cells[t2][t1]` with `t1 <= t2`, in squared-distance space.
    cells: Vec<Vec<f64>>,
}

impl<'a> TriangularCache<'a> {
    /// Create the cache over `series`, initializing the diagonal and the
    /// first column.
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

        let mut cells: Vec<Vec<f64>> = (0..num_windows).map(|t2| vec![UNSET; t2 + 1]).collect();
        for (t2, row) in cells.iter_mut().enumerate() {
            row[t2] = 0.0;
            if t2 > 0 {
                row[0] = squared_direct(data, 0, t2, window_len);
            }
        }

        debug!(
            windows = num_windows,
            cells = num_windows * (num_windows + 1) / 2,
            "triangular cache initialized"
        );

        Ok(Self {
            data,
            window_len,
            cells,
        })
    }

    /// Squared distance for the ordered pair `lo < hi`, filling every
    /// missing cell on the diagonal ending at `(lo, hi)`.
    fn squared(&mut self, lo: usize, hi: usize) -> f64 {
        if self.cells[hi][lo] != UNSET {
            return self.cells[hi][lo];
        }

        // Nearest filled ancestor up the diagonal; column 0 bounds the walk.
        let mut back = 1;
        while self.cells[hi - back][lo - back] == UNSET {
            back += 1;
        }

        let l = self.window_len;
        let mut sq = self.cells[hi - back][lo - back];
        for step in (0..back).rev() {
            let (t1, t2) = (lo - step, hi - step);
            let head = self.data[t1 - 1] - self.data[t2 - 1];
            let tail = self.data[t1 + l - 1] - self.data[t2 + l - 1];
            sq = sq - head * head + tail * tail;
            self.cells[t2][t1] = sq;
        }
        sq
    }
}

impl WindowDistance for TriangularCache<'_> {
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn num_windows(&self) -> usize {
        self.cells.len()
    }

    fn distance(&mut self, t1: usize, t2: usize) -> Distance {
        let n = self.cells.len();
        assert_valid_start(t1, n);
        assert_valid_start(t2, n);
        if t1 == t2 {
            return Distance::ZERO;
        }
        let (lo, hi) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
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
    fn matches_direct_oracle_on_every_pair() {
        let s = series();
        let oracle = DirectEuclidean::new(&s, 3).unwrap();
        let mut cache = TriangularCache::new(&s, 3).unwrap();
        for i in 0..cache.num_windows() {
            for j in 0..cache.num_windows() {
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
    fn access_order_does_not_matter() {
        let s = series();
        let oracle = DirectEuclidean::new(&s, 3).unwrap();

        // Deepest cell first: forces the longest back-walk immediately.
        let mut cache = TriangularCache::new(&s, 3).unwrap();
        let m = cache.num_windows();
        let d = cache.distance(m - 2, m - 1).value();
        assert!((d - oracle.between(m - 2, m - 1).value()).abs() < 1e-9);

        // Every remaining pair still agrees after the cold jump.
        for i in (0..m).rev() {
            for j in 0..m {
                let expected = oracle.between(i, j).value();
                let got = cache.distance(i, j).value();
                assert!((got - expected).abs() < 1e-9, "pair ({i}, {j})");
            }
        }
    }

    #[test]
    fn self_distance_zero() {
        let s = series();
        let mut cache = TriangularCache::new(&s, 3).unwrap();
        for t in 0..cache.num_windows() {
            assert_eq!(cache.distance(t, t).value(), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let s = series();
        let mut cache = TriangularCache::new(&s, 2).unwrap();
        for i in 0..cache.num_windows() {
            for j in 0..cache.num_windows() {
                assert_eq!(cache.distance(i, j).value(), cache.distance(j, i).value());
            }
        }
    }

    #[test]
    fn first_column_filled_at_construction() {
        let s = series();
        let cache = TriangularCache::new(&s, 3).unwrap();
        for t2 in 1..cache.num_windows() {
            assert_ne!(cache.cells[t2][0], UNSET, "column 0 row {t2} unfilled");
        }
    }

    #[test]
    fn memoizes_filled_cells() {
        let s = series();
        let mut cache = TriangularCache::new(&s, 3).unwrap();
        let first = cache.distance(2, 6).value();
        assert_ne!(cache.cells[6][2], UNSET);
        let second = cache.distance(2, 6).value();
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_start_panics() {
        let s = series();
        let mut cache = TriangularCache::new(&s, 3).unwrap();
        cache.distance(7, 0);
    }

    #[test]
    fn rejects_invalid_window() {
        let s = series();
        assert!(TriangularCache::new(&s, 0).is_err());
        assert!(TriangularCache::new(&s, 9).is_err());
    }
}
