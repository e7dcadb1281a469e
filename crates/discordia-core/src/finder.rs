//! Brute-force discord search and nearest-neighbor profile.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::direct::DirectEuclidean;
use crate::distance::Distance;
use crate::error::DiscordError;
use crate::metric::{DistanceStrategy, WindowDistance};
use crate::series::Series;

/// The search result: the window whose nearest non-overlapping neighbor is
/// farthest away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discord {
    /// Start index of the discord window, or `None` when no candidate ever
    /// beat the zero baseline (constant series, or no candidate had a
    /// non-overlapping neighbor).
    pub location: Option<usize>,
    /// The discord's nearest-neighbor distance; zero in the degenerate case.
    pub distance: Distance,
    /// Start index of the discord's nearest neighbor.
    pub neighbor: Option<usize>,
}

impl Discord {
    const NONE: Self = Self {
        location: None,
        distance: Distance::ZERO,
        neighbor: None,
    };
}

/// Per-candidate nearest-neighbor distances over the exclusion constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborProfile {
    /// Nearest non-overlapping neighbor distance for each window start;
    /// infinite for candidates with no valid neighbor.
    pub distances: Vec<Distance>,
    /// Start index of each window's nearest neighbor.
    pub neighbors: Vec<Option<usize>>,
    /// Window length the profile was computed with.
    pub window_len: usize,
}

impl NeighborProfile {
    /// Return the number of windows profiled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Return true if no windows were profiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// The discord according to this profile: the maximum finite entry,
    /// earliest index winning ties.
    #[must_use]
    pub fn discord(&self) -> Discord {
        let mut best = Discord::NONE;
        for (i, (&d, &n)) in self.distances.iter().zip(&self.neighbors).enumerate() {
            if d.is_finite() && d > best.distance {
                best = Discord {
                    location: Some(i),
                    distance: d,
                    neighbor: n,
                };
            }
        }
        best
    }
}

/// Configuration for a discord search.
///
/// Construct via [`DiscordConfig::new`], then chain `with_*` methods to
/// override defaults.
///
/// # Defaults
///
/// | Parameter  | Default                           |
/// |------------|-----------------------------------|
/// | `strategy` | [`DistanceStrategy::CompactArray`] |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscordConfig {
    window_len: usize,
    strategy: DistanceStrategy,
}

impl DiscordConfig {
    /// Create a new search configuration with the given window length.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::WindowTooShort`] | `window_len` is zero |
    pub fn new(window_len: usize) -> Result<Self, DiscordError> {
        if window_len == 0 {
            return Err(DiscordError::WindowTooShort { window_len });
        }
        Ok(Self {
            window_len,
            strategy: DistanceStrategy::default(),
        })
    }

    /// Set the distance strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: DistanceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Return the window length.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Return the distance strategy.
    #[must_use]
    pub fn strategy(&self) -> DistanceStrategy {
        self.strategy
    }

    /// Find the discord of `series`.
    ///
    /// For each candidate window, the nearest neighbor at least a full
    /// window length away is located; the candidate whose nearest neighbor
    /// is farthest wins. Updates happen only on strict improvement, so the
    /// earliest candidate keeps a tie. Candidates with no valid neighbor
    /// never win; if nothing beats the zero baseline the degenerate result
    /// (`location: None`, zero distance) is returned.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::WindowExceedsSeries`] | `window_len >= series.len()` |
    /// | [`DiscordError::NoNonOverlappingWindows`] | `2 * window_len >= series.len()` |
    #[instrument(skip(self, series), fields(n = series.len(), window_len = self.window_len))]
    pub fn find(&self, series: &Series) -> Result<Discord, DiscordError> {
        self.validate(series.len())?;
        let mut dist = self.strategy.build(series, self.window_len)?;
        Ok(search(dist.as_mut()))
    }

    /// Compute the nearest-neighbor profile of `series`.
    ///
    /// Candidates are independent, so they are processed in parallel with
    /// the stateless direct metric; the memoizing strategies are
    /// per-instance mutable state and stay out of the parallel path.
    /// `profile(series)?.discord()` agrees with [`find`](Self::find).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::WindowExceedsSeries`] | `window_len >= series.len()` |
    /// | [`DiscordError::NoNonOverlappingWindows`] | `2 * window_len >= series.len()` |
    #[instrument(skip(self, series), fields(n = series.len(), window_len = self.window_len))]
    pub fn profile(&self, series: &Series) -> Result<NeighborProfile, DiscordError> {
        self.validate(series.len())?;
        let dist = DirectEuclidean::new(series, self.window_len)?;
        let l = self.window_len;
        let m = dist.num_windows();

        let entries: Vec<(Distance, Option<usize>)> = (0..m)
            .into_par_iter()
            .map(|i| {
                let mut nearest = Distance::INFINITY;
                let mut nearest_at = None;
                for j in (0..m).filter(|j| i.abs_diff(*j) >= l) {
                    let d = dist.between(i, j);
                    if d < nearest {
                        nearest = d;
                        nearest_at = Some(j);
                    }
                }
                (nearest, nearest_at)
            })
            .collect();

        let (distances, neighbors) = entries.into_iter().unzip();
        Ok(NeighborProfile {
            distances,
            neighbors,
            window_len: l,
        })
    }

    fn validate(&self, series_len: usize) -> Result<(), DiscordError> {
        if self.window_len >= series_len {
            return Err(DiscordError::WindowExceedsSeries {
                window_len: self.window_len,
                series_len,
            });
        }
        if 2 * self.window_len >= series_len {
            return Err(DiscordError::NoNonOverlappingWindows {
                window_len: self.window_len,
                series_len,
            });
        }
        Ok(())
    }
}

/// Run the brute-force discord search over a prepared distance strategy.
///
/// Same search as [`DiscordConfig::find`]; this entry point lets callers
/// drive a specific strategy instance directly, reusing its warmed cache
/// across calls.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DiscordError::NoNonOverlappingWindows`] | no two windows sit a full window length apart |
pub fn find_discord(dist: &mut dyn WindowDistance) -> Result<Discord, DiscordError> {
    let l = dist.window_len();
    let m = dist.num_windows();
    // M = N − L + 1 windows exist; a pair a full window apart needs
    // M >= L + 2, equivalently 2L < N.
    if m < l + 2 {
        return Err(DiscordError::NoNonOverlappingWindows {
            window_len: l,
            series_len: m + l - 1,
        });
    }
    Ok(search(dist))
}

fn search(dist: &mut dyn WindowDistance) -> Discord {
    let l = dist.window_len();
    let m = dist.num_windows();
    let mut best = Discord::NONE;

    for i in 0..m {
        let mut nearest = Distance::INFINITY;
        let mut nearest_at = None;
        for j in (0..m).filter(|j| i.abs_diff(*j) >= l) {
            let d = dist.distance(i, j);
            if d < nearest {
                nearest = d;
                nearest_at = Some(j);
            }
        }
        // Strict improvement keeps the earliest candidate on ties, and a
        // neighborless candidate (infinite bound) can never win.
        if nearest.is_finite() && nearest > best.distance {
            best = Discord {
                location: Some(i),
                distance: nearest,
                neighbor: nearest_at,
            };
            debug!(candidate = i, distance = nearest.value(), "best candidate so far");
        }
    }

    debug!(
        location = ?best.location,
        distance = best.distance.value(),
        "discord search complete"
    );
    best
}
