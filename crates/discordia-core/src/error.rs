//! Error types for series validation and discord search preconditions.

/// Errors from series validation and discord search configuration.
///
/// All variants are precondition failures raised before any distance
/// computation begins. A distance query with an out-of-range window start is
/// not represented here: it signals a caller bug and panics.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    /// Returned when an empty vector is provided as a series.
    #[error("series must be non-empty")]
    EmptySeries,

    /// Returned when a series contains NaN, infinity, or negative infinity.
    #[error("series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite sample found.
        index: usize,
    },

    /// Returned when the window length is zero.
    #[error("window length must be at least 1, got {window_len}")]
    WindowTooShort {
        /// The invalid window length provided.
        window_len: usize,
    },

    /// Returned when the window does not leave room for a second window
    /// start.
    #[error("window length {window_len} must be shorter than the series length {series_len}")]
    WindowExceedsSeries {
        /// The requested window length.
        window_len: usize,
        /// Length of the series it was applied to.
        series_len: usize,
    },

    /// Returned when no two windows can sit a full window length apart, so
    /// the exclusion search has no candidate/neighbor pairs at all.
    #[error(
        "window length {window_len} is at least half the series length {series_len}, \
         leaving no non-overlapping window pairs"
    )]
    NoNonOverlappingWindows {
        /// The requested window length.
        window_len: usize,
        /// Length of the series it was applied to.
        series_len: usize,
    },
}
