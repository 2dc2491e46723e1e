//! Error taxonomy for the engine.
//!
//! Only invalid requests surface as errors. Clamped input (negative pollutant
//! concentrations, out-of-range AQI) is normalized silently, an unanswered
//! questionnaire is reported as a status value, and alert rules whose scope
//! does not match a reading simply ignore it.

use thiserror::Error;

/// Errors returned to callers of the engine.
///
/// These are caller programming errors, not runtime faults: nothing in the
/// engine retries them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A trend period key other than `weekly`, `monthly` or `yearly`.
    #[error("invalid trend period '{0}' (expected weekly, monthly or yearly)")]
    InvalidPeriod(String),

    /// A pollutant comparison vector that is not exactly six entries long.
    #[error("invalid vector length: expected {expected}, got {actual}")]
    InvalidVectorLength { expected: usize, actual: usize },

    /// An alert threshold outside the 0-200 range.
    #[error("alert threshold {0} is outside 0..=200")]
    InvalidThreshold(i64),

    /// No alert rule is registered under this id.
    #[error("alert rule '{0}' not found")]
    RuleNotFound(String),

    /// No retained notification carries this id.
    #[error("notification '{0}' not found")]
    NotificationNotFound(String),

    /// A trend series whose labels and values disagree in length, or are empty.
    #[error("trend series has {labels} labels but {values} values")]
    SeriesLengthMismatch { labels: usize, values: usize },
}

/// Convenience alias used across the library.
pub type EngineResult<T> = Result<T, EngineError>;
