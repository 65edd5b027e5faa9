//! # Error Types Module
//!
//! Structured errors for the planner. Only oracle calls and recipe construction
//! produce errors; quantity parsing and procurement report failure as values.

use thiserror::Error;

/// Failures of an external oracle call.
///
/// Every variant is recovered by the caller through the local fallback path,
/// so these never escape a top-level aggregation or matching operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// The call did not answer within the configured timeout
    #[error("Oracle timeout after {0}s")]
    Timeout(u64),
    /// The answer could not be interpreted
    #[error("Malformed oracle response: {0}")]
    Malformed(String),
    /// The canonicalization answer did not line up with the request
    #[error("Oracle response length {actual} != request length {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    /// Network or HTTP-level failure
    #[error("Oracle transport error: {0}")]
    Transport(String),
    /// The circuit breaker is open, the oracle was not called
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OracleError::Malformed(err.to_string())
        } else {
            OracleError::Transport(err.to_string())
        }
    }
}

/// A quantity that cannot be expressed in a base unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Unknown unit '{unit}' for {ingredient}")]
    UnknownUnit { unit: String, ingredient: String },
    #[error("Invalid quantity {0}")]
    InvalidQuantity(f64),
    #[error("Oracle conversion failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Errors raised while building recipe data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Two rows with the same raw name inside one recipe
    #[error("Duplicate ingredient '{0}' in recipe")]
    DuplicateIngredient(String),
}
