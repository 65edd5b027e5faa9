//! # Planner Configuration Module
//!
//! Configuration for procurement scoring and for the external oracles,
//! including timeout and circuit breaker settings.

use log::warn;
use std::env;
use std::str::FromStr;

// Constants for procurement scoring
pub const DEFAULT_OVERBUY_RATIO_THRESHOLD: f64 = 3.0;
pub const DEFAULT_OVERBUY_PENALTY: f64 = 1.3;

// Constants for oracle calls
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CATALOG_LISTING_LIMIT: usize = 50;

/// Scoring parameters for the procurement matcher
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherConfig {
    /// Overbuy ratio above which the score penalty applies
    pub overbuy_ratio_threshold: f64,
    /// Multiplier applied to price-per-base-unit when overbuying
    pub overbuy_penalty: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            overbuy_ratio_threshold: DEFAULT_OVERBUY_RATIO_THRESHOLD,
            overbuy_penalty: DEFAULT_OVERBUY_PENALTY,
        }
    }
}

/// Recovery configuration for oracle failures
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Consecutive failures before the oracle is skipped
    pub circuit_breaker_threshold: u32,
    /// Time before the oracle is tried again, in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Configuration for the canonicalization and catalog oracles
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Base URL of the HTTP oracle; `None` disables oracle calls
    pub endpoint: Option<String>,
    /// Upper bound for a single oracle call in seconds
    pub timeout_secs: u64,
    /// Maximum number of products sent in a fuzzy-candidate request
    pub catalog_listing_limit: usize,
    /// Recovery and circuit breaker settings
    pub recovery: RecoveryConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
            catalog_listing_limit: DEFAULT_CATALOG_LISTING_LIMIT,
            recovery: RecoveryConfig::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    pub matcher: MatcherConfig,
    pub oracle: OracleConfig,
}

impl PlannerConfig {
    /// Build the configuration from the environment, loading `.env` first.
    ///
    /// Absent variables keep their defaults; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.oracle.endpoint = lookup("GROCERY_ORACLE_ENDPOINT")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        if let Some(secs) = parse_var(&lookup, "GROCERY_ORACLE_TIMEOUT_SECS") {
            config.oracle.timeout_secs = secs;
        }
        if let Some(limit) = parse_var(&lookup, "GROCERY_ORACLE_CATALOG_LIMIT") {
            config.oracle.catalog_listing_limit = limit;
        }
        if let Some(ratio) = parse_var(&lookup, "GROCERY_OVERBUY_RATIO") {
            config.matcher.overbuy_ratio_threshold = ratio;
        }
        if let Some(penalty) = parse_var(&lookup, "GROCERY_OVERBUY_PENALTY") {
            config.matcher.overbuy_penalty = penalty;
        }

        config
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable value '{}' for {}", raw, key);
            None
        }
    }
}
