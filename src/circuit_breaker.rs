//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for oracle calls.
//! When an oracle keeps failing, callers stop waiting on it and go straight
//! to the local fallback until the reset timeout has elapsed.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for oracle operations
///
/// # State Machine
///
/// - **Closed**: Normal operation, oracle calls pass through
/// - **Open**: Failure threshold exceeded, callers use the fallback immediately
/// - **Half-Open**: After the reset timeout the next call is let through again
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// ```rust
    /// use grocery_planner::config::RecoveryConfig;
    /// use grocery_planner::circuit_breaker::CircuitBreaker;
    ///
    /// let breaker = CircuitBreaker::new(RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    /// Check if the circuit is open (oracle calls should be skipped).
    ///
    /// Resets to closed once the reset timeout has elapsed.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();

        if state.failure_count >= self.config.circuit_breaker_threshold {
            if let Some(last_time) = state.last_failure_time {
                let reset_after = Duration::from_secs(self.config.circuit_breaker_reset_secs);
                if last_time.elapsed() < reset_after {
                    return true;
                }
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed oracle call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a successful oracle call, closing the circuit
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // Counters stay consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
