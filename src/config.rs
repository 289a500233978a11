//! Engine configuration.
//!
//! Supports environment variables and default values, in the same spirit as
//! the teacher's `Config::from_env`: parse, fall back to the default on any
//! parse failure, and clamp to sane bounds rather than fail startup over a
//! single malformed knob.

use serde::{Deserialize, Serialize};
use std::env;

/// Tunables for the pricing kernel and user defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Starting balance assigned to a newly created user.
    pub default_starting_balance: f64,

    /// Bisection termination width for `shares_for_amount`.
    pub bisection_epsilon: f64,

    /// Initial upper-bound multiplier (`U = initial_bound_factor * amount`)
    /// for the bisection search, expanded further if it undershoots.
    pub initial_bound_factor: f64,

    /// Hard cap on bisection iterations, guards against a runaway search.
    pub max_bisection_iters: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_starting_balance: 1000.0,
            bisection_epsilon: 1e-4,
            initial_bound_factor: 10.0,
            max_bisection_iters: 200,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(balance) = env::var("ENGINE_DEFAULT_STARTING_BALANCE") {
            config.default_starting_balance =
                balance.parse().unwrap_or(config.default_starting_balance);
        }

        if let Ok(epsilon) = env::var("ENGINE_BISECTION_EPSILON") {
            config.bisection_epsilon = epsilon.parse().unwrap_or(config.bisection_epsilon);
        }

        if let Ok(factor) = env::var("ENGINE_INITIAL_BOUND_FACTOR") {
            config.initial_bound_factor = factor.parse().unwrap_or(config.initial_bound_factor);
        }

        if let Ok(iters) = env::var("ENGINE_MAX_BISECTION_ITERS") {
            config.max_bisection_iters = iters.parse().unwrap_or(config.max_bisection_iters);
        }

        config.validate();
        config
    }

    /// Clamp values that would otherwise break the kernel's search.
    fn validate(&mut self) {
        if self.default_starting_balance < 0.0 {
            tracing::warn!(
                value = self.default_starting_balance,
                "invalid default_starting_balance, using default"
            );
            self.default_starting_balance = 1000.0;
        }

        if self.bisection_epsilon <= 0.0 {
            tracing::warn!(
                value = self.bisection_epsilon,
                "invalid bisection_epsilon, using default"
            );
            self.bisection_epsilon = 1e-4;
        }

        if self.initial_bound_factor <= 0.0 {
            tracing::warn!(
                value = self.initial_bound_factor,
                "invalid initial_bound_factor, using default"
            );
            self.initial_bound_factor = 10.0;
        }

        if self.max_bisection_iters == 0 {
            tracing::warn!("invalid max_bisection_iters, using default");
            self.max_bisection_iters = 200;
        }
    }
}
