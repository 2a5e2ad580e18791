//! Engine configuration.

use std::time::Duration;

use crate::constants::{DEFAULT_SEED, MAX_SIM_DEPTH, N_SIMS, PUCT_C, UCB1_C};
use crate::error::{MctsError, Result};

/// When a search stops. The budget is checked between simulations only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Run exactly this many simulations.
    Simulations(u32),
    /// Keep simulating until this much wall-clock time has passed. At least
    /// one simulation always runs.
    Time(Duration),
}

/// Configuration for an [`MctsEngine`](crate::mcts::MctsEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub budget: Budget,

    /// Exploration constant C. Used as the UCB1 constant without an oracle
    /// and as the PUCT constant with one.
    pub exploration: f64,

    /// Maximum plies per simulation.
    pub max_depth: usize,

    /// Seed for the engine's random source (rollouts, prior sampling).
    pub seed: u64,

    /// Keep statistics from one decision to the next instead of starting each
    /// search from an empty store.
    pub retain_statistics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: Budget::Simulations(N_SIMS),
            exploration: UCB1_C,
            max_depth: MAX_SIM_DEPTH,
            seed: DEFAULT_SEED,
            retain_statistics: false,
        }
    }
}

impl EngineConfig {
    /// Defaults tuned for oracle-guided (PUCT) search.
    pub fn for_guided() -> Self {
        Self {
            exploration: PUCT_C,
            ..Self::default()
        }
    }

    /// Small budget for tests.
    pub fn for_testing() -> Self {
        Self {
            budget: Budget::Simulations(200),
            ..Self::default()
        }
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_simulations(self, n: u32) -> Self {
        self.with_budget(Budget::Simulations(n))
    }

    pub fn with_time_limit(self, limit: Duration) -> Self {
        self.with_budget(Budget::Time(limit))
    }

    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_retained_statistics(mut self, retain: bool) -> Self {
        self.retain_statistics = retain;
        self
    }

    /// Reject settings the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        match self.budget {
            Budget::Simulations(0) => {
                return Err(MctsError::InvalidConfiguration(
                    "simulation budget must be at least 1".into(),
                ));
            }
            Budget::Time(d) if d.is_zero() => {
                return Err(MctsError::InvalidConfiguration(
                    "time budget must be positive".into(),
                ));
            }
            _ => {}
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(MctsError::InvalidConfiguration(format!(
                "exploration constant must be finite and non-negative, got {}",
                self.exploration
            )));
        }
        if self.max_depth == 0 {
            return Err(MctsError::InvalidConfiguration(
                "max simulation depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
