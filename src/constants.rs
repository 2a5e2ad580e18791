//! Default search parameters.
//!
//! These values seed [`EngineConfig`](crate::config::EngineConfig) and the CLI
//! flags. Everything here can be overridden per engine instance.

// =============================================================================
// Budget
// =============================================================================

/// Default number of simulations per decision.
pub const N_SIMS: u32 = 1000;

// =============================================================================
// Selection
// =============================================================================

/// Exploration constant for UCB1 (rollout mode).
pub const UCB1_C: f64 = 1.4;

/// Exploration constant for PUCT (oracle-guided mode).
pub const PUCT_C: f64 = 1.25;

// =============================================================================
// Simulation
// =============================================================================

/// Maximum number of plies in a single simulation.
pub const MAX_SIM_DEPTH: usize = 100;

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 0x5eed;

// =============================================================================
// Oracle contract
// =============================================================================

/// How far the oracle's priors may sum away from 1 before they are rejected
/// instead of renormalised.
pub const PRIOR_SUM_TOLERANCE: f64 = 1e-3;

// =============================================================================
// Outcome values
// =============================================================================

/// Value credited to the winner's records.
pub const WIN_VALUE: f64 = 1.0;

/// Value credited to the loser's records.
pub const LOSS_VALUE: f64 = -1.0;

/// Value credited on a draw or an undetermined (depth-truncated) simulation.
pub const DRAW_VALUE: f64 = 0.0;
