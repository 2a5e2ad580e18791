//! Monte Carlo Tree Search engine.
//!
//! [`MctsEngine`] runs simulations from a root position until its budget is
//! spent, backpropagates each result into its [`StatisticsStore`], and turns
//! the root's visit counts into a move or a move distribution.
//!
//! Without an oracle every simulation is a UCB1 descent plus random rollout;
//! with one it is a PUCT descent that stops at the leaf the oracle evaluated.
//! Runs are reproducible: the same seed, oracle and budget give the same
//! moves and the same statistics.

use std::collections::HashSet;
use std::hash::Hash;
use std::time::{Duration, Instant};

use fastrand::Rng;
use tracing::{debug, trace, warn};

use crate::config::{Budget, EngineConfig};
use crate::error::{MctsError, Result};
use crate::game::{GameState, Outcome};
use crate::oracle::PolicyValueOracle;
use crate::simulation::{
    GuidedRunner, RolloutRunner, Simulation, SimulationPath, SimulationRunner,
};
use crate::stats::StatisticsStore;

/// Counters for one search (one call to [`MctsEngine::search`]).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    pub simulations: u32,
    pub elapsed: Duration,
    /// Deepest ply at which a simulation expanded a new position.
    pub max_depth: usize,
    /// Simulations cut off by the depth bound.
    pub truncated: u32,
}

impl SearchStats {
    fn record<F, A>(&mut self, sim: &Simulation<F, A>) {
        self.simulations += 1;
        if let Some(depth) = sim.expanded_at {
            self.max_depth = self.max_depth.max(depth);
        }
        if sim.outcome.is_undetermined() {
            self.truncated += 1;
        }
    }
}

/// Statistics of one root action, for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootStat<A> {
    pub action: A,
    pub visits: u32,
    pub total_value: f64,
    /// `None` until visited.
    pub mean_value: Option<f64>,
    /// `None` until expanded.
    pub prior: Option<f64>,
}

/// Weights over the legal actions of a position, in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveDistribution<A> {
    entries: Vec<(A, f64)>,
}

impl<A> Default for MoveDistribution<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A: Copy + PartialEq> MoveDistribution<A> {
    fn one_hot(legal: &[A], chosen: A) -> Self {
        Self {
            entries: legal
                .iter()
                .map(|&a| (a, if a == chosen { 1.0 } else { 0.0 }))
                .collect(),
        }
    }

    fn from_weights(legal: &[A], weights: Vec<f64>) -> Self {
        let sum: f64 = weights.iter().sum();
        Self {
            entries: legal
                .iter()
                .copied()
                .zip(weights.into_iter().map(|w| w / sum))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(A, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight of `action`; 0 for actions not in the distribution.
    pub fn probability(&self, action: A) -> f64 {
        self.entries
            .iter()
            .find(|(a, _)| *a == action)
            .map_or(0.0, |&(_, p)| p)
    }

    /// Highest-weight action, earliest on ties.
    pub fn most_likely(&self) -> Option<A> {
        crate::selection::argmax(self.entries.iter().copied())
    }

    /// Draw an action in proportion to its weight.
    pub fn sample(&self, rng: &mut Rng) -> Option<A> {
        let r = rng.f64();
        let mut cumsum = 0.0;
        for &(a, p) in &self.entries {
            cumsum += p;
            if r < cumsum {
                return Some(a);
            }
        }
        self.entries
            .iter()
            .rev()
            .find(|(_, p)| *p > 0.0)
            .map(|&(a, _)| a)
    }
}

/// Add one simulation's result to every recorded step on its path.
///
/// Each step is credited from the point of view of the side that moved
/// there. Steps without a record (rollout moves) are skipped, and a key that
/// appears twice in one path is only counted once. Returns how many records
/// were updated.
pub fn backpropagate<F, A>(
    store: &mut StatisticsStore<F, A>,
    path: &SimulationPath<F, A>,
    outcome: Outcome,
) -> usize
where
    F: Clone + Eq + Hash,
    A: Copy + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(path.len());
    let mut updated = 0;
    for step in path.steps() {
        if !seen.insert((&step.fingerprint, step.action)) {
            continue;
        }
        if store.update(&step.fingerprint, step.action, outcome.value_for(step.player)) {
            updated += 1;
        }
    }
    updated
}

/// Search engine for one game type.
pub struct MctsEngine<G: GameState> {
    config: EngineConfig,
    oracle: Option<Box<dyn PolicyValueOracle<G>>>,
    store: StatisticsStore<G::Fingerprint, G::Action>,
    rng: Rng,
    simulations_run: u64,
    last_stats: SearchStats,
}

impl<G: GameState> MctsEngine<G> {
    /// Rollout engine (UCB1, no oracle).
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng: Rng::with_seed(config.seed),
            config,
            oracle: None,
            store: StatisticsStore::new(),
            simulations_run: 0,
            last_stats: SearchStats::default(),
        })
    }

    /// Oracle-guided engine (PUCT).
    pub fn with_oracle(
        config: EngineConfig,
        oracle: impl PolicyValueOracle<G> + 'static,
    ) -> Result<Self> {
        let mut engine = Self::new(config)?;
        engine.oracle = Some(Box::new(oracle));
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_guided(&self) -> bool {
        self.oracle.is_some()
    }

    pub fn statistics(&self) -> &StatisticsStore<G::Fingerprint, G::Action> {
        &self.store
    }

    /// Simulations run over the engine's lifetime.
    pub fn simulations_run(&self) -> u64 {
        self.simulations_run
    }

    /// Counters of the most recent search.
    pub fn last_stats(&self) -> SearchStats {
        self.last_stats
    }

    /// Forget all statistics. The random source keeps its state.
    pub fn reset(&mut self) {
        self.store.clear();
    }

    /// Pick a move for the side to move in `state`.
    ///
    /// Returns `None` when there is nothing to play. A single legal action is
    /// returned without searching. Otherwise the most visited root action
    /// wins, then the highest mean value, then enumeration order.
    pub fn select_move(&mut self, state: &G) -> Result<Option<G::Action>> {
        let legal = state.legal_actions();
        if legal.is_empty() || state.winner().is_some() {
            return Ok(None);
        }
        if legal.len() == 1 {
            return Ok(Some(legal[0]));
        }

        self.search(state)?;
        Ok(self.best_action(state))
    }

    /// Search `state` and convert root visit counts into move weights.
    ///
    /// `temperature` 0 puts all weight on the move [`select_move`] would pick,
    /// 1 gives visit counts normalised to sum to 1, and any other positive τ
    /// weights each move by `N^(1/τ)`.
    ///
    /// [`select_move`]: Self::select_move
    pub fn move_distribution(
        &mut self,
        state: &G,
        temperature: f64,
    ) -> Result<MoveDistribution<G::Action>> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(MctsError::InvalidConfiguration(format!(
                "temperature must be finite and non-negative, got {temperature}"
            )));
        }

        let legal = state.legal_actions();
        if legal.is_empty() || state.winner().is_some() {
            return Ok(MoveDistribution::default());
        }
        if legal.len() == 1 {
            return Ok(MoveDistribution::one_hot(&legal, legal[0]));
        }

        self.search(state)?;
        Ok(self.visit_distribution(state, &legal, temperature))
    }

    /// Run simulations from `state` until the budget is spent.
    ///
    /// Starts from an empty store unless statistics are retained.
    pub fn search(&mut self, state: &G) -> Result<SearchStats> {
        if !self.config.retain_statistics {
            self.store.clear();
        }

        let start = Instant::now();
        let mut stats = SearchStats::default();
        loop {
            let sim = self.run_simulation(state)?;
            stats.record(&sim);

            let done = match self.config.budget {
                Budget::Simulations(n) => stats.simulations >= n,
                Budget::Time(limit) => start.elapsed() >= limit,
            };
            if done {
                break;
            }
        }
        stats.elapsed = start.elapsed();

        if stats.truncated > 0 {
            warn!(
                truncated = stats.truncated,
                simulations = stats.simulations,
                max_depth = self.config.max_depth,
                "simulations hit the depth bound before the game ended"
            );
        }
        debug!(
            simulations = stats.simulations,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            max_depth = stats.max_depth,
            records = self.store.len(),
            guided = self.is_guided(),
            "search finished"
        );

        self.last_stats = stats;
        Ok(stats)
    }

    /// Run one simulation from `state` and backpropagate its result.
    pub fn run_simulation(
        &mut self,
        state: &G,
    ) -> Result<Simulation<G::Fingerprint, G::Action>> {
        let (c, depth) = (self.config.exploration, self.config.max_depth);
        let sim = match &self.oracle {
            Some(oracle) => {
                GuidedRunner::new(oracle.as_ref(), c, depth).run(state, &mut self.store, &mut self.rng)?
            }
            None => RolloutRunner::new(c, depth).run(state, &mut self.store, &mut self.rng)?,
        };

        let updated = backpropagate(&mut self.store, &sim.path, sim.outcome);
        self.simulations_run += 1;

        if sim.outcome.is_undetermined() {
            debug!(plies = sim.path.len(), "simulation truncated at depth bound");
        }
        trace!(updated, plies = sim.path.len(), "backpropagated");
        Ok(sim)
    }

    /// Most visited legal action at `state`, then highest mean value, then
    /// enumeration order.
    pub fn best_action(&self, state: &G) -> Option<G::Action> {
        let fingerprint = state.fingerprint();
        let mut best: Option<(G::Action, u32, f64)> = None;
        for a in state.legal_actions() {
            let (n, q) = match self.store.get(&fingerprint, a) {
                Some(r) => (r.visits(), r.try_mean_value().unwrap_or(f64::NEG_INFINITY)),
                None => (0, f64::NEG_INFINITY),
            };
            let better = match best {
                None => true,
                Some((_, best_n, best_q)) => n > best_n || (n == best_n && q > best_q),
            };
            if better {
                best = Some((a, n, q));
            }
        }
        best.map(|(a, _, _)| a)
    }

    /// Statistics of each legal action at `state`, in enumeration order.
    pub fn root_stats(&self, state: &G) -> Vec<RootStat<G::Action>> {
        let fingerprint = state.fingerprint();
        state
            .legal_actions()
            .into_iter()
            .map(|action| match self.store.get(&fingerprint, action) {
                Some(r) => RootStat {
                    action,
                    visits: r.visits(),
                    total_value: r.total_value(),
                    mean_value: r.try_mean_value(),
                    prior: Some(r.prior()),
                },
                None => RootStat {
                    action,
                    visits: 0,
                    total_value: 0.0,
                    mean_value: None,
                    prior: None,
                },
            })
            .collect()
    }

    fn visit_distribution(
        &self,
        state: &G,
        legal: &[G::Action],
        temperature: f64,
    ) -> MoveDistribution<G::Action> {
        if temperature == 0.0 {
            let best = self.best_action(state).unwrap_or(legal[0]);
            return MoveDistribution::one_hot(legal, best);
        }

        let fingerprint = state.fingerprint();
        let counts: Vec<f64> = legal
            .iter()
            .map(|&a| self.store.get(&fingerprint, a).map_or(0, |r| r.visits()) as f64)
            .collect();
        let max = counts.iter().copied().fold(0.0, f64::max);
        if max == 0.0 {
            return MoveDistribution::from_weights(legal, vec![1.0; legal.len()]);
        }

        let weights = if temperature == 1.0 {
            counts
        } else {
            // Scale by the maximum first so N^(1/τ) cannot overflow.
            let exponent = 1.0 / temperature;
            counts.iter().map(|n| (n / max).powf(exponent)).collect()
        };
        MoveDistribution::from_weights(legal, weights)
    }
}
