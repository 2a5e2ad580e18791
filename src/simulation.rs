//! Single simulations from a root position.
//!
//! A simulation walks a private copy of the root, choosing moves by
//! selection score while every legal action has statistics, expanding at most
//! one new position, and then either rolling out at random
//! ([`RolloutRunner`]) or stopping at the expanded leaf with the oracle's
//! value ([`GuidedRunner`]). It reports the `(position, action, mover)` steps
//! it took and how the game ended; updating statistics along the path is the
//! caller's job.
//!
//! Both runners stop after `max_depth` plies. A simulation cut off there ends
//! as [`Outcome::Undetermined`].

use fastrand::Rng;
use tracing::trace;

use crate::error::Result;
use crate::game::{GameState, Outcome, Player};
use crate::oracle::{PolicyValueOracle, checked_priors};
use crate::selection::Strategy;
use crate::stats::StatisticsStore;

/// One move made during a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<F, A> {
    /// Position the move was made from.
    pub fingerprint: F,
    pub action: A,
    /// Side that made the move.
    pub player: Player,
}

/// Ordered moves of one simulation, root first.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPath<F, A> {
    steps: Vec<Step<F, A>>,
}

impl<F, A> Default for SimulationPath<F, A> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<F, A> SimulationPath<F, A> {
    pub fn push(&mut self, fingerprint: F, action: A, player: Player) {
        self.steps.push(Step {
            fingerprint,
            action,
            player,
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step<F, A>] {
        &self.steps
    }
}

/// Result of one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation<F, A> {
    pub path: SimulationPath<F, A>,
    pub outcome: Outcome,
    /// Ply (1-based) of the move whose record the simulation created, if it
    /// created any.
    pub expanded_at: Option<usize>,
}

type Store<G> = StatisticsStore<<G as GameState>::Fingerprint, <G as GameState>::Action>;
type SimulationOf<G> = Simulation<<G as GameState>::Fingerprint, <G as GameState>::Action>;

/// Plays one simulation from `root`, creating statistics records for at
/// most one newly expanded position.
pub trait SimulationRunner<G: GameState> {
    fn run(&self, root: &G, store: &mut Store<G>, rng: &mut Rng) -> Result<SimulationOf<G>>;
}

/// How the game stands at `state`, if it is over.
fn terminal_outcome<G: GameState>(state: &G, legal: &[G::Action]) -> Option<Outcome> {
    if let Some(winner) = state.winner() {
        return Some(Outcome::from_winner(winner));
    }
    legal.is_empty().then_some(Outcome::Draw)
}

// =============================================================================
// Rollout (UCB1, no oracle)
// =============================================================================

/// Plain MCTS: UCB1 through fully visited positions, one expansion, then
/// uniformly random moves until the game ends.
#[derive(Debug, Clone)]
pub struct RolloutRunner {
    strategy: Strategy,
    max_depth: usize,
}

impl RolloutRunner {
    pub fn new(exploration: f64, max_depth: usize) -> Self {
        Self {
            strategy: Strategy::Ucb1 { c: exploration },
            max_depth,
        }
    }
}

impl<G: GameState> SimulationRunner<G> for RolloutRunner {
    fn run(&self, root: &G, store: &mut Store<G>, rng: &mut Rng) -> Result<SimulationOf<G>> {
        let mut state = root.clone();
        let mut path = SimulationPath::default();
        let mut expanded_at = None;

        let outcome = loop {
            let legal = state.legal_actions();
            if let Some(outcome) = terminal_outcome(&state, &legal) {
                break outcome;
            }
            if path.len() >= self.max_depth {
                break Outcome::Undetermined;
            }

            let fingerprint = state.fingerprint();
            // A record created earlier in this same simulation still has
            // N = 0 and must not be scored, so UCB1 only runs once every
            // action is visited rather than merely recorded.
            let unvisited = legal
                .iter()
                .copied()
                .find(|&a| !store.get(&fingerprint, a).is_some_and(|r| r.visits() > 0));
            let action = match unvisited {
                None => self.strategy.select(store, &fingerprint, &legal),
                Some(action) if expanded_at.is_none() => {
                    let prior = 1.0 / legal.len() as f64;
                    if store.insert_if_absent(fingerprint.clone(), action, prior) {
                        expanded_at = Some(path.len() + 1);
                    }
                    Some(action)
                }
                Some(_) => None,
            }
            .unwrap_or_else(|| legal[rng.usize(..legal.len())]);

            let player = state.current_player();
            state.play(action);
            path.push(fingerprint, action, player);
        };

        trace!(plies = path.len(), ?outcome, ?expanded_at, "rollout finished");
        Ok(Simulation {
            path,
            outcome,
            expanded_at,
        })
    }
}

// =============================================================================
// Oracle-guided (PUCT)
// =============================================================================

/// AlphaZero-style simulation: PUCT through expanded positions, then one
/// expansion scored by the oracle. The simulation ends at the expanded
/// position, whose oracle value is credited to the path leading into it. The
/// expanded position's own moves stay unvisited until a later descent picks
/// one, unless the sampled move ends the game on the spot.
pub struct GuidedRunner<'a, G: GameState> {
    oracle: &'a dyn PolicyValueOracle<G>,
    strategy: Strategy,
    max_depth: usize,
}

impl<'a, G: GameState> GuidedRunner<'a, G> {
    pub fn new(oracle: &'a dyn PolicyValueOracle<G>, exploration: f64, max_depth: usize) -> Self {
        Self {
            oracle,
            strategy: Strategy::Puct { c: exploration },
            max_depth,
        }
    }
}

impl<G: GameState> SimulationRunner<G> for GuidedRunner<'_, G> {
    fn run(&self, root: &G, store: &mut Store<G>, rng: &mut Rng) -> Result<SimulationOf<G>> {
        let mut state = root.clone();
        let mut path = SimulationPath::default();

        let (outcome, expanded_at) = loop {
            let legal = state.legal_actions();
            if let Some(outcome) = terminal_outcome(&state, &legal) {
                break (outcome, None);
            }
            if path.len() >= self.max_depth {
                break (Outcome::Undetermined, None);
            }

            let fingerprint = state.fingerprint();
            let player = state.current_player();

            if let Some(action) = self.strategy.select(store, &fingerprint, &legal) {
                state.play(action);
                path.push(fingerprint, action, player);
                continue;
            }

            // Expansion. Priors are validated before any record is created so
            // a bad evaluation leaves the store untouched.
            let eval = self.oracle.evaluate(&fingerprint, &legal)?;
            let priors = checked_priors(&eval, legal.len())?;

            let candidates: Vec<_> = legal
                .iter()
                .copied()
                .zip(priors.iter().copied())
                .filter(|&(a, _)| !store.contains(&fingerprint, a))
                .collect();
            let action = sample_by_prior(&candidates, rng);

            for (&a, &p) in legal.iter().zip(&priors) {
                store.insert_if_absent(fingerprint.clone(), a, p);
            }
            let ply = path.len() + 1;

            // The oracle's value is for this position: it goes to the moves
            // that led here, never to the sampled move. A sampled move that
            // ends the game is taken and scored directly.
            let next = state.apply(action);
            let after = next.legal_actions();
            if let Some(outcome) = terminal_outcome(&next, &after) {
                path.push(fingerprint, action, player);
                break (outcome, Some(ply));
            }
            break (
                Outcome::Estimate {
                    player,
                    value: eval.value,
                },
                Some(ply),
            );
        };

        trace!(plies = path.len(), ?outcome, ?expanded_at, "guided simulation finished");
        Ok(Simulation {
            path,
            outcome,
            expanded_at,
        })
    }
}

/// Draw an action with probability proportional to its prior. Falls back to
/// the first candidate when all priors are zero.
///
/// # Panics
/// If `candidates` is empty.
fn sample_by_prior<A: Copy>(candidates: &[(A, f64)], rng: &mut Rng) -> A {
    let total: f64 = candidates.iter().map(|&(_, p)| p).sum();
    if total <= 0.0 {
        return candidates[0].0;
    }

    let r = rng.f64() * total;
    let mut cumsum = 0.0;
    for &(a, p) in candidates {
        cumsum += p;
        if r < cumsum {
            return a;
        }
    }

    // Rounding can leave r just above the final cumulative sum.
    candidates
        .iter()
        .rev()
        .find(|&&(_, p)| p > 0.0)
        .map(|&(a, _)| a)
        .unwrap_or(candidates[0].0)
}
