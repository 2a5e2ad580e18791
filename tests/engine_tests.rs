//! Integration tests for the search engine.
//!
//! Besides tic-tac-toe these use a few tiny synthetic games:
//! - `ThreePly`: three binary moves, then the first player always wins
//! - `Endless`: never ends, to exercise the depth bound
//! - `Cycle`: never ends and revisits the same positions

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use tictac_zero::board::TicTacToe;
use tictac_zero::config::EngineConfig;
use tictac_zero::error::MctsError;
use tictac_zero::game::{GameState, Outcome, Player, Winner};
use tictac_zero::mcts::MctsEngine;
use tictac_zero::oracle::{Evaluation, OracleError, PolicyValueOracle, UniformOracle};

// =============================================================================
// Helper games and oracles
// =============================================================================

#[derive(Clone, Debug, Default)]
struct ThreePly {
    moves: Vec<u8>,
}

impl GameState for ThreePly {
    type Action = u8;
    type Fingerprint = Vec<u8>;

    fn legal_actions(&self) -> Vec<u8> {
        if self.moves.len() >= 3 { Vec::new() } else { vec![0, 1] }
    }

    fn current_player(&self) -> Player {
        if self.moves.len() % 2 == 0 { Player::First } else { Player::Second }
    }

    fn play(&mut self, action: u8) {
        self.moves.push(action);
    }

    fn fingerprint(&self) -> Vec<u8> {
        self.moves.clone()
    }

    fn winner(&self) -> Option<Winner> {
        (self.moves.len() >= 3).then_some(Winner::Player(Player::First))
    }
}

#[derive(Clone, Debug, Default)]
struct Endless {
    ply: u32,
}

impl GameState for Endless {
    type Action = u8;
    type Fingerprint = u32;

    fn legal_actions(&self) -> Vec<u8> {
        vec![0, 1]
    }

    fn current_player(&self) -> Player {
        if self.ply % 2 == 0 { Player::First } else { Player::Second }
    }

    fn play(&mut self, _action: u8) {
        self.ply += 1;
    }

    fn fingerprint(&self) -> u32 {
        self.ply
    }

    fn winner(&self) -> Option<Winner> {
        None
    }
}

/// Like `Endless`, but only four distinct positions.
#[derive(Clone, Debug, Default)]
struct Cycle {
    ply: u32,
}

impl GameState for Cycle {
    type Action = u8;
    type Fingerprint = u32;

    fn legal_actions(&self) -> Vec<u8> {
        vec![0, 1, 2]
    }

    fn current_player(&self) -> Player {
        if self.ply % 2 == 0 { Player::First } else { Player::Second }
    }

    fn play(&mut self, _action: u8) {
        self.ply += 1;
    }

    fn fingerprint(&self) -> u32 {
        self.ply % 4
    }

    fn winner(&self) -> Option<Winner> {
        None
    }
}

/// Uniform priors, fixed value, and a shared call counter.
struct CountingOracle {
    calls: Rc<Cell<usize>>,
    value: f64,
}

impl<G: GameState> PolicyValueOracle<G> for CountingOracle {
    fn evaluate(
        &self,
        _fingerprint: &G::Fingerprint,
        legal: &[G::Action],
    ) -> Result<Evaluation, OracleError> {
        self.calls.set(self.calls.get() + 1);
        Ok(Evaluation {
            priors: vec![1.0 / legal.len() as f64; legal.len()],
            value: self.value,
        })
    }
}

/// Priors proportional to 1, 2, 3, ... over the legal actions.
struct RampOracle;

impl PolicyValueOracle<TicTacToe> for RampOracle {
    fn evaluate(
        &self,
        _fingerprint: &<TicTacToe as GameState>::Fingerprint,
        legal: &[usize],
    ) -> Result<Evaluation, OracleError> {
        let total: f64 = (1..=legal.len()).map(|i| i as f64).sum();
        Ok(Evaluation {
            priors: (1..=legal.len()).map(|i| i as f64 / total).collect(),
            value: 0.0,
        })
    }
}

/// All prior on the last legal action, value fixed.
struct LastActionOracle {
    value: f64,
}

impl PolicyValueOracle<TicTacToe> for LastActionOracle {
    fn evaluate(
        &self,
        _fingerprint: &<TicTacToe as GameState>::Fingerprint,
        legal: &[usize],
    ) -> Result<Evaluation, OracleError> {
        let mut priors = vec![0.0; legal.len()];
        priors[legal.len() - 1] = 1.0;
        Ok(Evaluation {
            priors,
            value: self.value,
        })
    }
}

/// Returns one prior per board square, legal or not.
struct FullBoardOracle;

impl PolicyValueOracle<TicTacToe> for FullBoardOracle {
    fn evaluate(
        &self,
        _fingerprint: &<TicTacToe as GameState>::Fingerprint,
        _legal: &[usize],
    ) -> Result<Evaluation, OracleError> {
        Ok(Evaluation {
            priors: vec![1.0 / 9.0; 9],
            value: 0.0,
        })
    }
}

struct FailingOracle;

impl PolicyValueOracle<TicTacToe> for FailingOracle {
    fn evaluate(
        &self,
        _fingerprint: &<TicTacToe as GameState>::Fingerprint,
        _legal: &[usize],
    ) -> Result<Evaluation, OracleError> {
        Err(OracleError::ModelError("no model loaded".into()))
    }
}

/// X | X | .
/// O | O | .
/// . | . | .
/// X to move; square 2 wins on the spot.
fn forced_win() -> TicTacToe {
    TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap()
}

fn rollout_engine<G: GameState>(seed: u64, sims: u32) -> MctsEngine<G> {
    MctsEngine::new(EngineConfig::default().with_simulations(sims).with_seed(seed)).unwrap()
}

fn root_visits(engine: &MctsEngine<TicTacToe>, board: &TicTacToe, action: usize) -> u32 {
    engine
        .root_stats(board)
        .iter()
        .find(|s| s.action == action)
        .map_or(0, |s| s.visits)
}

// =============================================================================
// Short-circuits
// =============================================================================

#[test]
fn test_single_legal_action_skips_search() {
    // X O X / X O O / O X .
    let board = TicTacToe::from_moves(&[0, 1, 2, 4, 3, 5, 7, 6]).unwrap();
    assert_eq!(board.legal_actions(), vec![8]);

    let mut engine = rollout_engine::<TicTacToe>(0, 500);
    assert_eq!(engine.select_move(&board).unwrap(), Some(8));
    assert_eq!(engine.simulations_run(), 0);

    let dist = engine.move_distribution(&board, 1.0).unwrap();
    assert_eq!(dist.probability(8), 1.0);
    assert_eq!(engine.simulations_run(), 0);
}

#[test]
fn test_no_legal_actions_returns_none() {
    let won = TicTacToe::from_moves(&[0, 3, 1, 4, 2]).unwrap();
    let drawn = TicTacToe::from_moves(&[0, 1, 2, 4, 3, 5, 7, 6, 8]).unwrap();

    let mut engine = rollout_engine::<TicTacToe>(0, 100);
    assert_eq!(engine.select_move(&won).unwrap(), None);
    assert_eq!(engine.select_move(&drawn).unwrap(), None);
    assert!(engine.move_distribution(&won, 1.0).unwrap().is_empty());
    assert_eq!(engine.simulations_run(), 0);
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn test_zero_budget_fails_fast() {
    let result = MctsEngine::<TicTacToe>::new(EngineConfig::default().with_simulations(0));
    assert!(matches!(result, Err(MctsError::InvalidConfiguration(_))));

    let result = MctsEngine::<TicTacToe>::with_oracle(
        EngineConfig::for_guided().with_simulations(0),
        UniformOracle::new(),
    );
    assert!(matches!(result, Err(MctsError::InvalidConfiguration(_))));
}

// =============================================================================
// Statistics invariants
// =============================================================================

#[test]
fn test_rollout_records_are_visited_and_consistent() {
    let mut engine = rollout_engine::<TicTacToe>(3, 300);
    engine.search(&TicTacToe::new(3)).unwrap();

    assert!(!engine.statistics().is_empty());
    for (_, _, record) in engine.statistics().iter() {
        assert!(record.visits() >= 1);
        let q = record.total_value() / record.visits() as f64;
        assert!((record.mean_value() - q).abs() < 1e-12);
        assert!(record.mean_value().abs() <= 1.0);
    }
}

#[test]
fn test_guided_records_are_consistent() {
    let mut engine =
        MctsEngine::with_oracle(EngineConfig::for_guided().with_simulations(300), UniformOracle)
            .unwrap();
    engine.search(&TicTacToe::new(3)).unwrap();

    for (_, _, record) in engine.statistics().iter() {
        if let Some(q) = record.try_mean_value() {
            assert!((q - record.total_value() / record.visits() as f64).abs() < 1e-12);
        }
        assert!(record.prior() > 0.0 && record.prior() <= 1.0);
    }
}

#[test]
fn test_each_simulation_visits_root_once() {
    let board = TicTacToe::new(3);
    let mut engine = rollout_engine::<TicTacToe>(1, 150);
    engine.search(&board).unwrap();

    let total: u32 = engine.root_stats(&board).iter().map(|s| s.visits).sum();
    assert_eq!(total, 150);
}

// =============================================================================
// Backpropagation
// =============================================================================

#[test]
fn test_first_simulation_updates_only_expanded_record() {
    let game = ThreePly::default();
    let mut engine = rollout_engine::<ThreePly>(0, 10);

    let sim = engine.run_simulation(&game).unwrap();
    assert_eq!(sim.path.len(), 3);
    assert_eq!(sim.outcome, Outcome::Win(Player::First));
    assert_eq!(sim.expanded_at, Some(1));

    assert_eq!(engine.statistics().len(), 1);
    let record = engine.statistics().get(&Vec::new(), 0).unwrap();
    assert_eq!(record.visits(), 1);
    assert_eq!(record.total_value(), 1.0);
}

#[test]
fn test_backpropagation_on_forced_three_ply_game() {
    let game = ThreePly::default();
    let mut engine = rollout_engine::<ThreePly>(4, 10);
    for _ in 0..40 {
        engine.run_simulation(&game).unwrap();
    }
    let before: HashMap<(Vec<u8>, u8), (u32, f64)> = engine
        .statistics()
        .iter()
        .map(|(f, a, r)| ((f.clone(), *a), (r.visits(), r.total_value())))
        .collect();

    let sim = engine.run_simulation(&game).unwrap();
    assert_eq!(sim.path.len(), 3);
    assert_eq!(sim.outcome, Outcome::Win(Player::First));

    let mut on_path = 0;
    for step in sim.path.steps() {
        let key = (step.fingerprint.clone(), step.action);
        let Some(after) = engine.statistics().get(&step.fingerprint, step.action) else {
            continue;
        };
        on_path += 1;
        let (n0, w0) = before.get(&key).copied().unwrap_or((0, 0.0));
        let delta = if step.player == Player::First { 1.0 } else { -1.0 };
        assert_eq!(after.visits(), n0 + 1);
        assert_eq!(after.total_value(), w0 + delta);
    }
    assert!(on_path >= 1);

    // Nothing off the path moved.
    let on_path_keys: Vec<_> = sim
        .path
        .steps()
        .iter()
        .map(|s| (s.fingerprint.clone(), s.action))
        .collect();
    for (f, a, r) in engine.statistics().iter() {
        let key = (f.clone(), *a);
        if !on_path_keys.contains(&key) {
            assert_eq!(before.get(&key).copied(), Some((r.visits(), r.total_value())));
        }
    }
}

#[test]
fn test_second_player_records_are_negative_in_forced_game() {
    let game = ThreePly::default();
    let mut engine = rollout_engine::<ThreePly>(9, 200);
    engine.search(&game).unwrap();

    for (fingerprint, _, record) in engine.statistics().iter() {
        let expected = if fingerprint.len() % 2 == 0 { 1.0 } else { -1.0 };
        assert_eq!(record.mean_value(), expected);
    }
}

#[test]
fn test_guided_credits_oracle_value_to_incoming_move() {
    let calls = Rc::new(Cell::new(0));
    let oracle = CountingOracle {
        calls: Rc::clone(&calls),
        value: 0.5,
    };
    let mut engine =
        MctsEngine::with_oracle(EngineConfig::for_guided().with_simulations(10), oracle).unwrap();
    let board = TicTacToe::new(3);

    // Expanding the root has no incoming move to credit.
    let sim = engine.run_simulation(&board).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(sim.path.is_empty());
    assert_eq!(engine.statistics().len(), 9);
    assert!(engine.root_stats(&board).iter().all(|s| s.visits == 0));

    // Equal priors: PUCT descends into square 0, where O's position is
    // evaluated at +0.5 for O.
    let sim = engine.run_simulation(&board).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(sim.path.len(), 1);
    assert_eq!(
        sim.outcome,
        Outcome::Estimate {
            player: Player::Second,
            value: 0.5
        }
    );

    let record = engine.statistics().get(&board.fingerprint(), 0).unwrap();
    assert_eq!(record.visits(), 1);
    assert_eq!(record.total_value(), -0.5);
}

#[test]
fn test_guided_does_not_credit_root_value_to_blunder() {
    let board = forced_win();
    let oracle = LastActionOracle { value: 1.0 };
    let mut engine = MctsEngine::with_oracle(EngineConfig::for_guided(), oracle).unwrap();

    // The oracle likes X's position and puts all prior on square 8, which
    // lets O complete the middle row.
    engine.run_simulation(&board).unwrap();
    let blunder = engine.root_stats(&board)[4];
    assert_eq!(blunder.action, 8);
    assert_eq!(blunder.visits, 0);
    assert_eq!(blunder.total_value, 0.0);

    // Playing 8 reaches a position the oracle rates +1 for O.
    engine.run_simulation(&board).unwrap();
    let blunder = engine.root_stats(&board)[4];
    assert_eq!(blunder.visits, 1);
    assert_eq!(blunder.mean_value, Some(-1.0));
    assert_eq!(root_visits(&engine, &board, 2), 0);
}

#[test]
fn test_oracle_called_once_per_expansion() {
    let calls = Rc::new(Cell::new(0));
    let oracle = CountingOracle {
        calls: Rc::clone(&calls),
        value: 0.0,
    };
    let mut engine =
        MctsEngine::with_oracle(EngineConfig::for_guided().with_simulations(10), oracle).unwrap();
    let board = TicTacToe::new(3);

    let mut expansions = 0;
    for _ in 0..200 {
        let sim = engine.run_simulation(&board).unwrap();
        if sim.expanded_at.is_some() {
            expansions += 1;
        }
    }
    assert_eq!(calls.get(), expansions);
}

// =============================================================================
// Depth bound
// =============================================================================

#[test]
fn test_depth_bound_truncates_with_neutral_value() {
    let config = EngineConfig::default().with_simulations(20).with_max_depth(10);
    let mut engine = MctsEngine::<Endless>::new(config).unwrap();

    let mv = engine.select_move(&Endless::default()).unwrap();
    assert!(mv.is_some());

    let stats = engine.last_stats();
    assert_eq!(stats.simulations, 20);
    assert_eq!(stats.truncated, 20);
    for (_, _, record) in engine.statistics().iter() {
        assert!(record.visits() >= 1);
        assert_eq!(record.total_value(), 0.0);
    }
}

#[test]
fn test_cyclic_positions_stay_consistent() {
    let config = EngineConfig::default().with_simulations(100).with_max_depth(12);
    let mut engine = MctsEngine::<Cycle>::new(config).unwrap();
    engine.search(&Cycle::default()).unwrap();

    assert!(engine.statistics().len() <= 12);
    for (_, _, record) in engine.statistics().iter() {
        assert!(record.visits() >= 1);
    }
}

// =============================================================================
// Oracle contract
// =============================================================================

#[test]
fn test_priors_are_scoped_to_legal_actions() {
    let board = TicTacToe::from_moves(&[4]).unwrap();
    let mut engine = MctsEngine::with_oracle(EngineConfig::for_guided(), RampOracle).unwrap();
    engine.run_simulation(&board).unwrap();

    let legal = board.legal_actions();
    let stats = engine.root_stats(&board);
    assert_eq!(stats.len(), legal.len());
    for (i, s) in stats.iter().enumerate() {
        let expected = (i + 1) as f64 / 36.0;
        assert!((s.prior.unwrap() - expected).abs() < 1e-12);
    }
}

#[test]
fn test_malformed_priors_are_a_contract_violation() {
    let board = TicTacToe::from_moves(&[4]).unwrap();
    let mut engine = MctsEngine::with_oracle(EngineConfig::for_guided(), FullBoardOracle).unwrap();

    let err = engine.select_move(&board).unwrap_err();
    assert!(matches!(err, MctsError::OracleContractViolation(_)));
    assert!(engine.statistics().is_empty());
}

#[test]
fn test_oracle_failure_is_reported() {
    let mut engine = MctsEngine::with_oracle(EngineConfig::for_guided(), FailingOracle).unwrap();
    let err = engine.select_move(&TicTacToe::new(3)).unwrap_err();
    assert!(matches!(err, MctsError::Oracle(OracleError::ModelError(_))));
}

// =============================================================================
// Move choice
// =============================================================================

#[test]
fn test_rollout_finds_forced_win() {
    let board = forced_win();
    for seed in 0..10 {
        let mut engine = rollout_engine::<TicTacToe>(seed, 200);
        assert_eq!(engine.select_move(&board).unwrap(), Some(2), "seed {seed}");
    }
}

#[test]
fn test_guided_finds_forced_win() {
    let board = forced_win();
    for seed in 0..5 {
        let config = EngineConfig::for_guided().with_simulations(200).with_seed(seed);
        let mut engine = MctsEngine::with_oracle(config, UniformOracle::new()).unwrap();
        assert_eq!(engine.select_move(&board).unwrap(), Some(2), "seed {seed}");
    }
}

#[test]
fn test_larger_budget_never_loses_visits() {
    let board = TicTacToe::new(3);
    for seed in 0..5 {
        let mut small = rollout_engine::<TicTacToe>(seed, 50);
        small.search(&board).unwrap();

        let mut large = rollout_engine::<TicTacToe>(seed, 200);
        let chosen = large.select_move(&board).unwrap().unwrap();

        assert!(root_visits(&large, &board, chosen) >= root_visits(&small, &board, chosen));
    }
}

#[test]
fn test_runs_are_deterministic() {
    let board = TicTacToe::from_moves(&[4]).unwrap();

    let mut a = rollout_engine::<TicTacToe>(7, 300);
    let mut b = rollout_engine::<TicTacToe>(7, 300);
    assert_eq!(a.select_move(&board).unwrap(), b.select_move(&board).unwrap());
    assert_eq!(a.statistics(), b.statistics());

    let guided = || {
        let config = EngineConfig::for_guided().with_simulations(300).with_seed(7);
        MctsEngine::<TicTacToe>::with_oracle(config, UniformOracle::new()).unwrap()
    };
    let (mut a, mut b) = (guided(), guided());
    assert_eq!(a.select_move(&board).unwrap(), b.select_move(&board).unwrap());
    assert_eq!(a.statistics(), b.statistics());
}

// =============================================================================
// Move distributions
// =============================================================================

#[test]
fn test_zero_temperature_is_one_hot() {
    let board = TicTacToe::new(3);
    let mut engine = rollout_engine::<TicTacToe>(2, 200);
    let dist = engine.move_distribution(&board, 0.0).unwrap();

    assert_eq!(dist.len(), 9);
    let nonzero: Vec<_> = dist.entries().iter().filter(|(_, p)| *p > 0.0).collect();
    assert_eq!(nonzero.len(), 1);
    assert_eq!(nonzero[0].1, 1.0);
    assert_eq!(Some(nonzero[0].0), engine.best_action(&board));
}

#[test]
fn test_unit_temperature_matches_visit_counts() {
    let board = forced_win();
    let mut engine = rollout_engine::<TicTacToe>(2, 200);
    let dist = engine.move_distribution(&board, 1.0).unwrap();

    let stats = engine.root_stats(&board);
    let total: u32 = stats.iter().map(|s| s.visits).sum();
    let sum: f64 = dist.entries().iter().map(|(_, p)| p).sum();
    assert!((sum - 1.0).abs() < 1e-12);
    for s in &stats {
        assert_eq!(dist.probability(s.action), s.visits as f64 / total as f64);
    }
    assert_eq!(dist.most_likely(), Some(2));
}

#[test]
fn test_low_temperature_sharpens() {
    let board = forced_win();
    let mut engine = rollout_engine::<TicTacToe>(2, 200);
    let flat = engine.move_distribution(&board, 1.0).unwrap();

    let mut engine = rollout_engine::<TicTacToe>(2, 200);
    let sharp = engine.move_distribution(&board, 0.25).unwrap();

    assert!(sharp.probability(2) > flat.probability(2));
    let sum: f64 = sharp.entries().iter().map(|(_, p)| p).sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

// =============================================================================
// Episodes
// =============================================================================

#[test]
fn test_statistics_reset_between_decisions() {
    let board = TicTacToe::new(3);
    let mut engine = rollout_engine::<TicTacToe>(0, 100);
    engine.select_move(&board).unwrap();
    engine.select_move(&board).unwrap();

    let total: u32 = engine.root_stats(&board).iter().map(|s| s.visits).sum();
    assert_eq!(total, 100);
    assert_eq!(engine.simulations_run(), 200);
}

#[test]
fn test_retained_statistics_carry_over() {
    let board = TicTacToe::new(3);
    let config = EngineConfig::default()
        .with_simulations(100)
        .with_retained_statistics(true);
    let mut engine = MctsEngine::<TicTacToe>::new(config).unwrap();
    engine.select_move(&board).unwrap();
    engine.select_move(&board).unwrap();

    let total: u32 = engine.root_stats(&board).iter().map(|s| s.visits).sum();
    assert_eq!(total, 200);

    engine.reset();
    assert!(engine.statistics().is_empty());
}
