//! Tictac-Zero: a Monte Carlo Tree Search engine for two-player games.
//!
//! The engine picks a move for any deterministic, perfect-information,
//! two-player zero-sum game that implements [`game::GameState`]. It either
//! runs plain UCB1 search with random rollouts, or AlphaZero-style PUCT
//! search guided by a [`oracle::PolicyValueOracle`].
//!
//! ## Modules
//!
//! - [`constants`] - Default search parameters
//! - [`config`] - Engine configuration and budgets
//! - [`game`] - The game-state interface and outcomes
//! - [`board`] - n×n tic-tac-toe, the reference game
//! - [`oracle`] - Policy/value oracle interface and contract checks
//! - [`stats`] - Per-edge visit statistics
//! - [`selection`] - UCB1 and PUCT scores
//! - [`simulation`] - Rollout and oracle-guided simulations
//! - [`mcts`] - The search engine, backpropagation and move distributions
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```
//! use tictac_zero::board::TicTacToe;
//! use tictac_zero::config::EngineConfig;
//! use tictac_zero::mcts::MctsEngine;
//!
//! // X to move with two in a row: square 2 wins.
//! let board = TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap();
//!
//! let mut engine = MctsEngine::new(EngineConfig::default().with_simulations(400)).unwrap();
//! let best = engine.select_move(&board).unwrap();
//! assert_eq!(best, Some(2));
//!
//! // Visit counts as training targets.
//! let pi = engine.move_distribution(&board, 1.0).unwrap();
//! let total: f64 = pi.entries().iter().map(|(_, p)| p).sum();
//! assert!((total - 1.0).abs() < 1e-9);
//! ```

pub mod board;
pub mod config;
pub mod constants;
pub mod error;
pub mod game;
pub mod mcts;
pub mod oracle;
pub mod selection;
pub mod simulation;
pub mod stats;
