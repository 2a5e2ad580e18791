//! The game-state capability the engine searches over.
//!
//! The engine never looks inside a position. It only asks a [`GameState`] for
//! its legal actions, whose turn it is, a hashable fingerprint and whether the
//! game is over. Any deterministic two-player zero-sum game with perfect
//! information can implement it.

use std::fmt::Debug;
use std::hash::Hash;

use crate::constants::{DRAW_VALUE, LOSS_VALUE, WIN_VALUE};

/// One of the two sides of a game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    First,
    Second,
}

impl Player {
    /// The other side.
    #[inline]
    pub fn opponent(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }
}

/// Final result of a finished game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Winner {
    Player(Player),
    Draw,
}

/// A position in a two-player game.
///
/// `play` mutates in place; `apply` is the non-mutating form and is what the
/// engine relies on when it needs an independent successor. Implementations
/// backed by persistent data structures can override `apply` directly.
pub trait GameState: Clone {
    /// Identifier of a single move. Compared for equality and hashed as part
    /// of a statistics key.
    type Action: Copy + Eq + Hash + Debug;

    /// Uniquely identifies a position, including the side to move when that
    /// is not implied by the position itself.
    type Fingerprint: Clone + Eq + Hash + Debug;

    /// Legal actions in a fixed enumeration order. Tie-breaks in the engine
    /// follow this order, so it must not depend on hashing.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Side to move.
    fn current_player(&self) -> Player;

    /// Play `action` for the side to move.
    fn play(&mut self, action: Self::Action);

    /// The position after `action`, leaving `self` untouched.
    fn apply(&self, action: Self::Action) -> Self {
        let mut next = self.clone();
        next.play(action);
        next
    }

    fn fingerprint(&self) -> Self::Fingerprint;

    /// `None` while the game is still in progress.
    fn winner(&self) -> Option<Winner>;
}

/// How a single simulation ended.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A terminal position with a winner.
    Win(Player),
    /// A terminal position with no winner, or no legal moves left.
    Draw,
    /// The depth bound was reached before the game ended.
    Undetermined,
    /// The oracle's value estimate for `player`, in [-1, 1].
    Estimate { player: Player, value: f64 },
}

impl Outcome {
    pub fn from_winner(winner: Winner) -> Self {
        match winner {
            Winner::Player(p) => Outcome::Win(p),
            Winner::Draw => Outcome::Draw,
        }
    }

    /// Value of this outcome from `player`'s point of view.
    pub fn value_for(&self, player: Player) -> f64 {
        match *self {
            Outcome::Win(winner) if winner == player => WIN_VALUE,
            Outcome::Win(_) => LOSS_VALUE,
            Outcome::Draw | Outcome::Undetermined => DRAW_VALUE,
            Outcome::Estimate { player: p, value } if p == player => value,
            Outcome::Estimate { value, .. } => -value,
        }
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self, Outcome::Undetermined)
    }
}
