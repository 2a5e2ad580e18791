//! An n×n tic-tac-toe board.
//!
//! Squares are numbered left to right, top to bottom starting at 0, so a 3×3
//! board is
//!
//! ```text
//! 0 1 2
//! 3 4 5
//! 6 7 8
//! ```
//!
//! `First` plays `X`, `Second` plays `O`. A side wins by filling a whole row,
//! column or main diagonal; a full board with no line is a draw.

use std::fmt;

use crate::game::{GameState, Player, Winner};

/// Index of a square on the board.
pub type Square = usize;

/// Reason a move was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    OffBoard(Square),
    Occupied(Square),
    GameOver,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::OffBoard(sq) => write!(f, "illegal move: square {sq} is off the board"),
            MoveError::Occupied(sq) => write!(f, "illegal move: square {sq} is occupied"),
            MoveError::GameOver => write!(f, "illegal move: the game is over"),
        }
    }
}

impl std::error::Error for MoveError {}

/// Board position plus the side to move.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TicTacToe {
    size: usize,
    cells: Vec<Option<Player>>,
    to_move: Player,
    winner: Option<Winner>,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TicTacToe {
    /// Empty board of `size`×`size` with `First` to move.
    ///
    /// # Panics
    /// If `size` is smaller than 3.
    pub fn new(size: usize) -> Self {
        assert!(size >= 3, "board size must be at least 3, got {size}");
        Self {
            size,
            cells: vec![None; size * size],
            to_move: Player::First,
            winner: None,
        }
    }

    /// Play a sequence of moves from the empty 3×3 board.
    pub fn from_moves(moves: &[Square]) -> Result<Self, MoveError> {
        let mut board = Self::default();
        for &sq in moves {
            board.try_play(sq)?;
        }
        Ok(board)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, sq: Square) -> Option<Player> {
        self.cells.get(sq).copied().flatten()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Play `sq` for the side to move, rejecting illegal moves.
    pub fn try_play(&mut self, sq: Square) -> Result<(), MoveError> {
        if self.winner.is_some() {
            return Err(MoveError::GameOver);
        }
        if sq >= self.cells.len() {
            return Err(MoveError::OffBoard(sq));
        }
        if self.cells[sq].is_some() {
            return Err(MoveError::Occupied(sq));
        }

        let player = self.to_move;
        self.cells[sq] = Some(player);
        self.to_move = player.opponent();

        if self.completes_line(sq, player) {
            self.winner = Some(Winner::Player(player));
        } else if self.is_full() {
            self.winner = Some(Winner::Draw);
        }
        Ok(())
    }

    /// Whether the stone just placed at `sq` completes a line for `player`.
    /// Only lines through `sq` need checking.
    fn completes_line(&self, sq: Square, player: Player) -> bool {
        let n = self.size;
        let (row, col) = (sq / n, sq % n);
        let owned = |r: usize, c: usize| self.cells[r * n + c] == Some(player);

        if (0..n).all(|c| owned(row, c)) || (0..n).all(|r| owned(r, col)) {
            return true;
        }
        if row == col && (0..n).all(|i| owned(i, i)) {
            return true;
        }
        row + col == n - 1 && (0..n).all(|i| owned(i, n - 1 - i))
    }
}

impl GameState for TicTacToe {
    type Action = Square;
    type Fingerprint = (Vec<Option<Player>>, Player);

    fn legal_actions(&self) -> Vec<Square> {
        if self.winner.is_some() {
            return Vec::new();
        }
        (0..self.cells.len())
            .filter(|&sq| self.cells[sq].is_none())
            .collect()
    }

    fn current_player(&self) -> Player {
        self.to_move
    }

    /// # Panics
    /// If the move is illegal; the engine only plays moves from
    /// `legal_actions`.
    fn play(&mut self, sq: Square) {
        if let Err(e) = self.try_play(sq) {
            panic!("{e}");
        }
    }

    fn fingerprint(&self) -> Self::Fingerprint {
        (self.cells.clone(), self.to_move)
    }

    fn winner(&self) -> Option<Winner> {
        self.winner
    }
}

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            for col in 0..self.size {
                let ch = match self.cells[row * self.size + col] {
                    Some(Player::First) => 'X',
                    Some(Player::Second) => 'O',
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
