use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};

use internal_iterator::InternalIterator;
use rand::Rng;

use crate::ai::{Bot, BotFault, RawMove};
use crate::board::{Color, Coord};
use crate::games::othello::OthelloBoard;

/// Search time per move, comfortably below the default one second move timeout.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(300);

#[rustfmt::skip]
const WEIGHTS_8: [i32; 64] = [
    120, -20,  20,   5,   5,  20, -20, 120,
    -20, -40,  -5,  -5,  -5,  -5, -40, -20,
     20,  -5,  15,   3,   3,  15,  -5,  20,
      5,  -5,   3,   3,   3,   3,  -5,   5,
      5,  -5,   3,   3,   3,   3,  -5,   5,
     20,  -5,  15,   3,   3,  15,  -5,  20,
    -20, -40,  -5,  -5,  -5,  -5, -40, -20,
    120, -20,  20,   5,   5,  20, -20, 120,
];

/// The positional value of owning `coord`. Boards other than 8×8 use the same shape,
/// based on the distance to the nearest edges.
pub fn positional_weight(size: usize, coord: Coord) -> i32 {
    if size == 8 {
        return WEIGHTS_8[coord.row * 8 + coord.col];
    }

    let last = size - 1;
    let dr = coord.row.min(last - coord.row);
    let dc = coord.col.min(last - coord.col);

    match (dr.min(dc), dr.max(dc)) {
        (0, 0) => 120,
        (0, 1) => -20,
        (1, 1) => -40,
        (0, _) => 10,
        (1, _) => -5,
        _ => 2,
    }
}

/// Static evaluation from the POV of `color`: position, mobility and disc difference.
pub fn evaluate(board: &OthelloBoard, color: Color, weights: &[i32]) -> i32 {
    let mut position = 0;
    for coord in board.coords() {
        match board.tile(coord).color() {
            Some(c) if c == color => position += weights[coord.row * board.size() + coord.col],
            Some(_) => position -= weights[coord.row * board.size() + coord.col],
            None => {}
        }
    }

    let mine = board.mobility(color) as i32;
    let theirs = board.mobility(color.other()) as i32;
    let mobility = 100 * (mine - theirs) / (mine + theirs + 1);

    let discs = board.count(color) as i32 - board.count(color.other()) as i32;

    position * 10 + mobility * 5 + discs * 2
}

/// Alpha-beta negamax with iterative deepening, stopping when the time budget runs out.
/// Moves with the same value are picked between uniformly at random.
pub struct MinimaxBot<R: Rng> {
    color: Color,
    budget: Duration,
    rng: R,
    weights: Vec<i32>,
}

impl<R: Rng> Debug for MinimaxBot<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MinimaxBot {{ color: {:?}, budget: {:?} }}", self.color, self.budget)
    }
}

impl<R: Rng> MinimaxBot<R> {
    pub fn new(color: Color, budget: Duration, rng: R) -> Self {
        MinimaxBot {
            color,
            budget,
            rng,
            weights: vec![],
        }
    }

    fn ensure_weights(&mut self, size: usize) {
        if self.weights.len() != size * size {
            self.weights = Coord::all(size).map(|c| positional_weight(size, c)).collect();
        }
    }

    fn max_depth(board: &OthelloBoard) -> u32 {
        let (black, white) = board.count_pieces();
        let empties = board.size() * board.size() - black - white;
        match empties {
            0..=12 => 8,
            13..=20 => 6,
            _ => 5,
        }
    }

    /// Returns `None` if the deadline passed before the search finished.
    fn search_root(&mut self, board: &OthelloBoard, moves: &[Coord], depth: u32, deadline: Instant) -> Option<Coord> {
        let mut best_value = i32::MIN;
        let mut best_move = None;
        let mut ties = 0;
        let mut alpha = -i32::MAX;

        for &mv in moves {
            let child = match board.clone_and_play(mv, self.color) {
                Ok(child) => child,
                Err(_) => continue,
            };
            let value = -self.negamax(&child, self.color.other(), depth - 1, -i32::MAX, -alpha, deadline)?;

            if value > best_value {
                best_value = value;
                best_move = Some(mv);
                ties = 1;
            } else if value == best_value {
                // reservoir sampling over equally good moves
                ties += 1;
                if self.rng.gen_range(0..ties) == 0 {
                    best_move = Some(mv);
                }
            }
            alpha = alpha.max(value);
        }

        best_move
    }

    fn negamax(
        &self,
        board: &OthelloBoard,
        color: Color,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        deadline: Instant,
    ) -> Option<i32> {
        if Instant::now() >= deadline {
            return None;
        }

        let moves: Vec<Coord> = board.legal_moves(color).collect();
        if depth == 0 || (moves.is_empty() && !board.has_legal_move(color.other())) {
            return Some(evaluate(board, color, &self.weights));
        }
        if moves.is_empty() {
            return self
                .negamax(board, color.other(), depth - 1, -beta, -alpha, deadline)
                .map(|v| -v);
        }

        let mut best = -i32::MAX;
        for mv in moves {
            let child = match board.clone_and_play(mv, color) {
                Ok(child) => child,
                Err(_) => continue,
            };
            let value = -self.negamax(&child, color.other(), depth - 1, -beta, -alpha, deadline)?;

            best = best.max(value);
            alpha = alpha.max(value);
            if alpha >= beta {
                break;
            }
        }

        Some(best)
    }
}

impl<R: Rng + Send> Bot for MinimaxBot<R> {
    fn select_move(&mut self, board: &OthelloBoard) -> Result<RawMove, BotFault> {
        let start = Instant::now();
        let deadline = start + self.budget;
        self.ensure_weights(board.size());

        let moves: Vec<Coord> = board.legal_moves(self.color).collect();
        let mut best = *moves
            .first()
            .ok_or_else(|| BotFault::Raised(format!("no legal move available for {}", self.color)))?;

        for depth in 1..=Self::max_depth(board) {
            match self.search_root(board, &moves, depth, deadline) {
                Some(mv) => best = mv,
                None => break,
            }
        }

        Ok((best.row as i64, best.col as i64))
    }
}
