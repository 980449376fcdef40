//! Two simple bots: `RandomBot` and `GreedyBot`.
use std::fmt::{Debug, Formatter};

use internal_iterator::InternalIterator;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::ai::{Bot, BotFault, RawMove};
use crate::board::{Color, Coord, DIRECTIONS};
use crate::games::othello::OthelloBoard;
use crate::util::board_gen::random_move;

fn no_moves(color: Color) -> BotFault {
    BotFault::Raised(format!("no legal move available for {}", color))
}

/// Bot that chooses moves randomly uniformly among possible moves.
pub struct RandomBot<R: Rng> {
    color: Color,
    rng: R,
}

impl<R: Rng> Debug for RandomBot<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RandomBot {{ color: {:?} }}", self.color)
    }
}

impl<R: Rng> RandomBot<R> {
    pub fn new(color: Color, rng: R) -> Self {
        RandomBot { color, rng }
    }
}

impl<R: Rng + Send> Bot for RandomBot<R> {
    fn select_move(&mut self, board: &OthelloBoard) -> Result<RawMove, BotFault> {
        let mv = random_move(board, self.color, &mut self.rng).ok_or_else(|| no_moves(self.color))?;
        Ok((mv.row as i64, mv.col as i64))
    }
}

/// Bot that plays the move flipping the most pieces, breaking ties randomly.
pub struct GreedyBot<R: Rng> {
    color: Color,
    rng: R,
}

impl<R: Rng> Debug for GreedyBot<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GreedyBot {{ color: {:?} }}", self.color)
    }
}

impl<R: Rng> GreedyBot<R> {
    pub fn new(color: Color, rng: R) -> Self {
        GreedyBot { color, rng }
    }
}

impl<R: Rng + Send> Bot for GreedyBot<R> {
    fn select_move(&mut self, board: &OthelloBoard) -> Result<RawMove, BotFault> {
        let moves: Vec<Coord> = board.legal_moves(self.color).collect();

        let flips = |&mv: &Coord| -> usize {
            DIRECTIONS
                .iter()
                .map(|&dir| board.capture_len(mv, self.color, dir))
                .sum()
        };
        let best = moves.iter().map(flips).max().ok_or_else(|| no_moves(self.color))?;
        let candidates = moves.iter().filter(|&mv| flips(mv) == best).collect_vec();

        let mv = candidates.choose(&mut self.rng).ok_or_else(|| no_moves(self.color))?;
        Ok((mv.row as i64, mv.col as i64))
    }
}
