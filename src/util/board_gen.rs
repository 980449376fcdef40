//! Utilities to generate an `OthelloBoard` in a random state.
//!
//! Othello boards don't track the side to move, so every function here also returns who moves next,
//! `None` once the game is over.
use internal_iterator::InternalIterator;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::{Color, Coord};
use crate::games::othello::OthelloBoard;

/// Play the given moves starting from `start` with `first` to move, passing the turn the way a match does.
pub fn board_with_moves(start: OthelloBoard, first: Color, moves: &[Coord]) -> (OthelloBoard, Option<Color>) {
    let mut curr = start;
    let mut next = Some(first);

    for &mv in moves {
        let color = match next {
            Some(color) => color,
            None => panic!("Board already done, playing {} on\n{}", mv, curr),
        };
        if let Err(e) = curr.play(mv, color) {
            panic!("{} on\n{}", e, curr);
        }
        next = curr.next_to_move(color);
    }

    (curr, next)
}

/// Pick a uniformly random legal move for `color`, `None` if there is none.
pub fn random_move(board: &OthelloBoard, color: Color, rng: &mut impl Rng) -> Option<Coord> {
    let moves: Vec<Coord> = board.legal_moves(color).collect();
    moves.choose(rng).copied()
}

/// Generate a board by playing `n` random moves on `start`, black to move first.
/// Games that end before `n` moves are discarded and retried.
pub fn random_board_with_moves(start: &OthelloBoard, n: u32, rng: &mut impl Rng) -> (OthelloBoard, Option<Color>) {
    'new_try: loop {
        let mut board = start.clone();
        let mut next = Some(Color::Black);

        for _ in 0..n {
            let color = match next {
                Some(color) => color,
                None => continue 'new_try,
            };
            let mv = match random_move(&board, color, rng) {
                Some(mv) => mv,
                None => continue 'new_try,
            };
            if board.play(mv, color).is_err() {
                continue 'new_try;
            }
            next = board.next_to_move(color);
        }

        return (board, next);
    }
}

/// Iterator over randomly played games.
/// Yields all intermediate boards with the side to move, including the start and end of each game.
#[derive(Debug, Clone)]
pub struct RandomBoardIterator<R: Rng> {
    start: OthelloBoard,
    rng: R,
    curr: OthelloBoard,
    next: Option<Color>,
}

impl<R: Rng> RandomBoardIterator<R> {
    pub fn new(start: OthelloBoard, rng: R) -> Self {
        let next = if start.is_game_over() { None } else { Some(Color::Black) };
        RandomBoardIterator {
            curr: start.clone(),
            start,
            rng,
            next,
        }
    }

    fn restart(&mut self) {
        self.curr = self.start.clone();
        self.next = if self.curr.is_game_over() { None } else { Some(Color::Black) };
    }
}

impl<R: Rng> Iterator for RandomBoardIterator<R> {
    type Item = (OthelloBoard, Option<Color>);

    fn next(&mut self) -> Option<Self::Item> {
        let result = (self.curr.clone(), self.next);

        let played = self.next.and_then(|color| {
            let mv = random_move(&self.curr, color, &mut self.rng)?;
            self.curr.play(mv, color).ok()?;
            Some(color)
        });

        match played {
            Some(color) => self.next = self.curr.next_to_move(color),
            None => self.restart(),
        }

        Some(result)
    }
}
