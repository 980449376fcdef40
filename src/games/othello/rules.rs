use std::ops::ControlFlow;

use internal_iterator::InternalIterator;

use crate::board::{Cell, Color, Coord, Outcome, DIRECTIONS};
use crate::games::othello::OthelloBoard;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{color} cannot play at {coord}")]
pub struct IllegalMove {
    pub coord: Coord,
    pub color: Color,
}

impl OthelloBoard {
    /// The number of opponent pieces `color` would capture along `dir` by playing on `coord`:
    /// the length of the opponent run starting next to `coord`, if that run is closed by a `color` piece, zero otherwise.
    pub fn capture_len(&self, coord: Coord, color: Color, dir: (isize, isize)) -> usize {
        let mut len = 0;
        let mut curr = coord;

        loop {
            let next = match curr.step(dir, self.size()) {
                Some(next) => next,
                None => return 0,
            };

            match self.tile(next) {
                Cell::Empty => return 0,
                Cell::Piece(c) if c == color => return len,
                Cell::Piece(_) => {
                    len += 1;
                    curr = next;
                }
            }
        }
    }

    /// Whether `color` can play on `coord`: the cell must be empty and at least one ray must capture.
    pub fn is_legal_move(&self, coord: Coord, color: Color) -> bool {
        coord.row < self.size()
            && coord.col < self.size()
            && self.tile(coord).is_empty()
            && DIRECTIONS.iter().any(|&dir| self.capture_len(coord, color, dir) > 0)
    }

    /// Iterate over the legal moves for `color` in row-major order.
    pub fn legal_moves(&self, color: Color) -> LegalMoves<'_> {
        LegalMoves { board: self, color }
    }

    pub fn has_legal_move(&self, color: Color) -> bool {
        self.legal_moves(color).any(|_| true)
    }

    /// The number of legal moves for `color`.
    pub fn mobility(&self, color: Color) -> usize {
        self.legal_moves(color).count()
    }

    /// Place a `color` piece on `coord` and flip every captured run.
    /// Returns the flipped cells, in ray order. Fails without touching the board if the move is illegal.
    pub fn play(&mut self, coord: Coord, color: Color) -> Result<Vec<Coord>, IllegalMove> {
        if !self.is_legal_move(coord, color) {
            return Err(IllegalMove { coord, color });
        }

        let mut flips = vec![];
        for dir in DIRECTIONS {
            let len = self.capture_len(coord, color, dir);

            let mut curr = coord;
            for _ in 0..len {
                // the run was just walked by capture_len, so it stays on the board
                curr = match curr.step(dir, self.size()) {
                    Some(next) => next,
                    None => break,
                };
                flips.push(curr);
            }
        }

        self.set_tile(coord, Cell::Piece(color));
        for &flip in &flips {
            self.set_tile(flip, Cell::Piece(color));
        }

        Ok(flips)
    }

    /// Clone this board, play the move on it and return the new board.
    pub fn clone_and_play(&self, coord: Coord, color: Color) -> Result<OthelloBoard, IllegalMove> {
        let mut next = self.clone();
        next.play(coord, color)?;
        Ok(next)
    }

    /// Who moves after `mover` has played: the opponent if they have a legal move, `mover` again if only
    /// they can move, and `None` once the game is over.
    pub fn next_to_move(&self, mover: Color) -> Option<Color> {
        if self.is_full() {
            return None;
        }
        let opponent = mover.other();
        if self.has_legal_move(opponent) {
            Some(opponent)
        } else if self.has_legal_move(mover) {
            Some(mover)
        } else {
            None
        }
    }

    /// The game is over when the board is full or neither side can move.
    pub fn is_game_over(&self) -> bool {
        self.is_full() || (!self.has_legal_move(Color::Black) && !self.has_legal_move(Color::White))
    }

    /// The outcome of this board, `None` if the game is not over yet.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.is_game_over() {
            Some(self.outcome_by_count())
        } else {
            None
        }
    }

    /// The side with strictly more pieces wins, equal counts are a draw.
    pub fn outcome_by_count(&self) -> Outcome {
        let (black, white) = self.count_pieces();
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => Outcome::WonBy(Color::Black),
            std::cmp::Ordering::Less => Outcome::WonBy(Color::White),
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }
}

/// The iterator returned by [OthelloBoard::legal_moves].
#[derive(Debug)]
pub struct LegalMoves<'a> {
    board: &'a OthelloBoard,
    color: Color,
}

impl<'a> InternalIterator for LegalMoves<'a> {
    type Item = Coord;

    fn try_for_each<R, F>(self, mut f: F) -> ControlFlow<R>
    where
        F: FnMut(Self::Item) -> ControlFlow<R>,
    {
        self.board.coords().try_for_each(|coord| {
            if self.board.is_legal_move(coord, self.color) {
                f(coord)
            } else {
                ControlFlow::Continue(())
            }
        })
    }
}
