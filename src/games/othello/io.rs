use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::board::{Cell, Color, Coord};
use crate::games::othello::{InvalidBoardSize, OthelloBoard};

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InvalidGrid {
    #[error(transparent)]
    Size(#[from] InvalidBoardSize),
    #[error("row {row} has length {len}, expected {size}")]
    RaggedRow { row: usize, len: usize, size: usize },
    #[error("invalid cell {value:?} at {coord}")]
    InvalidCell { coord: Coord, value: String },
}

impl OthelloBoard {
    /// The board as rows of wire values: `-1` empty, `0` black, `1` white.
    pub fn to_grid(&self) -> Vec<Vec<i8>> {
        (0..self.size())
            .map(|row| {
                (0..self.size())
                    .map(|col| self.tile(Coord::new(row, col)).to_wire())
                    .collect()
            })
            .collect()
    }

    /// All cells as wire values in row-major order.
    pub fn to_wire_cells(&self) -> Vec<i8> {
        self.coords().map(|coord| self.tile(coord).to_wire()).collect()
    }

    pub fn from_grid(grid: &[Vec<i8>]) -> Result<OthelloBoard, InvalidGrid> {
        let size = grid.len();
        let mut board = OthelloBoard::empty(size)?;

        for (row, cells) in grid.iter().enumerate() {
            if cells.len() != size {
                return Err(InvalidGrid::RaggedRow {
                    row,
                    len: cells.len(),
                    size,
                });
            }

            for (col, &value) in cells.iter().enumerate() {
                let coord = Coord::new(row, col);
                let cell = Cell::from_wire(value).ok_or_else(|| InvalidGrid::InvalidCell {
                    coord,
                    value: value.to_string(),
                })?;
                board.set_tile(coord, cell);
            }
        }

        Ok(board)
    }

    /// Parse rows of `.`, `B` and `W` as printed by [Display], without the trailing count line.
    /// Lines are trimmed, so boards can be written indented inside test code.
    pub fn from_ascii(s: &str) -> Result<OthelloBoard, InvalidGrid> {
        let rows = s.lines().map(str::trim).filter(|l| !l.is_empty()).collect_vec();
        let size = rows.len();
        let mut board = OthelloBoard::empty(size)?;

        for (row, line) in rows.iter().enumerate() {
            let chars = line.chars().filter(|c| !c.is_whitespace()).collect_vec();
            if chars.len() != size {
                return Err(InvalidGrid::RaggedRow {
                    row,
                    len: chars.len(),
                    size,
                });
            }

            for (col, &c) in chars.iter().enumerate() {
                let coord = Coord::new(row, col);
                let cell = match c {
                    '.' => Cell::Empty,
                    'B' | 'b' => Cell::Piece(Color::Black),
                    'W' | 'w' => Cell::Piece(Color::White),
                    _ => {
                        return Err(InvalidGrid::InvalidCell {
                            coord,
                            value: c.to_string(),
                        })
                    }
                };
                board.set_tile(coord, cell);
            }
        }

        Ok(board)
    }
}

impl Display for OthelloBoard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.size() {
            let line = (0..self.size())
                .map(|col| self.tile(Coord::new(row, col)).to_char())
                .join(" ");
            writeln!(f, "{}", line)?;
        }

        let (black, white) = self.count_pieces();
        writeln!(f, "black: {}, white: {}", black, white)?;
        Ok(())
    }
}
