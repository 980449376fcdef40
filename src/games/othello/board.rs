use crate::board::{Cell, Color, Coord};

pub const MIN_SIZE: usize = 4;
pub const MAX_SIZE: usize = 100;

/// An `n`×`n` Othello grid. Only placement primitives live here, the rules are in [rules](super::rules).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct OthelloBoard {
    size: usize,
    cells: Vec<Cell>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("board size must be between 4 and 100, got {0}")]
pub struct InvalidBoardSize(pub usize);

impl OthelloBoard {
    /// The standard opening position: with `mid = size / 2`, white on `(mid-1, mid-1)` and `(mid, mid)`,
    /// black on `(mid-1, mid)` and `(mid, mid-1)`. For odd sizes this sits slightly above and left of center.
    pub fn new(size: usize) -> Result<Self, InvalidBoardSize> {
        let mut board = Self::empty(size)?;

        let mid = size / 2;
        board.set_tile(Coord::new(mid - 1, mid - 1), Cell::Piece(Color::White));
        board.set_tile(Coord::new(mid - 1, mid), Cell::Piece(Color::Black));
        board.set_tile(Coord::new(mid, mid - 1), Cell::Piece(Color::Black));
        board.set_tile(Coord::new(mid, mid), Cell::Piece(Color::White));

        Ok(board)
    }

    /// A board without any pieces, mostly useful to set up custom positions.
    pub fn empty(size: usize) -> Result<Self, InvalidBoardSize> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
            return Err(InvalidBoardSize(size));
        }

        Ok(OthelloBoard {
            size,
            cells: vec![Cell::Empty; size * size],
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_valid_position(&self, row: i64, col: i64) -> bool {
        self.coord(row, col).is_some()
    }

    /// Convert signed coordinates to a [Coord], `None` if they are off the board.
    pub fn coord(&self, row: i64, col: i64) -> Option<Coord> {
        Coord::from_raw((row, col), self.size)
    }

    /// The cell at `(row, col)`, off-board positions read as [Cell::Empty].
    pub fn get(&self, row: i64, col: i64) -> Cell {
        match self.coord(row, col) {
            Some(coord) => self.tile(coord),
            None => Cell::Empty,
        }
    }

    /// Set the cell at `(row, col)`, off-board positions are ignored.
    pub fn set(&mut self, row: i64, col: i64, cell: Cell) {
        if let Some(coord) = self.coord(row, col) {
            self.set_tile(coord, cell);
        }
    }

    /// Panics if `coord` is not on this board.
    pub fn tile(&self, coord: Coord) -> Cell {
        self.cells[self.index(coord)]
    }

    /// Panics if `coord` is not on this board.
    pub fn set_tile(&mut self, coord: Coord, cell: Cell) {
        let index = self.index(coord);
        self.cells[index] = cell;
    }

    pub fn count(&self, color: Color) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Piece(color)).count()
    }

    /// The piece counts as `(black, white)`.
    pub fn count_pieces(&self) -> (usize, usize) {
        (self.count(Color::Black), self.count(Color::White))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    pub fn is_corner(&self, coord: Coord) -> bool {
        let last = self.size - 1;
        (coord.row == 0 || coord.row == last) && (coord.col == 0 || coord.col == last)
    }

    pub fn is_edge(&self, coord: Coord) -> bool {
        let last = self.size - 1;
        coord.row == 0 || coord.row == last || coord.col == 0 || coord.col == last
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> {
        Coord::all(self.size)
    }

    fn index(&self, coord: Coord) -> usize {
        assert!(
            coord.row < self.size && coord.col < self.size,
            "{:?} is not on a board of size {}",
            coord,
            self.size
        );
        coord.row * self.size + coord.col
    }
}
