use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

/// One of the two players, black always moves first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

/// The content of a single cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Piece(Color),
}

/// The absolute outcome for a game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Outcome {
    WonBy(Color),
    Draw,
}

/// A position on the board, `row` counts from the top and `col` from the left.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

/// The eight compass directions, in the order rays are scanned: N, NE, E, SE, S, SW, W, NW.
pub const DIRECTIONS: [(isize, isize); 8] = [(-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1)];

/// The four lines through a cell, each as a pair of opposite directions: N–S, E–W, NE–SW, NW–SE.
pub const AXES: [[(isize, isize); 2]; 4] = [
    [(-1, 0), (1, 0)],
    [(0, 1), (0, -1)],
    [(-1, 1), (1, -1)],
    [(-1, -1), (1, 1)],
];

impl Color {
    pub const BOTH: [Color; 2] = [Color::Black, Color::White];

    pub fn other(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }

    /// The integer used for this color when talking to bots and clients.
    pub fn to_wire(self) -> i8 {
        self.index() as i8
    }

    pub fn from_wire(value: i8) -> Option<Color> {
        match value {
            0 => Some(Color::Black),
            1 => Some(Color::White),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "Black",
            Color::White => "White",
        }
    }
}

impl Cell {
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Piece(color) => Some(color),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// `-1` for empty, otherwise the wire value of the color.
    pub fn to_wire(self) -> i8 {
        match self {
            Cell::Empty => -1,
            Cell::Piece(color) => color.to_wire(),
        }
    }

    pub fn from_wire(value: i8) -> Option<Cell> {
        match value {
            -1 => Some(Cell::Empty),
            _ => Color::from_wire(value).map(Cell::Piece),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Piece(color) => color.to_char(),
        }
    }
}

impl Outcome {
    /// The winner as sent to clients: the color wire value, or `-1` for a draw.
    pub fn to_wire(self) -> i8 {
        match self {
            Outcome::WonBy(color) => color.to_wire(),
            Outcome::Draw => -1,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WonBy(color) => Some(color),
            Outcome::Draw => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Outcome::WonBy(Color::Black) => "Black wins!",
            Outcome::WonBy(Color::White) => "White wins!",
            Outcome::Draw => "Game ended in a draw",
        }
    }
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Coord { row, col }
    }

    /// Convert a move as returned by a bot, which may be negative or out of range.
    pub fn from_raw(raw: (i64, i64), size: usize) -> Option<Coord> {
        let (row, col) = raw;
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        (row < size && col < size).then_some(Coord { row, col })
    }

    /// The neighbor in direction `(dr, dc)`, `None` if it falls off an `size`×`size` board.
    pub fn step(self, (dr, dc): (isize, isize), size: usize) -> Option<Coord> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < size && col < size).then_some(Coord { row, col })
    }

    /// Iterate over all cells of a `size`×`size` board in row-major order.
    pub fn all(size: usize) -> impl Iterator<Item = Coord> {
        (0..size).flat_map(move |row| (0..size).map(move |col| Coord { row, col }))
    }

    pub fn to_pair(self) -> [usize; 2] {
        [self.row, self.col]
    }
}

impl Debug for Coord {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Coord({}, {})", self.row, self.col)
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
