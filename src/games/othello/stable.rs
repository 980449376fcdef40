//! Stable piece detection.
//!
//! A stable piece can never be flipped again for the rest of the game. Two analyses are provided:
//! * [stable_pieces] is a cheap single pass over the board that looks at clear lines towards the edges.
//!     It is what clients are shown, but it is only an approximation: pieces it reports can drop out
//!     again later in the game.
//! * [proven_stable_pieces] is an iterative fixed point that only accepts a piece once every line through it
//!     is blocked by a wall, a stable neighbor of the same color, or is completely filled.
//!     It finds fewer pieces, but everything it finds really is stable, so the set only grows during a game.
use crate::board::{Cell, Color, Coord, AXES};
use crate::games::othello::OthelloBoard;

/// Stable pieces according to the single pass heuristic, in row-major order.
///
/// A piece is reported if
/// * it occupies a corner, or
/// * for at least two of the four axes both directions are [clear](clear_to_edge) up to the edge, or
/// * it is an edge piece with a clear run along the edge towards one of the adjoining corners,
///     or with both the axis along the edge and the axis into the board completely clear.
pub fn stable_pieces(board: &OthelloBoard) -> Vec<Coord> {
    board
        .coords()
        .filter(|&coord| match board.tile(coord) {
            Cell::Empty => false,
            Cell::Piece(color) => is_heuristically_stable(board, coord, color),
        })
        .collect()
}

fn is_heuristically_stable(board: &OthelloBoard, coord: Coord, color: Color) -> bool {
    if board.is_corner(coord) {
        return true;
    }

    let clear_axes = AXES
        .iter()
        .filter(|axis| axis.iter().all(|&dir| clear_to_edge(board, coord, color, dir)))
        .count();
    if clear_axes >= 2 {
        return true;
    }

    if board.is_edge(coord) {
        for [along, across] in edge_axes(board, coord) {
            let towards_corner = along.iter().any(|&dir| clear_to_edge(board, coord, color, dir));
            let both_axes_full = along
                .iter()
                .chain(across.iter())
                .all(|&dir| clear_to_edge(board, coord, color, dir));

            if towards_corner || both_axes_full {
                return true;
            }
        }
    }

    false
}

/// For each edge `coord` lies on, the axis running along that edge followed by the axis going into the board.
fn edge_axes(board: &OthelloBoard, coord: Coord) -> Vec<[[(isize, isize); 2]; 2]> {
    let last = board.size() - 1;
    let horizontal = AXES[1];
    let vertical = AXES[0];

    let mut result = vec![];
    if coord.row == 0 || coord.row == last {
        result.push([horizontal, vertical]);
    }
    if coord.col == 0 || coord.col == last {
        result.push([vertical, horizontal]);
    }
    result
}

/// Whether every cell from the neighbor of `coord` in direction `dir` up to the edge holds a `color` piece.
/// This is vacuously true if `coord` is already on the edge in that direction.
pub fn clear_to_edge(board: &OthelloBoard, coord: Coord, color: Color, dir: (isize, isize)) -> bool {
    let mut curr = coord;
    while let Some(next) = curr.step(dir, board.size()) {
        if board.tile(next) != Cell::Piece(color) {
            return false;
        }
        curr = next;
    }
    true
}

/// Stable pieces according to the fixed point analysis, in row-major order.
///
/// Along each axis a piece must be protected by one of:
/// * a wall directly next to it on either side,
/// * a proven stable piece of its own color directly next to it on either side,
/// * the whole line being filled, so no move can ever be played on it.
pub fn proven_stable_pieces(board: &OthelloBoard) -> Vec<Coord> {
    let size = board.size();
    let mut stable = vec![false; size * size];

    loop {
        let mut changed = false;

        for coord in board.coords() {
            let index = coord.row * size + coord.col;
            if stable[index] {
                continue;
            }
            let color = match board.tile(coord) {
                Cell::Empty => continue,
                Cell::Piece(color) => color,
            };

            let protected = AXES.iter().all(|axis| {
                let blocked = axis.iter().any(|&dir| match coord.step(dir, size) {
                    None => true,
                    Some(next) => stable[next.row * size + next.col] && board.tile(next) == Cell::Piece(color),
                });
                blocked || line_full(board, coord, *axis)
            });

            if protected {
                stable[index] = true;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    board.coords().filter(|c| stable[c.row * size + c.col]).collect()
}

fn line_full(board: &OthelloBoard, coord: Coord, axis: [(isize, isize); 2]) -> bool {
    axis.iter().all(|&dir| {
        let mut curr = coord;
        while let Some(next) = curr.step(dir, board.size()) {
            if board.tile(next).is_empty() {
                return false;
            }
            curr = next;
        }
        true
    })
}
