use internal_iterator::InternalIterator;

use othello_arena::board::{Cell, Color, Coord, DIRECTIONS};
use othello_arena::games::othello::OthelloBoard;
use othello_arena::util::board_gen::random_move;

use crate::util::{consistent_rng, test_sampler_uniform};


pub fn board_test_main(board: &OthelloBoard, next: Option<Color>) {
    board_test_main_impl(board, next, true)
}

pub fn board_test_main_without_uniform(board: &OthelloBoard, next: Option<Color>) {
    board_test_main_impl(board, next, false)
}

fn board_test_main_impl(board: &OthelloBoard, next: Option<Color>, random_uniform: bool) {
    println!("Currently testing board\n{}next: {:?}", board, next);

    match next {
        None => test_done_board(board),
        Some(color) => {
            test_legal_match(board, color);
            test_play_counts(board, color);

            if random_uniform {
                test_random_move_uniform(board, color);
            }
        }
    }

    test_grid_round_trip(board);
}

fn test_done_board(board: &OthelloBoard) {
    assert!(board.is_game_over());
    assert!(board.outcome().is_some());
    for color in Color::BOTH {
        assert_eq!(board.mobility(color), 0, "{} can still move on a finished board", color);
    }
}

/// The slow but obvious legality check: walk every ray and look for a closed opponent run.
fn brute_force_legal(board: &OthelloBoard, coord: Coord, color: Color) -> bool {
    if !board.tile(coord).is_empty() {
        return false;
    }

    DIRECTIONS.iter().any(|&(dr, dc)| {
        let mut row = coord.row as i64 + dr as i64;
        let mut col = coord.col as i64 + dc as i64;
        let mut seen_opponent = false;

        while board.is_valid_position(row, col) {
            match board.get(row, col) {
                Cell::Empty => return false,
                Cell::Piece(c) if c == color => return seen_opponent,
                Cell::Piece(_) => seen_opponent = true,
            }
            row += dr as i64;
            col += dc as i64;
        }
        false
    })
}

fn test_legal_match(board: &OthelloBoard, color: Color) {
    let legal: Vec<Coord> = board.legal_moves(color).collect();
    let expected: Vec<Coord> = board
        .coords()
        .filter(|&coord| brute_force_legal(board, coord, color))
        .collect();

    assert_eq!(expected, legal, "legal moves mismatch for {}", color);
    assert_eq!(legal.len(), board.mobility(color));
    assert_eq!(!legal.is_empty(), board.has_legal_move(color));

    for coord in board.coords() {
        assert_eq!(
            legal.contains(&coord),
            board.is_legal_move(coord, color),
            "is_legal_move mismatch at {}",
            coord
        );
    }
}

fn test_play_counts(board: &OthelloBoard, color: Color) {
    let before = board.count(color);
    let before_opponent = board.count(color.other());

    board.legal_moves(color).for_each(|mv: Coord| {
        let mut child = board.clone();
        let flips = child.play(mv, color).unwrap();

        assert!(!flips.is_empty());
        assert_eq!(child.tile(mv), Cell::Piece(color));
        for &flip in &flips {
            assert_eq!(board.tile(flip), Cell::Piece(color.other()));
            assert_eq!(child.tile(flip), Cell::Piece(color));
        }

        assert_eq!(child.count(color), before + 1 + flips.len());
        assert_eq!(child.count(color.other()), before_opponent - flips.len());
        assert_eq!(Ok(child), board.clone_and_play(mv, color));
    });

    board.coords().for_each(|coord| {
        if board.is_legal_move(coord, color) {
            return;
        }
        let mut child = board.clone();
        assert!(child.play(coord, color).is_err());
        assert_eq!(&child, board, "illegal move {} changed the board", coord);
    });
}

fn test_random_move_uniform(board: &OthelloBoard, color: Color) {
    let expected: Vec<Coord> = board.legal_moves(color).collect();
    let mut rng = consistent_rng();
    test_sampler_uniform(&expected, false, || random_move(board, color, &mut rng));
}

fn test_grid_round_trip(board: &OthelloBoard) {
    let grid = board.to_grid();
    assert_eq!(grid.len(), board.size());
    assert_eq!(&OthelloBoard::from_grid(&grid).unwrap(), board);

    let printed = board.to_string();
    let rows: String = printed.lines().take(board.size()).map(|l| format!("{}\n", l)).collect();
    assert_eq!(&OthelloBoard::from_ascii(&rows).unwrap(), board);
}
