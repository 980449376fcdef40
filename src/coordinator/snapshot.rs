use internal_iterator::InternalIterator;

use crate::board::Color;
use crate::coordinator::{Match, MatchId};
use crate::games::othello::stable::stable_pieces;

/// Everything a client needs to render a match, using the wire encoding:
/// cells are `-1` empty, `0` black and `1` white, winner `-1` is a draw.
#[derive(Debug, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub board: Vec<Vec<i8>>,
    pub current_player: i8,
    pub black_count: usize,
    pub white_count: usize,
    /// Legal moves of the side to move, empty once the match is over.
    pub valid_moves: Vec<[usize; 2]>,
    pub game_over: bool,
    pub winner: Option<i8>,
    pub message: Option<String>,
    pub paused: bool,
    pub last_move: Option<[usize; 2]>,
    pub last_flips: Vec<[usize; 2]>,
    pub stable_pieces: Vec<[usize; 2]>,
    pub black_player: String,
    pub white_player: String,
    pub black_init_time_ms: Option<u64>,
    pub white_init_time_ms: Option<u64>,
    pub last_move_time_ms: Option<u64>,
}

impl Match {
    pub fn snapshot(&self) -> MatchSnapshot {
        let board = self.board();
        let (black_count, white_count) = board.count_pieces();

        let valid_moves = if self.is_over() {
            vec![]
        } else {
            board.legal_moves(self.current_player()).map(|c| c.to_pair()).collect()
        };
        let millis = |d: std::time::Duration| d.as_millis() as u64;

        MatchSnapshot {
            match_id: self.id(),
            board: board.to_grid(),
            current_player: self.current_player().to_wire(),
            black_count,
            white_count,
            valid_moves,
            game_over: self.is_over(),
            winner: self.outcome().map(|o| o.to_wire()),
            message: self.message().map(str::to_owned),
            paused: self.is_paused(),
            last_move: self.last_move().map(|c| c.to_pair()),
            last_flips: self.last_flips().iter().map(|c| c.to_pair()).collect(),
            stable_pieces: stable_pieces(board).iter().map(|c| c.to_pair()).collect(),
            black_player: self.player_label(Color::Black).to_owned(),
            white_player: self.player_label(Color::White).to_owned(),
            black_init_time_ms: self.init_time(Color::Black).map(millis),
            white_init_time_ms: self.init_time(Color::White).map(millis),
            last_move_time_ms: self.last_move_time().map(millis),
        }
    }
}
