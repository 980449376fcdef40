//! The per-match state machine, interleaving human and bot turns.
//!
//! A match is driven synchronously by a single caller: humans move with [Match::make_move], bots are asked
//! to move with [Match::make_bot_move]. Any bot failure is an immediate loss for that bot, so a match always
//! terminates and the opponent is never blocked.
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::board::{Color, Coord, Outcome};
use crate::config::MatchDefaults;
use crate::games::othello::{InvalidBoardSize, OthelloBoard, MAX_SIZE, MIN_SIZE};
use crate::registry::BotRegistry;
use crate::runtime::{BotInstance, BotRuntime, MoveInvocation, MAX_TIMEOUT};

pub use registry::MatchRegistry;
pub use snapshot::MatchSnapshot;

mod registry;
mod snapshot;

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MOVE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize)]
pub struct MatchId(pub u64);

impl Display for MatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "match-{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Bot(String),
}

impl PlayerKind {
    pub fn bot(name: impl Into<String>) -> Self {
        PlayerKind::Bot(name.into())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MatchConfig {
    pub board_size: usize,
    pub black: PlayerKind,
    pub white: PlayerKind,
    pub init_timeout: Duration,
    pub move_timeout: Duration,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InvalidMatchConfig {
    #[error(transparent)]
    BoardSize(#[from] InvalidBoardSize),
    #[error("{0} is played by a bot but no bot name was given")]
    EmptyBotName(Color),
    #[error("{0} timeout must be positive")]
    ZeroTimeout(&'static str),
    #[error("{0} timeout must not exceed {1:?}")]
    TimeoutTooLong(&'static str, Duration),
}

impl MatchConfig {
    pub fn new(board_size: usize, black: PlayerKind, white: PlayerKind) -> Self {
        MatchConfig {
            board_size,
            black,
            white,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            move_timeout: DEFAULT_MOVE_TIMEOUT,
        }
    }

    pub fn from_defaults(defaults: &MatchDefaults, black: PlayerKind, white: PlayerKind) -> Self {
        MatchConfig {
            board_size: defaults.default_board_size,
            black,
            white,
            init_timeout: defaults.init_timeout(),
            move_timeout: defaults.move_timeout(),
        }
    }

    pub fn with_timeouts(self, init_timeout: Duration, move_timeout: Duration) -> Self {
        MatchConfig {
            init_timeout,
            move_timeout,
            ..self
        }
    }

    pub fn player(&self, color: Color) -> &PlayerKind {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidMatchConfig> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.board_size) {
            return Err(InvalidBoardSize(self.board_size).into());
        }
        for color in Color::BOTH {
            if let PlayerKind::Bot(name) = self.player(color) {
                if name.trim().is_empty() {
                    return Err(InvalidMatchConfig::EmptyBotName(color));
                }
            }
        }
        if self.init_timeout.is_zero() {
            return Err(InvalidMatchConfig::ZeroTimeout("init"));
        }
        if self.move_timeout.is_zero() {
            return Err(InvalidMatchConfig::ZeroTimeout("move"));
        }
        if self.init_timeout > MAX_TIMEOUT {
            return Err(InvalidMatchConfig::TimeoutTooLong("init", MAX_TIMEOUT));
        }
        if self.move_timeout > MAX_TIMEOUT {
            return Err(InvalidMatchConfig::TimeoutTooLong("move", MAX_TIMEOUT));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MatchState {
    InProgress,
    Paused,
    Over,
}

/// Why a turn action was refused. A refused action never changes the match.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TurnError {
    #[error("Game is over")]
    GameOver,
    #[error("Game is paused")]
    Paused,
    #[error("No bot configured for current player")]
    NotBotTurn,
    #[error("{0} is played by a bot")]
    BotToMove(Color),
    #[error("Invalid move: ({row}, {col})")]
    IllegalMove { row: i64, col: i64 },
}

/// The result of a bot turn that was actually attempted.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BotTurn {
    Played {
        coord: Coord,
        flips: Vec<Coord>,
        elapsed: Duration,
    },
    /// The bot lost the match. A move that arrived too late but was legal is still `played` for display.
    Forfeited {
        reason: String,
        played: Option<(Coord, Vec<Coord>)>,
    },
}

#[derive(Debug)]
struct Side {
    label: String,
    bot: Option<BotInstance>,
    init_time: Option<Duration>,
}

#[derive(Debug)]
pub struct Match {
    id: MatchId,
    config: MatchConfig,
    runtime: BotRuntime,

    board: OthelloBoard,
    current: Color,
    sides: [Side; 2],

    outcome: Option<Outcome>,
    message: Option<String>,
    paused: bool,

    last_move: Option<Coord>,
    last_flips: Vec<Coord>,
    last_move_time: Option<Duration>,
    move_count: usize,
}

impl Match {
    /// Set up a new match and construct its bots, black first.
    ///
    /// Only an invalid `config` is an error. If a bot cannot be found, loaded or initialized the match
    /// is created already over, won by the opponent, and the remaining bots are not constructed.
    pub fn new(
        id: MatchId,
        config: MatchConfig,
        bots: &BotRegistry,
        runtime: &BotRuntime,
    ) -> Result<Match, InvalidMatchConfig> {
        config.validate()?;
        let board = OthelloBoard::new(config.board_size)?;

        let side = |color: Color| Side {
            label: match config.player(color) {
                PlayerKind::Human => "Human".to_owned(),
                PlayerKind::Bot(name) => name.clone(),
            },
            bot: None,
            init_time: None,
        };
        let sides = [side(Color::Black), side(Color::White)];

        let mut result = Match {
            id,
            config,
            runtime: runtime.clone(),
            board,
            current: Color::Black,
            sides,
            outcome: None,
            message: None,
            paused: false,
            last_move: None,
            last_flips: vec![],
            last_move_time: None,
            move_count: 0,
        };

        for color in Color::BOTH {
            let name = match result.config.player(color) {
                PlayerKind::Human => continue,
                PlayerKind::Bot(name) => name.clone(),
            };

            match result.setup_bot(color, &name, bots) {
                Ok((instance, elapsed)) => {
                    let side = &mut result.sides[color.index()];
                    side.bot = Some(instance);
                    side.init_time = Some(elapsed);
                }
                Err(message) => {
                    result.forfeit(color, message);
                    break;
                }
            }
        }

        tracing::info!(
            id = %result.id,
            size = result.config.board_size,
            black = %result.sides[0].label,
            white = %result.sides[1].label,
            over = result.is_over(),
            "created match"
        );
        Ok(result)
    }

    fn setup_bot(&self, color: Color, name: &str, bots: &BotRegistry) -> Result<(BotInstance, Duration), String> {
        let record = bots.get(name).ok_or_else(|| format!("Bot '{}' not found", name))?;
        let loaded = self
            .runtime
            .load(&record)
            .map_err(|e| format!("Bot '{}' failed to load: {}", name, e))?;
        self.runtime
            .initialize(loaded, color, color.other(), self.config.init_timeout)
            .map_err(|e| format!("Bot '{}' {}", name, e))
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn board(&self) -> &OthelloBoard {
        &self.board
    }

    pub fn current_player(&self) -> Color {
        self.current
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn state(&self) -> MatchState {
        if self.is_over() {
            MatchState::Over
        } else if self.paused {
            MatchState::Paused
        } else {
            MatchState::InProgress
        }
    }

    /// Whether the side to move is played by a bot.
    pub fn is_bot_turn(&self) -> bool {
        matches!(self.config.player(self.current), PlayerKind::Bot(_))
    }

    pub fn player_label(&self, color: Color) -> &str {
        &self.sides[color.index()].label
    }

    pub fn init_time(&self, color: Color) -> Option<Duration> {
        self.sides[color.index()].init_time
    }

    pub fn last_move(&self) -> Option<Coord> {
        self.last_move
    }

    pub fn last_flips(&self) -> &[Coord] {
        &self.last_flips
    }

    pub fn last_move_time(&self) -> Option<Duration> {
        self.last_move_time
    }

    pub fn move_count(&self) -> usize {
        self.move_count
    }

    /// Play a human move for the side to move. Pausing is left to the caller, human moves are
    /// accepted while paused.
    pub fn make_move(&mut self, row: i64, col: i64) -> Result<Vec<Coord>, TurnError> {
        if self.is_over() {
            return Err(TurnError::GameOver);
        }
        if self.is_bot_turn() {
            return Err(TurnError::BotToMove(self.current));
        }

        let (_, flips) = self.apply_move(row, col).ok_or(TurnError::IllegalMove { row, col })?;
        self.advance();
        Ok(flips)
    }

    /// Ask the bot of the side to move for a move and play it.
    ///
    /// Every bot failure ends the match and is reported as [BotTurn::Forfeited], not as an error.
    pub fn make_bot_move(&mut self) -> Result<BotTurn, TurnError> {
        if self.is_over() {
            return Err(TurnError::GameOver);
        }
        if self.paused {
            return Err(TurnError::Paused);
        }

        let color = self.current;
        let instance = self.sides[color.index()].bot.as_mut().ok_or(TurnError::NotBotTurn)?;
        let name = instance.name().to_owned();

        let invocation = self.runtime.invoke_move(instance, &self.board, self.config.move_timeout);
        self.last_move_time = invocation.elapsed();

        let turn = match invocation {
            MoveInvocation::OnTime { mv: (row, col), elapsed } => match self.apply_move(row, col) {
                Some((coord, flips)) => {
                    self.advance();
                    BotTurn::Played { coord, flips, elapsed }
                }
                None => {
                    let reason = format!("Bot '{}' made an invalid move ({}, {}) and lost", name, row, col);
                    self.forfeit(color, reason.clone());
                    BotTurn::Forfeited { reason, played: None }
                }
            },
            MoveInvocation::SoftTimeoutLoss {
                mv: (row, col),
                message,
                ..
            } => {
                let played = self.apply_move(row, col);
                let reason = format!("Bot '{}' {}", name, message);
                self.forfeit(color, reason.clone());
                BotTurn::Forfeited { reason, played }
            }
            MoveInvocation::HardTimeoutAbort { message }
            | MoveInvocation::RuntimeFault { message }
            | MoveInvocation::InvalidMoveFormat { message } => {
                let reason = format!("Bot '{}' {}", name, message);
                self.forfeit(color, reason.clone());
                BotTurn::Forfeited { reason, played: None }
            }
        };
        Ok(turn)
    }

    /// Flip the pause flag and return the new value. Finished matches stay as they are.
    pub fn toggle_pause(&mut self) -> bool {
        if !self.is_over() {
            self.paused = !self.paused;
            tracing::debug!(id = %self.id, paused = self.paused, "toggled pause");
        }
        self.paused
    }

    /// Play `(row, col)` for the side to move and record it, without advancing the turn.
    fn apply_move(&mut self, row: i64, col: i64) -> Option<(Coord, Vec<Coord>)> {
        let coord = self.board.coord(row, col)?;
        let flips = self.board.play(coord, self.current).ok()?;

        self.last_move = Some(coord);
        self.last_flips = flips.clone();
        self.move_count += 1;
        Some((coord, flips))
    }

    /// Hand the turn to the opponent if they can move, otherwise the mover goes again.
    fn advance(&mut self) {
        if let Some(outcome) = self.board.outcome() {
            self.finish(outcome, outcome.message().to_owned());
            return;
        }

        match self.board.next_to_move(self.current) {
            Some(next) if next != self.current => self.current = next,
            _ => tracing::debug!(id = %self.id, passed = %self.current.other(), "no legal moves, turn passes back"),
        }
    }

    fn forfeit(&mut self, loser: Color, message: String) {
        tracing::info!(id = %self.id, loser = %loser, reason = %message, "bot forfeited");
        self.finish(Outcome::WonBy(loser.other()), message);
    }

    fn finish(&mut self, outcome: Outcome, message: String) {
        self.outcome = Some(outcome);
        self.message = Some(message);

        // stop the worker processes now instead of when the match is evicted
        for side in &mut self.sides {
            side.bot = None;
        }

        let (black, white) = self.board.count_pieces();
        tracing::info!(
            id = %self.id,
            winner = ?outcome.winner(),
            black,
            white,
            message = self.message.as_deref().unwrap_or(""),
            "match over"
        );
    }
}
