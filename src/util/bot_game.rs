//! Utilities to run bots against each other and report the results.
use std::fmt::{Debug, Formatter};

use crate::board::{Color, Coord, Outcome};
use crate::coordinator::{BotTurn, InvalidMatchConfig, Match, MatchConfig, MatchId, PlayerKind, TurnError};
use crate::registry::BotRegistry;
use crate::runtime::BotRuntime;
use crate::wdl::WDL;

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("invalid match config: {0}")]
    Config(#[from] InvalidMatchConfig),
    #[error("match {id} stalled: {error}")]
    Turn { id: MatchId, error: TurnError },
}

/// Run `bot_l` against `bot_r` for `game_count` games, alternating colors, with `bot_l` playing black first.
///
/// `config` builds the match configuration from the black and white players, which is where the board size
/// and timeouts come from. `callback` is called after every game with the running score from the POV of `bot_l`.
pub fn run(
    bots: &BotRegistry,
    runtime: &BotRuntime,
    bot_l: &str,
    bot_r: &str,
    game_count: u32,
    config: impl Fn(PlayerKind, PlayerKind) -> MatchConfig,
    mut callback: impl FnMut(WDL<u32>, &Replay),
) -> Result<BotGameResult, SeriesError> {
    let mut partial_wdl = WDL::<u32>::default();
    let mut replays = vec![];

    for game_i in 0..game_count {
        let player_l = if game_i % 2 == 0 { Color::Black } else { Color::White };
        let (black, white) = match player_l {
            Color::Black => (bot_l, bot_r),
            Color::White => (bot_r, bot_l),
        };

        let config = config(PlayerKind::bot(black), PlayerKind::bot(white));
        let game = Match::new(MatchId(game_i as u64), config, bots, runtime)?;
        let replay = play_single_game(game, player_l)?;

        partial_wdl += replay.outcome.pov(replay.player_l).to_wdl();
        callback(partial_wdl, &replay);
        replays.push(replay);
    }

    let total_time_l = replays.iter().map(|r| r.total_time_l).sum::<f32>();
    let total_time_r = replays.iter().map(|r| r.total_time_r).sum::<f32>();
    let move_count_l = replays.iter().map(|r| r.move_count_l).sum::<u32>();
    let move_count_r = replays.iter().map(|r| r.move_count_r).sum::<u32>();

    Ok(BotGameResult {
        game_count,
        average_game_length: replays.iter().map(|r| r.moves.len() as f32).sum::<f32>() / game_count.max(1) as f32,
        wdl_l: partial_wdl,
        forfeits: replays.iter().filter(|r| r.forfeit.is_some()).count() as u32,
        time_l: total_time_l / move_count_l.max(1) as f32,
        time_r: total_time_r / move_count_r.max(1) as f32,
        name_l: bot_l.to_owned(),
        name_r: bot_r.to_owned(),
        replays,
    })
}

fn play_single_game(mut game: Match, player_l: Color) -> Result<Replay, SeriesError> {
    let mut total_time_l = 0.0;
    let mut total_time_r = 0.0;
    let mut move_count_l: u32 = 0;
    let mut move_count_r: u32 = 0;
    let mut moves = vec![];
    let mut forfeit = None;

    let outcome = loop {
        if let Some(outcome) = game.outcome() {
            break outcome;
        }

        let id = game.id();
        let mover = game.current_player();
        let turn = game.make_bot_move().map_err(|error| SeriesError::Turn { id, error })?;
        let time = game.last_move_time().map_or(0.0, |t| t.as_secs_f32());
        if mover == player_l {
            total_time_l += time;
            move_count_l += 1;
        } else {
            total_time_r += time;
            move_count_r += 1;
        }

        match turn {
            BotTurn::Played { coord, .. } => moves.push(coord),
            BotTurn::Forfeited { reason, played } => {
                moves.extend(played.map(|(coord, _)| coord));
                forfeit = Some(reason);
            }
        }
    };

    // a bot that failed during construction never got to move
    if forfeit.is_none() && moves.is_empty() {
        forfeit = game.message().map(str::to_owned);
    }

    Ok(Replay {
        id: game.id(),
        player_l,
        moves,
        outcome,
        forfeit,
        total_time_l,
        total_time_r,
        move_count_l,
        move_count_r,
    })
}

#[derive(Debug, Clone)]
pub struct Replay {
    pub id: MatchId,
    pub player_l: Color,

    pub moves: Vec<Coord>,
    pub outcome: Outcome,
    /// Set if the game ended because a bot failed rather than by the rules.
    pub forfeit: Option<String>,

    pub total_time_l: f32,
    pub total_time_r: f32,
    pub move_count_l: u32,
    pub move_count_r: u32,
}

/// Structure returned by the function [`run`].
pub struct BotGameResult {
    pub game_count: u32,
    pub replays: Vec<Replay>,

    pub average_game_length: f32,
    pub wdl_l: WDL<u32>,
    pub forfeits: u32,

    //time per move in seconds
    pub time_l: f32,
    pub time_r: f32,

    pub name_l: String,
    pub name_r: String,
}

impl Debug for BotGameResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BotGameResult {{")?;
        writeln!(
            f,
            "  {} games, average length {}, {} forfeits",
            self.game_count, self.average_game_length, self.forfeits
        )?;
        writeln!(f, "  left      {:?}", self.wdl_l,)?;
        writeln!(f, "  left      {:.3?}", self.wdl_l.fractions())?;
        writeln!(f, "  left elo: {:.1}", elo_from_wdl(self.wdl_l.fractions()))?;
        writeln!(f, "  time_l:   {:.4}, time_r: {:.4}", self.time_l, self.time_r)?;
        writeln!(f, "  left:     {}", self.name_l)?;
        writeln!(f, "  right:    {}", self.name_r)?;
        writeln!(f, "}}")?;

        Ok(())
    }
}

/// WDL doesn't have to be normalized yet. Without any games the difference is zero.
pub fn elo_from_wdl(wdl: WDL<f32>) -> f32 {
    if wdl.sum() == 0.0 {
        return 0.0;
    }

    let score = (wdl.value() / wdl.sum() + 1.0) / 2.0;
    let elo = -400.0 * (1.0 / score - 1.0).log10();

    // fix annoying negative zero case
    elo + 0.0
}
