use std::time::Duration;

use internal_iterator::InternalIterator;

use othello_arena::ai::{Bot, BotFactory, BotFault, RawMove};
use othello_arena::board::{Color, Coord, Outcome};
use othello_arena::coordinator::{
    BotTurn, InvalidMatchConfig, Match, MatchConfig, MatchId, MatchRegistry, MatchState, PlayerKind, TurnError,
};
use othello_arena::games::othello::{InvalidBoardSize, OthelloBoard};
use othello_arena::registry::BotRegistry;
use othello_arena::runtime::{BotRuntime, MAX_TIMEOUT};
use othello_arena::util::bot_game;

/// Plays the first legal move after sleeping for `delay`, or always plays `fixed` if set.
#[derive(Debug)]
struct TestBot {
    color: Color,
    delay: Duration,
    fixed: Option<RawMove>,
}

impl Bot for TestBot {
    fn select_move(&mut self, board: &OthelloBoard) -> Result<RawMove, BotFault> {
        std::thread::sleep(self.delay);
        if let Some(mv) = self.fixed {
            return Ok(mv);
        }
        let moves: Vec<Coord> = board.legal_moves(self.color).collect();
        let mv = moves.first().ok_or_else(|| BotFault::Raised("no moves".to_owned()))?;
        Ok((mv.row as i64, mv.col as i64))
    }
}

fn test_bot(delay: Duration, fixed: Option<RawMove>) -> BotFactory {
    BotFactory::new(move |color, _| {
        Ok(Box::new(TestBot {
            color,
            delay,
            fixed,
        }) as Box<dyn Bot>)
    })
}

struct Setup {
    _dir: tempfile::TempDir,
    bots: BotRegistry,
    runtime: BotRuntime,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let mut bots = BotRegistry::open(dir.path()).unwrap();

    bots.add_builtin("first", test_bot(Duration::ZERO, None)).unwrap();
    bots.add_builtin("corner", test_bot(Duration::ZERO, Some((0, 0)))).unwrap();
    bots.add_builtin("offboard", test_bot(Duration::ZERO, Some((-3, 99)))).unwrap();
    bots.add_builtin("slow", test_bot(Duration::from_millis(200), None)).unwrap();
    bots.add_builtin("stuck", test_bot(Duration::from_secs(3), None)).unwrap();
    bots.add_builtin(
        "grumpy",
        BotFactory::new(|_, _| Err(BotFault::Raised("refusing to play".to_owned()))),
    )
    .unwrap();

    Setup {
        _dir: dir,
        bots,
        runtime: BotRuntime::new("python3", Duration::from_secs(10)),
    }
}

impl Setup {
    fn create(&self, size: usize, black: PlayerKind, white: PlayerKind) -> Match {
        let config =
            MatchConfig::new(size, black, white).with_timeouts(Duration::from_secs(1), Duration::from_millis(100));
        Match::new(MatchId(0), config, &self.bots, &self.runtime).unwrap()
    }
}

fn human() -> PlayerKind {
    PlayerKind::Human
}

fn bot(name: &str) -> PlayerKind {
    PlayerKind::bot(name)
}

#[test]
fn human_game_start() {
    let s = setup();
    let mut game = s.create(8, human(), human());

    assert_eq!(game.state(), MatchState::InProgress);
    assert_eq!(game.current_player(), Color::Black);
    assert!(!game.is_bot_turn());

    let snapshot = game.snapshot();
    assert_eq!(snapshot.valid_moves, vec![[2, 3], [3, 2], [4, 5], [5, 4]]);
    assert_eq!((snapshot.black_count, snapshot.white_count), (2, 2));
    assert_eq!(snapshot.current_player, 0);
    assert_eq!(snapshot.board[3][3], 1);
    assert_eq!(snapshot.board[0][0], -1);
    assert_eq!(snapshot.black_player, "Human");
    assert_eq!(snapshot.winner, None);
    assert!(!snapshot.game_over);

    let flips = game.make_move(2, 3).unwrap();
    assert_eq!(flips, vec![Coord::new(3, 3)]);
    assert_eq!(game.current_player(), Color::White);
    assert_eq!(game.last_move(), Some(Coord::new(2, 3)));
    assert_eq!(game.board().count_pieces(), (4, 1));
    assert_eq!(game.move_count(), 1);

    let snapshot = game.snapshot();
    assert_eq!(snapshot.last_move, Some([2, 3]));
    assert_eq!(snapshot.last_flips, vec![[3, 3]]);
    assert_eq!(snapshot.current_player, 1);
}

#[test]
fn pass_keeps_the_turn() {
    let s = setup();
    let mut game = s.create(4, human(), human());

    for (row, col) in [(0, 1), (0, 2), (2, 3)] {
        game.make_move(row, col).unwrap();
    }
    assert_eq!(game.current_player(), Color::White);

    // after this black has nothing to flip and has to pass
    game.make_move(0, 0).unwrap();
    assert!(!game.board().has_legal_move(Color::Black));
    assert_eq!(game.current_player(), Color::White);
    assert_eq!(game.state(), MatchState::InProgress);
    assert_eq!(game.outcome(), None);
    assert_eq!(game.board().count_pieces(), (5, 3));

    let snapshot = game.snapshot();
    assert_eq!(snapshot.current_player, 1);
    assert_eq!(snapshot.valid_moves, vec![[2, 0], [3, 1], [3, 2], [3, 3]]);
    assert!(!snapshot.game_over);

    // white moves again, which gives black a move back
    game.make_move(2, 0).unwrap();
    assert_eq!(game.current_player(), Color::Black);
    assert_eq!(game.board().count_pieces(), (4, 5));
    assert_eq!(game.snapshot().valid_moves, vec![[1, 0]]);
}

#[test]
fn illegal_human_moves_change_nothing() {
    let s = setup();
    let mut game = s.create(8, human(), human());
    let before = game.snapshot();

    assert_eq!(game.make_move(0, 0), Err(TurnError::IllegalMove { row: 0, col: 0 }));
    assert_eq!(game.make_move(-1, 4), Err(TurnError::IllegalMove { row: -1, col: 4 }));
    assert_eq!(game.make_move(3, 3).unwrap_err().to_string(), "Invalid move: (3, 3)");
    assert_eq!(game.make_bot_move(), Err(TurnError::NotBotTurn));

    assert_eq!(game.snapshot(), before);
}

#[test]
fn pause() {
    let s = setup();
    let mut game = s.create(8, human(), bot("first"));

    assert!(game.toggle_pause());
    assert_eq!(game.state(), MatchState::Paused);
    assert!(game.snapshot().paused);

    // humans can still move while paused, bots cannot
    game.make_move(2, 3).unwrap();
    assert!(game.is_bot_turn());
    assert_eq!(game.make_bot_move(), Err(TurnError::Paused));
    assert_eq!(game.make_move(2, 2), Err(TurnError::BotToMove(Color::White)));

    assert!(!game.toggle_pause());
    assert_eq!(game.state(), MatchState::InProgress);
    assert!(matches!(game.make_bot_move(), Ok(BotTurn::Played { .. })));
    assert_eq!(game.current_player(), Color::Black);
}

#[test]
fn human_against_bot() {
    let s = setup();
    let mut game = s.create(6, bot("first"), human());
    assert!(game.init_time(Color::Black).is_some());
    assert_eq!(game.init_time(Color::White), None);

    while !game.is_over() {
        if game.is_bot_turn() {
            match game.make_bot_move().unwrap() {
                BotTurn::Played { coord, flips, .. } => {
                    assert!(!flips.is_empty());
                    assert_eq!(game.last_move(), Some(coord));
                    assert!(game.last_move_time().is_some());
                }
                other => panic!("unexpected {:?}", other),
            }
        } else {
            let color = game.current_player();
            let moves: Vec<Coord> = game.board().legal_moves(color).collect();
            let mv = moves.last().unwrap();
            game.make_move(mv.row as i64, mv.col as i64).unwrap();
        }
    }

    let outcome = game.outcome().unwrap();
    assert_eq!(outcome, game.board().outcome_by_count());
    assert_eq!(game.message(), Some(outcome.message()));
    assert_eq!(game.make_move(0, 0), Err(TurnError::GameOver));
    assert_eq!(game.make_bot_move(), Err(TurnError::GameOver));
}

#[test]
fn builtin_bots_finish() {
    let s = setup();

    for (black, white, size) in [
        ("random_player", "greedy_player", 8),
        ("greedy_player", "random_player", 7),
        ("minimax_player", "random_player", 4),
    ] {
        let config = MatchConfig::new(size, bot(black), bot(white));
        let mut game = Match::new(MatchId(1), config, &s.bots, &s.runtime).unwrap();

        while !game.is_over() {
            match game.make_bot_move().unwrap() {
                BotTurn::Played { .. } => {}
                BotTurn::Forfeited { reason, .. } => panic!("forfeited: {}", reason),
            }
        }

        let snapshot = game.snapshot();
        assert!(snapshot.game_over);
        assert!(snapshot.valid_moves.is_empty());
        assert_eq!(snapshot.winner, Some(game.board().outcome_by_count().to_wire()));
        assert!(snapshot.message.is_some());
    }
}

#[test]
fn invalid_bot_move_loses() {
    let s = setup();

    for name in ["corner", "offboard"] {
        let mut game = s.create(8, human(), bot(name));
        game.make_move(2, 3).unwrap();

        match game.make_bot_move().unwrap() {
            BotTurn::Forfeited { reason, played } => {
                assert!(reason.starts_with(&format!("Bot '{}' made an invalid move", name)), "{}", reason);
                assert!(reason.ends_with("and lost"), "{}", reason);
                assert_eq!(played, None);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(game.outcome(), Some(Outcome::WonBy(Color::Black)));
        assert_eq!(game.board().count_pieces(), (4, 1));
        assert_eq!(game.make_move(2, 2), Err(TurnError::GameOver));
    }
}

#[test]
fn slow_bot_move_is_shown_but_loses() {
    let s = setup();
    let mut game = s.create(8, bot("slow"), human());

    match game.make_bot_move().unwrap() {
        BotTurn::Forfeited { reason, played } => {
            assert!(reason.starts_with("Bot 'slow' lost"), "{}", reason);
            assert!(reason.contains("time limit"), "{}", reason);
            assert_eq!(played, Some((Coord::new(2, 3), vec![Coord::new(3, 3)])));
        }
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(game.outcome(), Some(Outcome::WonBy(Color::White)));
    assert_eq!(game.last_move(), Some(Coord::new(2, 3)));
    assert_eq!(game.board().count_pieces(), (4, 1));
    assert!(game.last_move_time().unwrap() > Duration::from_millis(100));
}

#[test]
fn stuck_bot_is_aborted() {
    let s = setup();
    let mut game = s.create(8, human(), bot("stuck"));
    game.make_move(2, 3).unwrap();

    match game.make_bot_move().unwrap() {
        BotTurn::Forfeited { reason, played } => {
            assert!(reason.contains("maximum time limit"), "{}", reason);
            assert_eq!(played, None);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(game.outcome(), Some(Outcome::WonBy(Color::Black)));
    assert_eq!(game.last_move_time(), None);
}

#[test]
fn setup_failures_end_the_match() {
    let s = setup();

    let game = s.create(8, bot("nobody"), bot("first"));
    assert!(game.is_over());
    assert_eq!(game.outcome(), Some(Outcome::WonBy(Color::White)));
    assert_eq!(game.message(), Some("Bot 'nobody' not found"));
    // white is never constructed once black failed
    assert_eq!(game.init_time(Color::White), None);

    let mut game = s.create(8, human(), bot("grumpy"));
    assert_eq!(game.outcome(), Some(Outcome::WonBy(Color::Black)));
    assert_eq!(game.message(), Some("Bot 'grumpy' failed to initialize: refusing to play"));
    assert!(!game.toggle_pause());
    assert_eq!(game.state(), MatchState::Over);

    let snapshot = game.snapshot();
    assert!(snapshot.game_over);
    assert_eq!(snapshot.winner, Some(0));
    assert!(snapshot.valid_moves.is_empty());
    assert_eq!(snapshot.white_player, "grumpy");
}

#[test]
fn invalid_configs() {
    let s = setup();
    let create = |config: MatchConfig| Match::new(MatchId(0), config, &s.bots, &s.runtime).map(|_| ());

    assert_eq!(
        create(MatchConfig::new(3, human(), human())),
        Err(InvalidMatchConfig::BoardSize(InvalidBoardSize(3)))
    );
    assert_eq!(
        create(MatchConfig::new(8, bot(" "), human())),
        Err(InvalidMatchConfig::EmptyBotName(Color::Black))
    );
    assert_eq!(
        create(MatchConfig::new(8, human(), human()).with_timeouts(Duration::from_secs(1), Duration::ZERO)),
        Err(InvalidMatchConfig::ZeroTimeout("move"))
    );
    assert_eq!(
        create(MatchConfig::new(8, human(), human()).with_timeouts(Duration::from_secs(1), Duration::MAX)),
        Err(InvalidMatchConfig::TimeoutTooLong("move", MAX_TIMEOUT))
    );
}

#[test]
fn registry_hands_out_ids() {
    let s = setup();
    let mut matches = MatchRegistry::new();

    let first = matches
        .create(MatchConfig::new(8, human(), human()), &s.bots, &s.runtime)
        .unwrap()
        .id();
    let second = matches
        .create(MatchConfig::new(8, human(), bot("nobody")), &s.bots, &s.runtime)
        .unwrap()
        .id();
    assert!(matches.create(MatchConfig::new(2, human(), human()), &s.bots, &s.runtime).is_err());

    assert_eq!((first, second), (MatchId(0), MatchId(1)));
    assert_eq!(second.to_string(), "match-1");
    assert_eq!(matches.len(), 2);

    assert_eq!(matches.evict_finished(), 1);
    assert_eq!(matches.ids().collect::<Vec<_>>(), vec![first]);
    assert!(matches.get(second).is_none());

    matches.get_mut(first).unwrap().make_move(2, 3).unwrap();
    assert_eq!(matches.get(first).unwrap().move_count(), 1);
    assert!(matches.remove(first).is_some());
    assert!(matches.is_empty());
}

#[test]
fn snapshot_json() {
    let s = setup();
    let game = s.create(4, human(), bot("first"));
    let json = serde_json::to_value(game.snapshot()).unwrap();

    assert_eq!(json["board"][1][1], 1);
    assert_eq!(json["valid_moves"].as_array().unwrap().len(), 4);
    assert_eq!(json["white_player"], "first");
    assert_eq!(json["game_over"], false);
    assert!(json["white_init_time_ms"].is_u64());
    assert!(json["black_init_time_ms"].is_null());
}

#[test]
fn series_alternates_colors() {
    let s = setup();
    let mut seen = 0;

    let result = bot_game::run(
        &s.bots,
        &s.runtime,
        "greedy_player",
        "random_player",
        4,
        |black, white| MatchConfig::new(6, black, white),
        |wdl, replay| {
            seen += 1;
            assert_eq!(wdl.sum(), seen);
            assert_eq!(replay.player_l, if seen % 2 == 1 { Color::Black } else { Color::White });
        },
    )
    .unwrap();

    assert_eq!(result.game_count, 4);
    assert_eq!(result.wdl_l.sum(), 4);
    assert_eq!(result.forfeits, 0);
    assert_eq!(result.replays.len(), 4);
    println!("{:?}", result);
}

#[test]
fn series_counts_forfeits() {
    let s = setup();
    let result = bot_game::run(
        &s.bots,
        &s.runtime,
        "first",
        "corner",
        2,
        |black, white| MatchConfig::new(8, black, white),
        |_, _| {},
    )
    .unwrap();

    assert_eq!(result.forfeits, 2);
    assert_eq!(result.wdl_l.win, 2);
}
