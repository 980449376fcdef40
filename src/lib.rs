#![warn(missing_debug_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::new_without_default)]

//! An Othello platform where humans and uploaded third-party bots play against each other.
//!
//! # Features
//!
//! * The game itself: [OthelloBoard](crate::games::othello::OthelloBoard) on any size from 4 to 100,
//!     with legal move generation, flipping, game-over detection and
//!     [stable piece](crate::games::othello::stable) analysis.
//! * Static vetting of uploaded python bot source with [SourceVetter](crate::vetter::SourceVetter),
//!     before it is ever executed. Rejected uploads end up in the [Quarantine](crate::quarantine::Quarantine).
//! * A [BotRuntime](crate::runtime::BotRuntime) that runs every bot call under a soft and a hard deadline.
//!     Uploaded bots live in their own python worker process which is killed when the hard deadline passes.
//! * The per-match state machine [Match](crate::coordinator::Match) with pause support, where every
//!     bot failure is an immediate loss so a match always terminates.
//! * Builtin bots: [RandomBot](crate::ai::simple::RandomBot), [GreedyBot](crate::ai::simple::GreedyBot)
//!     and [MinimaxBot](crate::ai::minimax::MinimaxBot), an iterative deepening alpha-beta search.
//! * A bot vs bot series runner to compare playing strength, see [bot_game](crate::util::bot_game).
//!
//! # Examples
//!
//! ## List the legal moves on a board and play one.
//!
//! ```
//! # use othello_arena::board::{Color, Coord};
//! # use othello_arena::games::othello::OthelloBoard;
//! # use internal_iterator::InternalIterator;
//! let mut board = OthelloBoard::new(8).unwrap();
//! println!("{}", board);
//!
//! let moves: Vec<Coord> = board.legal_moves(Color::Black).collect();
//! assert_eq!(moves.len(), 4);
//!
//! let flips = board.play(moves[0], Color::Black).unwrap();
//! assert_eq!(flips.len(), 1);
//! assert_eq!(board.count_pieces(), (4, 1));
//! ```
//!
//! ## Vet some bot source
//!
//! ```
//! # use othello_arena::vetter::SourceVetter;
//! let report = SourceVetter::default().vet("import os\nos.system('ls')\n", "bot.py");
//! assert!(!report.is_valid());
//! for violation in &report.violations {
//!     println!("{}", violation);
//! }
//! ```

pub mod board;
pub mod wdl;

pub mod ai;

pub mod games;

pub mod coordinator;
pub mod runtime;
pub mod vetter;

pub mod config;
pub mod error;
pub mod quarantine;
pub mod registry;

pub mod util;
