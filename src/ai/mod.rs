use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::board::Color;
use crate::games::othello::OthelloBoard;
use crate::runtime::KillSwitch;

pub mod minimax;
pub mod simple;

/// A move as returned by a bot, before it is checked against the board.
/// Bots are untrusted, so this can be negative or off the board.
pub type RawMove = (i64, i64);

/// The ways a bot can fail to produce a move, without counting timeouts.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BotFault {
    /// The bot raised an error or panicked.
    #[error("raised an error: {0}")]
    Raised(String),
    /// The bot returned something that is not a pair of integers.
    #[error("returned an invalid move format: {0}")]
    InvalidFormat(String),
    /// The bot can no longer be reached, for example because its process died.
    #[error("crashed: {0}")]
    Crashed(String),
}

/// The capability every player program implements, whether it is built in or uploaded.
pub trait Bot: Debug + Send {
    /// Pick a move for the color this bot was constructed with.
    ///
    /// `self` is mutable to allow for random state and search caches.
    fn select_move(&mut self, board: &OthelloBoard) -> Result<RawMove, BotFault>;

    /// A handle that forcibly stops this bot from another thread.
    /// Bots that run inside this process cannot be stopped and return `None`.
    fn kill_switch(&self) -> Option<KillSwitch> {
        None
    }
}

/// Constructs in-process bots for a given color. Construction may fail, just like a python constructor can raise.
#[derive(Clone)]
pub struct BotFactory(Arc<dyn Fn(Color, Color) -> Result<Box<dyn Bot>, BotFault> + Send + Sync>);

impl BotFactory {
    pub fn new(f: impl Fn(Color, Color) -> Result<Box<dyn Bot>, BotFault> + Send + Sync + 'static) -> Self {
        BotFactory(Arc::new(f))
    }

    pub fn construct(&self, my_color: Color, opp_color: Color) -> Result<Box<dyn Bot>, BotFault> {
        (self.0)(my_color, opp_color)
    }
}

impl Debug for BotFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BotFactory")
    }
}

/// The bots that ship with the arena and are always available.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BuiltinBot {
    Random,
    Greedy,
    Minimax,
}

impl BuiltinBot {
    pub const ALL: [BuiltinBot; 3] = [BuiltinBot::Random, BuiltinBot::Greedy, BuiltinBot::Minimax];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinBot::Random => "random_player",
            BuiltinBot::Greedy => "greedy_player",
            BuiltinBot::Minimax => "minimax_player",
        }
    }

    pub fn from_name(name: &str) -> Option<BuiltinBot> {
        BuiltinBot::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// Construct a fresh instance playing `my_color`.
    pub fn construct(self, my_color: Color, opp_color: Color) -> Result<Box<dyn Bot>, BotFault> {
        if my_color.other() != opp_color {
            return Err(BotFault::Raised(format!(
                "colors must differ, got {} and {}",
                my_color, opp_color
            )));
        }
        let rng = SmallRng::from_entropy();

        Ok(match self {
            BuiltinBot::Random => Box::new(simple::RandomBot::new(my_color, rng)),
            BuiltinBot::Greedy => Box::new(simple::GreedyBot::new(my_color, rng)),
            BuiltinBot::Minimax => Box::new(minimax::MinimaxBot::new(my_color, minimax::DEFAULT_BUDGET, rng)),
        })
    }

    pub fn factory(self) -> BotFactory {
        BotFactory::new(move |my_color, opp_color| self.construct(my_color, opp_color))
    }
}
