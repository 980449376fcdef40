//! Loading bots and calling into them under a time budget.
//!
//! Builtin bots run on a thread inside this process. Uploaded python bots run in a separate worker process
//! per bot instance, talking the [protocol] over pipes. Every call into a bot goes through [timed::run_timed],
//! so an uncooperative bot can never block the caller for longer than the hard deadline.
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::{Bot, BotFactory, BotFault, RawMove};
use crate::board::Color;
use crate::config::RuntimeConfig;
use crate::games::othello::OthelloBoard;
use crate::registry::{BotRecord, BotSource};
use crate::runtime::protocol::Reply;
use crate::runtime::python::{PythonWorker, WorkerProcess};
use crate::runtime::timed::{run_timed, Timed};

pub use python::KillSwitch;

pub mod protocol;
pub mod python;
pub mod timed;

/// A move call is abandoned once it runs this many times longer than the soft timeout.
pub const HARD_TIMEOUT_FACTOR: u32 = 4;

/// The longest timeout a match or configuration may ask for.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("bot source {0} not found")]
    NotFound(PathBuf),
    #[error("failed to start python interpreter '{python}': {source}")]
    Spawn {
        python: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load bot source: {0}")]
    Compile(String),
    #[error("No valid player class found, the bot must define exactly one class with a select_move method")]
    NoPlayerClass,
    #[error("found multiple player classes ({}), the bot must define exactly one", .0.join(", "))]
    AmbiguousPlayerClass(Vec<String>),
    #[error("loading took longer than {:.3}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("unexpected reply from bot process: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InitError {
    #[error("exceeded the initialization time limit of {:.3}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("failed to initialize: {0}")]
    Failed(String),
}

/// The result of a single [BotRuntime::invoke_move] call.
///
/// Messages are phrased to follow the bot name, eg. `"Bot 'x' " + message`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MoveInvocation {
    /// A well-formed move within the soft timeout. It has not been checked against the rules yet.
    OnTime { mv: RawMove, elapsed: Duration },
    /// A well-formed move that arrived after the soft timeout but before the hard one.
    /// The bot loses, the move is only kept for display.
    SoftTimeoutLoss {
        mv: RawMove,
        elapsed: Duration,
        message: String,
    },
    /// No answer before the hard timeout, the call was abandoned.
    HardTimeoutAbort { message: String },
    /// The bot raised an error, panicked or crashed.
    RuntimeFault { message: String },
    /// The bot returned something that is not a pair of integers.
    InvalidMoveFormat { message: String },
}

impl MoveInvocation {
    pub fn mv(&self) -> Option<RawMove> {
        match *self {
            MoveInvocation::OnTime { mv, .. } | MoveInvocation::SoftTimeoutLoss { mv, .. } => Some(mv),
            _ => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match *self {
            MoveInvocation::OnTime { elapsed, .. } | MoveInvocation::SoftTimeoutLoss { elapsed, .. } => Some(elapsed),
            _ => None,
        }
    }

    /// The error message, `None` only for [MoveInvocation::OnTime].
    pub fn error(&self) -> Option<&str> {
        match self {
            MoveInvocation::OnTime { .. } => None,
            MoveInvocation::SoftTimeoutLoss { message, .. }
            | MoveInvocation::HardTimeoutAbort { message }
            | MoveInvocation::RuntimeFault { message }
            | MoveInvocation::InvalidMoveFormat { message } => Some(message),
        }
    }

    fn from_fault(fault: BotFault) -> MoveInvocation {
        let message = fault.to_string();
        match fault {
            BotFault::InvalidFormat(_) => MoveInvocation::InvalidMoveFormat { message },
            BotFault::Raised(_) | BotFault::Crashed(_) => MoveInvocation::RuntimeFault { message },
        }
    }
}

/// A bot that has been located and loaded, but not yet constructed for a color.
pub enum LoadedBot {
    Native { name: String, factory: BotFactory },
    Python { name: String, worker: PythonWorker },
}

impl LoadedBot {
    pub fn name(&self) -> &str {
        match self {
            LoadedBot::Native { name, .. } | LoadedBot::Python { name, .. } => name,
        }
    }
}

impl Debug for LoadedBot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadedBot::Native { name, .. } => write!(f, "LoadedBot::Native({:?})", name),
            LoadedBot::Python { name, worker } => write!(f, "LoadedBot::Python({:?}, {:?})", name, worker),
        }
    }
}

/// A constructed bot, ready to be asked for moves.
/// After a call has been abandoned the bot is gone and every later call is a runtime fault.
#[derive(Debug)]
pub struct BotInstance {
    name: String,
    bot: Option<Box<dyn Bot>>,
}

impl BotInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_alive(&self) -> bool {
        self.bot.is_some()
    }
}

/// Loads bots and calls them under time budgets. This is a cheap, cloneable service.
#[derive(Debug, Clone)]
pub struct BotRuntime {
    python: String,
    load_timeout: Duration,
}

impl BotRuntime {
    pub fn new(python: impl Into<String>, load_timeout: Duration) -> Self {
        BotRuntime {
            python: python.into(),
            load_timeout,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.python.clone(), Duration::from_millis(config.load_timeout_ms))
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    /// Load the bot described by `record`. Uploaded bots are executed fresh in a new worker process on every call,
    /// which must report exactly one class with a `select_move` method.
    pub fn load(&self, record: &BotRecord) -> Result<LoadedBot, LoadError> {
        let name = record.name.clone();

        let path = match &record.source {
            BotSource::Builtin(factory) => {
                return Ok(LoadedBot::Native {
                    name,
                    factory: factory.clone(),
                })
            }
            BotSource::Uploaded(path) => path,
        };

        if !path.is_file() {
            return Err(LoadError::NotFound(path.clone()));
        }

        let process = WorkerProcess::spawn(&self.python, path).map_err(|source| LoadError::Spawn {
            python: self.python.clone(),
            source,
        })?;
        let kill = process.kill_switch();

        let timed = run_timed(&name, self.load_timeout, self.load_timeout, Some(kill), move || {
            let mut process = process;
            let line = process.receive();
            (process, line)
        });

        let (process, line) = match timed {
            Timed::OnTime { value, .. } | Timed::Late { value, .. } => value,
            Timed::Abandoned => return Err(LoadError::Timeout(self.load_timeout)),
            Timed::Failed(message) => return Err(LoadError::Protocol(message)),
        };
        let line = line.map_err(|fault| LoadError::Protocol(fault.to_string()))?;

        let class_name = match Reply::parse(&line) {
            Ok(Reply::Loaded(class_name)) => class_name.to_owned(),
            Ok(Reply::NoClass) => return Err(LoadError::NoPlayerClass),
            Ok(Reply::Ambiguous(names)) => {
                return Err(LoadError::AmbiguousPlayerClass(
                    names.iter().map(|s| s.to_string()).collect(),
                ))
            }
            Ok(Reply::LoadError(message)) => return Err(LoadError::Compile(message.to_owned())),
            _ => return Err(LoadError::Protocol(line)),
        };

        tracing::debug!(bot = %name, class = %class_name, "loaded python bot");
        Ok(LoadedBot::Python {
            name,
            worker: PythonWorker::new(class_name, process),
        })
    }

    /// Construct an instance of `loaded` playing `my_color`, under a wall-clock budget of `timeout`.
    /// On success also returns how long construction took.
    pub fn initialize(
        &self,
        loaded: LoadedBot,
        my_color: Color,
        opp_color: Color,
        timeout: Duration,
    ) -> Result<(BotInstance, Duration), InitError> {
        let name = loaded.name().to_owned();

        let timed = match loaded {
            LoadedBot::Native { factory, .. } => {
                run_timed(&name, timeout, timeout, None, move || factory.construct(my_color, opp_color))
            }
            LoadedBot::Python { worker, .. } => {
                let kill = worker.kill_switch();
                run_timed(&name, timeout, timeout, Some(kill), move || {
                    worker
                        .initialize(my_color, opp_color)
                        .map(|bot| Box::new(bot) as Box<dyn Bot>)
                })
            }
        };

        let result = match timed {
            Timed::OnTime { value, elapsed } => value.map(|bot| (bot, elapsed)),
            Timed::Late { .. } | Timed::Abandoned => {
                tracing::info!(bot = %name, timeout_ms = timeout.as_millis() as u64, "initialization timed out");
                return Err(InitError::Timeout(timeout));
            }
            Timed::Failed(message) => Err(BotFault::Raised(message)),
        };

        match result {
            Ok((bot, elapsed)) => {
                tracing::debug!(bot = %name, elapsed_ms = elapsed.as_millis() as u64, "initialized bot");
                Ok((BotInstance { name, bot: Some(bot) }, elapsed))
            }
            Err(fault) => {
                let message = fault_message(fault);
                tracing::info!(bot = %name, error = %message, "initialization failed");
                Err(InitError::Failed(message))
            }
        }
    }

    /// Ask `instance` for a move on `board`. The call is classified against `soft` and a hard ceiling of
    /// [HARD_TIMEOUT_FACTOR] times `soft`. The returned move has not been checked against the rules.
    pub fn invoke_move(&self, instance: &mut BotInstance, board: &OthelloBoard, soft: Duration) -> MoveInvocation {
        let hard = soft.saturating_mul(HARD_TIMEOUT_FACTOR);

        let mut bot = match instance.bot.take() {
            Some(bot) => bot,
            None => {
                return MoveInvocation::RuntimeFault {
                    message: "is no longer running after an abandoned call".to_owned(),
                }
            }
        };

        let kill = bot.kill_switch();
        let board = board.clone();
        let timed = run_timed(&instance.name, soft, hard, kill, move || {
            let result = bot.select_move(&board);
            (bot, result)
        });

        let invocation = match timed {
            Timed::OnTime {
                value: (bot, result),
                elapsed,
            } => {
                instance.bot = Some(bot);
                match result {
                    Ok(mv) => MoveInvocation::OnTime { mv, elapsed },
                    Err(fault) => MoveInvocation::from_fault(fault),
                }
            }
            Timed::Late {
                value: (bot, result),
                elapsed,
            } => {
                instance.bot = Some(bot);
                match result {
                    Ok(mv) => MoveInvocation::SoftTimeoutLoss {
                        mv,
                        elapsed,
                        message: format!(
                            "lost: exceeded the time limit of {:.3}s (took {:.3}s)",
                            soft.as_secs_f64(),
                            elapsed.as_secs_f64()
                        ),
                    },
                    Err(fault) => MoveInvocation::from_fault(fault),
                }
            }
            Timed::Abandoned => MoveInvocation::HardTimeoutAbort {
                message: format!(
                    "exceeded the maximum time limit of {:.3}s and was aborted",
                    hard.as_secs_f64()
                ),
            },
            Timed::Failed(message) => MoveInvocation::RuntimeFault {
                message: BotFault::Raised(message).to_string(),
            },
        };

        match &invocation {
            MoveInvocation::OnTime { mv, elapsed } => {
                tracing::debug!(bot = %instance.name, ?mv, elapsed_ms = elapsed.as_millis() as u64, "bot moved")
            }
            other => tracing::info!(bot = %instance.name, error = other.error(), "bot move failed"),
        }

        invocation
    }
}

fn fault_message(fault: BotFault) -> String {
    match fault {
        BotFault::Raised(message) | BotFault::InvalidFormat(message) | BotFault::Crashed(message) => message,
    }
}
