//! Uploaded python bots, each running in its own worker process.
use std::fmt::{Debug, Formatter};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::ai::{Bot, BotFault, RawMove};
use crate::board::Color;
use crate::games::othello::OthelloBoard;
use crate::runtime::protocol::{Reply, Request};

/// The script every worker runs: it executes the bot source, finds the player class and then serves requests.
const HARNESS: &str = include_str!("harness.py");

/// Forcibly stops a worker process from any thread.
#[derive(Clone)]
pub struct KillSwitch {
    child: Arc<Mutex<Child>>,
}

impl KillSwitch {
    fn new(child: Child) -> Self {
        KillSwitch {
            child: Arc::new(Mutex::new(child)),
        }
    }

    /// Kill the process and reap it. Killing a process that already exited is not an error.
    pub fn fire(&self) {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = child.kill() {
            tracing::trace!("kill failed, process probably exited already: {}", e);
        }
        let _ = child.wait();
    }

    pub fn pid(&self) -> u32 {
        self.child.lock().unwrap_or_else(|e| e.into_inner()).id()
    }
}

impl Debug for KillSwitch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "KillSwitch {{ pid: {} }}", self.pid())
    }
}

/// A running worker process and its protocol pipes. The process is killed when this is dropped.
pub struct WorkerProcess {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    kill: KillSwitch,
}

impl WorkerProcess {
    /// Start `python` on the harness, which immediately starts executing the bot source at `path`.
    pub fn spawn(python: &str, path: &Path) -> std::io::Result<WorkerProcess> {
        let mut child = Command::new(python)
            .arg("-I")
            .arg("-u")
            .arg("-c")
            .arg(HARNESS)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "worker pipes were not captured",
                ));
            }
        };

        Ok(WorkerProcess {
            stdin,
            stdout: BufReader::new(stdout),
            kill: KillSwitch::new(child),
        })
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.kill.clone()
    }

    pub fn send(&mut self, request: Request) -> Result<(), BotFault> {
        writeln!(self.stdin, "{}", request)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| BotFault::Crashed(format!("could not send request to bot process: {}", e)))
    }

    /// Block until the next reply line, without the trailing newline.
    pub fn receive(&mut self) -> Result<String, BotFault> {
        let mut line = String::new();
        match self.stdout.read_line(&mut line) {
            Ok(0) => Err(BotFault::Crashed("bot process exited".to_owned())),
            Ok(_) => Ok(line.trim_end().to_owned()),
            Err(e) => Err(BotFault::Crashed(format!("could not read from bot process: {}", e))),
        }
    }
}

impl Debug for WorkerProcess {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "WorkerProcess {{ {:?} }}", self.kill)
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "{}", Request::Quit);
        self.kill.fire();
    }
}

/// A worker whose player class has been found but not constructed yet.
pub struct PythonWorker {
    class_name: String,
    process: WorkerProcess,
}

impl Debug for PythonWorker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PythonWorker {{ class_name: {:?}, {:?} }}", self.class_name, self.process)
    }
}

impl PythonWorker {
    pub fn new(class_name: String, process: WorkerProcess) -> Self {
        PythonWorker { class_name, process }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.process.kill_switch()
    }

    /// Construct the player instance inside the worker. Blocks until the worker answers.
    pub fn initialize(mut self, my_color: Color, opp_color: Color) -> Result<PythonBot, BotFault> {
        self.process.send(Request::Init { my_color, opp_color })?;

        let line = self.process.receive()?;
        match Reply::parse(&line) {
            Ok(Reply::Ready) => Ok(PythonBot {
                class_name: self.class_name,
                process: self.process,
            }),
            Ok(Reply::Error(message)) => Err(BotFault::Raised(message.to_owned())),
            _ => Err(BotFault::Crashed(format!("unexpected reply {:?}", line))),
        }
    }
}

/// An initialized player instance living in a worker process.
pub struct PythonBot {
    class_name: String,
    process: WorkerProcess,
}

impl Debug for PythonBot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PythonBot {{ class_name: {:?}, {:?} }}", self.class_name, self.process.kill)
    }
}

impl Bot for PythonBot {
    fn select_move(&mut self, board: &OthelloBoard) -> Result<RawMove, BotFault> {
        self.process.send(Request::Go(board))?;

        let line = self.process.receive()?;
        match Reply::parse(&line) {
            Ok(Reply::Move(row, col)) => Ok((row, col)),
            Ok(Reply::Invalid(repr)) => Err(BotFault::InvalidFormat(repr.to_owned())),
            Ok(Reply::Error(message)) => Err(BotFault::Raised(message.to_owned())),
            _ => Err(BotFault::Crashed(format!("unexpected reply {:?}", line))),
        }
    }

    fn kill_switch(&self) -> Option<KillSwitch> {
        Some(self.process.kill_switch())
    }
}
