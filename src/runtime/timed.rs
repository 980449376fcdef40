//! Run a closure on a background thread under a soft and a hard deadline.
//!
//! The caller waits until the soft deadline, then keeps waiting for a late result until the hard deadline.
//! After that the call is abandoned: the kill switch (if any) is fired and the thread is left to finish
//! on its own. Threads running in-process code cannot be stopped, only forgotten.
use std::any::Any;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError};

use crate::runtime::KillSwitch;

#[derive(Debug)]
pub enum Timed<T> {
    /// The closure returned before the soft deadline.
    OnTime { value: T, elapsed: Duration },
    /// The closure returned after the soft deadline but before the hard one.
    Late { value: T, elapsed: Duration },
    /// The hard deadline passed, the result will never be collected.
    Abandoned,
    /// The closure panicked, or the thread could not be started.
    Failed(String),
}

pub fn run_timed<T, F>(label: &str, soft: Duration, hard: Duration, kill: Option<KillSwitch>, f: F) -> Timed<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    assert!(soft <= hard, "soft deadline {:?} must not be after hard deadline {:?}", soft, hard);

    let start = Instant::now();
    let (sender, receiver) = flume::bounded(1);

    let spawned = std::thread::Builder::new()
        .name(format!("bot-{}", label))
        .spawn(move || {
            let value = f();
            // the receiver is gone if the call was abandoned
            let _ = sender.send((value, start.elapsed()));
        });
    let handle = match spawned {
        Ok(handle) => handle,
        Err(e) => return Timed::Failed(format!("failed to start thread: {}", e)),
    };

    let received = match recv_until(&receiver, start, soft) {
        Err(RecvTimeoutError::Timeout) => recv_until(&receiver, start, hard),
        other => other,
    };

    match received {
        Ok((value, elapsed)) if elapsed <= soft => Timed::OnTime { value, elapsed },
        Ok((value, elapsed)) if elapsed <= hard => Timed::Late { value, elapsed },
        Ok(_) | Err(RecvTimeoutError::Timeout) => {
            tracing::debug!(label, hard_ms = hard.as_millis() as u64, "abandoning call");
            if let Some(kill) = kill {
                kill.fire();
            }
            Timed::Abandoned
        }
        Err(RecvTimeoutError::Disconnected) => match handle.join() {
            Ok(()) => Timed::Failed("thread exited without a result".to_owned()),
            Err(payload) => Timed::Failed(panic_message(payload)),
        },
    }
}

fn recv_until<T>(receiver: &Receiver<T>, start: Instant, after: Duration) -> Result<T, RecvTimeoutError> {
    match start.checked_add(after) {
        Some(deadline) => receiver.recv_deadline(deadline),
        // past the end of time, wait without a deadline
        None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_owned()
    }
}
