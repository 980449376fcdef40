use std::time::{Duration, Instant};

use othello_arena::ai::{Bot, BotFactory, BotFault, RawMove};
use othello_arena::board::Color;
use othello_arena::games::othello::OthelloBoard;
use othello_arena::registry::{BotRecord, BotSource};
use othello_arena::runtime::{BotInstance, BotRuntime, InitError, MoveInvocation, HARD_TIMEOUT_FACTOR};


const SOFT: Duration = Duration::from_millis(100);

/// A bot that always answers `mv` after sleeping for `delay`.
#[derive(Debug)]
struct SleepyBot {
    delay: Duration,
    mv: Result<RawMove, BotFault>,
}

impl Bot for SleepyBot {
    fn select_move(&mut self, _: &OthelloBoard) -> Result<RawMove, BotFault> {
        std::thread::sleep(self.delay);
        self.mv.clone()
    }
}

#[derive(Debug)]
struct PanicBot;

impl Bot for PanicBot {
    fn select_move(&mut self, _: &OthelloBoard) -> Result<RawMove, BotFault> {
        panic!("out of ideas")
    }
}

fn runtime() -> BotRuntime {
    BotRuntime::new("python3", Duration::from_secs(10))
}

pub fn native_record(name: &str, factory: BotFactory) -> BotRecord {
    BotRecord {
        name: name.to_owned(),
        source: BotSource::Builtin(factory),
        upload_time: None,
    }
}

fn sleepy(delay: Duration, mv: Result<RawMove, BotFault>) -> BotInstance {
    let factory = BotFactory::new(move |_, _| {
        Ok(Box::new(SleepyBot {
            delay,
            mv: mv.clone(),
        }) as Box<dyn Bot>)
    });
    construct(native_record("sleepy", factory))
}

fn construct(record: BotRecord) -> BotInstance {
    let runtime = runtime();
    let loaded = runtime.load(&record).unwrap();
    let (instance, _) = runtime
        .initialize(loaded, Color::Black, Color::White, Duration::from_secs(1))
        .unwrap();
    instance
}

fn invoke(instance: &mut BotInstance) -> MoveInvocation {
    let board = OthelloBoard::new(8).unwrap();
    runtime().invoke_move(instance, &board, SOFT)
}

#[test]
fn on_time() {
    let mut instance = sleepy(Duration::ZERO, Ok((2, 3)));
    let invocation = invoke(&mut instance);

    match invocation {
        MoveInvocation::OnTime { mv, elapsed } => {
            assert_eq!(mv, (2, 3));
            assert!(elapsed <= SOFT);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(instance.is_alive());
}

#[test]
fn soft_timeout_keeps_move() {
    let mut instance = sleepy(Duration::from_millis(200), Ok((5, 4)));
    let invocation = invoke(&mut instance);
    println!("{:?}", invocation);

    assert_eq!(invocation.mv(), Some((5, 4)));
    assert!(invocation.elapsed().unwrap() > SOFT);
    assert!(matches!(invocation, MoveInvocation::SoftTimeoutLoss { .. }));

    let message = invocation.error().unwrap();
    assert!(message.contains("lost"), "{}", message);
    assert!(message.contains("time limit"), "{}", message);
}

#[test]
fn hard_timeout_abandons_bot() {
    let mut instance = sleepy(Duration::from_secs(3), Ok((2, 3)));
    let start = Instant::now();
    let invocation = invoke(&mut instance);

    assert!(start.elapsed() < SOFT * HARD_TIMEOUT_FACTOR * 2);
    assert_eq!(invocation.mv(), None);
    assert_eq!(invocation.elapsed(), None);
    match &invocation {
        MoveInvocation::HardTimeoutAbort { message } => assert!(message.contains("maximum time limit"), "{}", message),
        other => panic!("unexpected {:?}", other),
    }

    assert!(!instance.is_alive());
    assert!(matches!(invoke(&mut instance), MoveInvocation::RuntimeFault { .. }));
}

#[test]
fn faults() {
    let mut raised = sleepy(Duration::ZERO, Err(BotFault::Raised("no".to_owned())));
    assert!(matches!(invoke(&mut raised), MoveInvocation::RuntimeFault { .. }));
    assert!(raised.is_alive());

    let mut format = sleepy(Duration::ZERO, Err(BotFault::InvalidFormat("'e4'".to_owned())));
    let invocation = invoke(&mut format);
    assert!(matches!(invocation, MoveInvocation::InvalidMoveFormat { .. }));
    assert_eq!(invocation.error(), Some("returned an invalid move format: 'e4'"));

    let factory = BotFactory::new(|_, _| Ok(Box::new(PanicBot) as Box<dyn Bot>));
    let mut panicking = construct(native_record("panic", factory));
    match invoke(&mut panicking) {
        MoveInvocation::RuntimeFault { message } => assert!(message.contains("out of ideas"), "{}", message),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn init_timeout() {
    let factory = BotFactory::new(|_, _| {
        std::thread::sleep(Duration::from_millis(500));
        Ok(Box::new(PanicBot) as Box<dyn Bot>)
    });

    let runtime = runtime();
    let loaded = runtime.load(&native_record("slow", factory)).unwrap();
    let err = runtime
        .initialize(loaded, Color::White, Color::Black, SOFT)
        .unwrap_err();

    assert_eq!(err, InitError::Timeout(SOFT));
    let message = err.to_string();
    assert!(message.contains("exceeded") && message.contains("time limit"), "{}", message);
}

#[test]
fn init_failure() {
    let factory = BotFactory::new(|_, _| Err(BotFault::Raised("no board for me".to_owned())));

    let runtime = runtime();
    let loaded = runtime.load(&native_record("grumpy", factory)).unwrap();
    let err = runtime
        .initialize(loaded, Color::Black, Color::White, Duration::from_secs(1))
        .unwrap_err();

    assert_eq!(err, InitError::Failed("no board for me".to_owned()));
}

#[test]
fn init_reports_elapsed() {
    let factory = BotFactory::new(|_, _| {
        std::thread::sleep(Duration::from_millis(50));
        Ok(Box::new(PanicBot) as Box<dyn Bot>)
    });

    let runtime = runtime();
    let loaded = runtime.load(&native_record("patient", factory)).unwrap();
    let (instance, elapsed) = runtime
        .initialize(loaded, Color::Black, Color::White, Duration::from_secs(1))
        .unwrap();

    assert_eq!(instance.name(), "patient");
    assert!(elapsed >= Duration::from_millis(50));
}
