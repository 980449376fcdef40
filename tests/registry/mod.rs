use othello_arena::ai::BuiltinBot;
use othello_arena::quarantine::{Quarantine, RequestInfo};
use othello_arena::registry::{BotOrigin, BotRegistry, RegistryError, UploadError};
use othello_arena::vetter::{SourceVetter, ViolationKind};

const CLEAN: &str = "import random\n\nclass P:\n    def __init__(self, me, opp):\n        self.me = me\n\n    def select_move(self, board):\n        return (0, 0)\n";
const EVIL: &str = "import os\n\nclass P:\n    def select_move(self, board):\n        os.system('rm -rf /')\n        return eval('(0, 0)')\n";

struct Setup {
    _dir: tempfile::TempDir,
    bots: BotRegistry,
    quarantine: Quarantine,
    vetter: SourceVetter,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let bots = BotRegistry::open(dir.path().join("uploads")).unwrap();
    let quarantine = Quarantine::open(dir.path().join("quarantine")).unwrap();
    Setup {
        _dir: dir,
        bots,
        quarantine,
        vetter: SourceVetter::default(),
    }
}

impl Setup {
    fn upload(&mut self, filename: &str, source: &str) -> Result<String, UploadError> {
        let info = RequestInfo {
            ip: Some("10.0.0.7".to_owned()),
            user_agent: Some("test".to_owned()),
        };
        self.bots
            .upload(filename, source.as_bytes(), &info, &self.vetter, &self.quarantine)
            .map(|record| record.name)
    }
}

#[test]
fn builtins_are_listed_first() {
    let mut s = setup();
    s.upload("aardvark.py", CLEAN).unwrap();

    let names: Vec<String> = s.bots.list().into_iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec!["random_player", "greedy_player", "minimax_player", "aardvark"]
    );
    for bot in BuiltinBot::ALL {
        let record = s.bots.get(bot.name()).unwrap();
        assert_eq!(record.origin(), BotOrigin::Builtin);
        assert_eq!(record.path(), None);
        assert_eq!(record.upload_time, None);
    }
}

#[test]
fn accepted_upload_is_stored() {
    let mut s = setup();
    assert_eq!(s.upload("corner.py", CLEAN).unwrap(), "corner");

    let record = s.bots.get("corner").unwrap();
    assert_eq!(record.origin(), BotOrigin::Uploaded);
    assert!(record.upload_time.is_some());
    let path = record.path().unwrap().to_owned();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), CLEAN);
    assert!(s.bots.uploads_dir().join(BotRegistry::METADATA_FILE).is_file());
    assert_eq!(s.quarantine.entries(None).unwrap().len(), 0);

    // the metadata survives reopening
    let reopened = BotRegistry::open(s.bots.uploads_dir()).unwrap();
    assert_eq!(reopened.get("corner").unwrap().upload_time, record.upload_time);
}

#[test]
fn rejected_upload_is_quarantined() {
    let mut s = setup();
    let err = s.upload("evil.py", EVIL).unwrap_err();

    let quarantine_path = match &err {
        UploadError::Rejected {
            report,
            quarantine_path,
        } => {
            assert!(report.has_kind(ViolationKind::DangerousImport));
            assert!(report.has_kind(ViolationKind::DangerousFunction));
            quarantine_path.clone().unwrap()
        }
        other => panic!("unexpected {:?}", other),
    };

    let message = err.to_string();
    assert!(message.starts_with("Security validation failed for 'evil.py':\n  - "), "{}", message);
    assert!(message.contains("DANGEROUS_IMPORT at line 1"), "{}", message);

    assert!(!s.bots.contains("evil"));
    assert!(!s.bots.uploads_dir().join("evil.py").exists());
    assert_eq!(std::fs::read_to_string(&quarantine_path).unwrap(), EVIL);

    let entries = s.quarantine.entries(None).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, "evil.py");
    assert_eq!(entries[0].quarantine_path, quarantine_path);
    assert_eq!(entries[0].request_info.ip.as_deref(), Some("10.0.0.7"));
    assert_eq!(entries[0].violations.len(), 2);
}

#[test]
fn quarantine_entries_most_recent_first() {
    let mut s = setup();
    for name in ["first.py", "second.py", "third.py"] {
        assert!(s.upload(name, EVIL).is_err());
    }

    let entries = s.quarantine.entries(Some(2)).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
    assert_eq!(names, vec!["third.py", "second.py"]);

    // garbage in the log is skipped
    let log = s.quarantine.dir().join(Quarantine::LOG_FILE);
    let mut content = std::fs::read_to_string(&log).unwrap();
    content.push_str("{ not json\n");
    std::fs::write(&log, content).unwrap();
    assert_eq!(s.quarantine.entries(None).unwrap().len(), 3);
}

#[test]
fn upload_name_checks() {
    let mut s = setup();

    assert!(matches!(s.upload("bot.txt", CLEAN), Err(UploadError::NotPython(_))));
    assert!(matches!(s.upload("../escape.py", CLEAN), Err(UploadError::InvalidFilename(_))));
    assert!(matches!(s.upload(".py", CLEAN), Err(UploadError::InvalidFilename(_))));
    assert!(matches!(s.upload("random_player.py", CLEAN), Err(UploadError::AlreadyExists(_))));

    s.upload("twice.py", CLEAN).unwrap();
    let err = s.upload("twice.py", CLEAN).unwrap_err();
    assert_eq!(err.to_string(), "Bot 'twice' already exists");

    let info = RequestInfo::default();
    let not_utf8 = s.bots.upload("bytes.py", &[0xff, 0xfe], &info, &s.vetter, &s.quarantine);
    assert!(matches!(not_utf8, Err(UploadError::NotUtf8)));
}

#[test]
fn remove_and_rename() {
    let mut s = setup();
    s.upload("old.py", CLEAN).unwrap();
    s.upload("other.py", CLEAN).unwrap();

    assert!(matches!(s.bots.remove("greedy_player"), Err(RegistryError::Builtin(_))));
    assert!(matches!(s.bots.remove("ghost"), Err(RegistryError::NotFound(_))));
    assert!(matches!(s.bots.rename("old", "other"), Err(RegistryError::AlreadyExists(_))));
    assert!(matches!(s.bots.rename("old", "../x"), Err(RegistryError::InvalidName(_))));
    assert!(matches!(s.bots.rename("random_player", "x"), Err(RegistryError::Builtin(_))));

    let renamed = s.bots.rename("old", "new").unwrap();
    assert_eq!(renamed.name, "new");
    assert!(!s.bots.contains("old"));
    assert!(s.bots.uploads_dir().join("new.py").is_file());
    assert!(!s.bots.uploads_dir().join("old.py").exists());

    s.bots.remove("new").unwrap();
    assert!(!s.bots.contains("new"));
    assert!(!s.bots.uploads_dir().join("new.py").exists());
    assert_eq!(s.bots.get("new").map(|r| r.name), None);
}

#[test]
fn missing_files_are_forgotten() {
    let mut s = setup();
    s.upload("vanishing.py", CLEAN).unwrap();
    std::fs::remove_file(s.bots.uploads_dir().join("vanishing.py")).unwrap();

    let reopened = BotRegistry::open(s.bots.uploads_dir()).unwrap();
    assert!(!reopened.contains("vanishing"));
}

#[test]
fn metadata_failure_rolls_back() {
    let mut s = setup();
    s.upload("kept.py", CLEAN).unwrap();

    // a directory in place of the metadata file makes every save fail
    let metadata = s.bots.uploads_dir().join(BotRegistry::METADATA_FILE);
    std::fs::remove_file(&metadata).unwrap();
    std::fs::create_dir(&metadata).unwrap();

    assert!(matches!(s.upload("lost.py", CLEAN), Err(UploadError::Store(_))));
    assert!(!s.bots.contains("lost"));
    assert!(!s.bots.uploads_dir().join("lost.py").exists());

    assert!(matches!(s.bots.rename("kept", "moved"), Err(RegistryError::Store(_))));
    assert!(s.bots.contains("kept"));
    assert!(!s.bots.contains("moved"));
    assert!(s.bots.uploads_dir().join("kept.py").is_file());
    assert!(!s.bots.uploads_dir().join("moved.py").exists());
}
