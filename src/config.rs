use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::games::othello::{MAX_SIZE, MIN_SIZE};
use crate::runtime::MAX_TIMEOUT;

/// Top-level arena configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub runtime: RuntimeConfig,
    pub matches: MatchDefaults,
    pub storage: StorageConfig,
}

/// How bots are loaded and executed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// The interpreter used to run uploaded bots.
    pub python: String,
    /// Upper bound on executing an uploaded source file and locating its player class.
    pub load_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            python: "python3".to_owned(),
            load_timeout_ms: 10_000,
        }
    }
}

/// Defaults for newly created matches.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MatchDefaults {
    pub init_timeout_ms: u64,
    pub move_timeout_ms: u64,
    pub default_board_size: usize,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        MatchDefaults {
            init_timeout_ms: 60_000,
            move_timeout_ms: 1_000,
            default_board_size: 8,
        }
    }
}

impl MatchDefaults {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_millis(self.move_timeout_ms)
    }
}

/// Where uploaded bots and quarantined uploads are kept.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub quarantine_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            uploads_dir: PathBuf::from("uploads"),
            quarantine_dir: PathBuf::from("quarantine"),
        }
    }
}

impl ArenaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ArenaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.python.trim().is_empty() {
            return Err(ConfigError::Validation("runtime.python must not be empty".into()));
        }
        if self.runtime.load_timeout_ms == 0 {
            return Err(ConfigError::Validation("runtime.load_timeout_ms must be > 0".into()));
        }
        if self.matches.init_timeout_ms == 0 {
            return Err(ConfigError::Validation("matches.init_timeout_ms must be > 0".into()));
        }
        if self.matches.move_timeout_ms == 0 {
            return Err(ConfigError::Validation("matches.move_timeout_ms must be > 0".into()));
        }
        let max_ms = MAX_TIMEOUT.as_millis() as u64;
        for (name, value) in [
            ("runtime.load_timeout_ms", self.runtime.load_timeout_ms),
            ("matches.init_timeout_ms", self.matches.init_timeout_ms),
            ("matches.move_timeout_ms", self.matches.move_timeout_ms),
        ] {
            if value > max_ms {
                return Err(ConfigError::Validation(format!("{} must be at most {}", name, max_ms)));
            }
        }
        if !(MIN_SIZE..=MAX_SIZE).contains(&self.matches.default_board_size) {
            return Err(ConfigError::Validation(format!(
                "matches.default_board_size must be in [{}, {}]",
                MIN_SIZE, MAX_SIZE
            )));
        }
        if self.storage.uploads_dir == self.storage.quarantine_dir {
            return Err(ConfigError::Validation(
                "storage.uploads_dir and storage.quarantine_dir must differ".into(),
            ));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&ArenaConfig::default()).expect("default config serializes")
    }
}
