//! The bots available to play: the builtin bots plus every accepted upload.
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::ai::{BotFactory, BuiltinBot};
use crate::error::StoreError;
use crate::quarantine::{Quarantine, RequestInfo};
use crate::vetter::{SourceVetter, VetReport};

#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotOrigin {
    Builtin,
    Uploaded,
}

/// Where the code of a bot lives.
#[derive(Debug, Clone)]
pub enum BotSource {
    Builtin(BotFactory),
    Uploaded(PathBuf),
}

#[derive(Debug, Clone)]
pub struct BotRecord {
    pub name: String,
    pub source: BotSource,
    pub upload_time: Option<DateTime<Utc>>,
}

impl BotRecord {
    pub fn origin(&self) -> BotOrigin {
        match self.source {
            BotSource::Builtin(_) => BotOrigin::Builtin,
            BotSource::Uploaded(_) => BotOrigin::Uploaded,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            BotSource::Builtin(_) => None,
            BotSource::Uploaded(path) => Some(path),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Bot '{0}' not found")]
    NotFound(String),
    #[error("Bot '{0}' is builtin and cannot be modified")]
    Builtin(String),
    #[error("Bot '{0}' already exists")]
    AlreadyExists(String),
    #[error("invalid bot name '{0}'")]
    InvalidName(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Bot file must be a Python file (.py), got '{0}'")]
    NotPython(String),
    #[error("invalid bot filename '{0}'")]
    InvalidFilename(String),
    #[error("Bot '{0}' already exists")]
    AlreadyExists(String),
    #[error("Bot file must be valid UTF-8 text")]
    NotUtf8,
    #[error("{}", rejection_message(.report))]
    Rejected {
        report: VetReport,
        quarantine_path: Option<PathBuf>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn rejection_message(report: &VetReport) -> String {
    format!(
        "Security validation failed for '{}':\n{}",
        report.filename,
        report.violations.iter().map(|v| format!("  - {}", v)).join("\n")
    )
}

/// The on-disk form of an uploaded bot.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoredBot {
    file: String,
    upload_time: DateTime<Utc>,
}

/// Metadata of every known bot. Uploaded bots are stored as files in the uploads directory,
/// together with a JSON metadata file.
#[derive(Debug)]
pub struct BotRegistry {
    uploads_dir: PathBuf,
    builtins: Vec<BotRecord>,
    uploaded: BTreeMap<String, StoredBot>,
}

impl BotRegistry {
    pub const METADATA_FILE: &'static str = "bots.json";

    /// Open the registry in `uploads_dir`, creating the directory if needed.
    /// Uploads whose file has disappeared are dropped from the metadata.
    pub fn open(uploads_dir: impl Into<PathBuf>) -> Result<BotRegistry, StoreError> {
        let uploads_dir = uploads_dir.into();
        std::fs::create_dir_all(&uploads_dir).map_err(StoreError::io(&uploads_dir))?;

        let metadata_path = uploads_dir.join(Self::METADATA_FILE);
        let mut uploaded: BTreeMap<String, StoredBot> = match std::fs::read_to_string(&metadata_path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: metadata_path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io(&metadata_path)(e)),
        };

        uploaded.retain(|name, stored| {
            let exists = uploads_dir.join(&stored.file).is_file();
            if !exists {
                tracing::warn!(bot = %name, file = %stored.file, "uploaded bot file missing, forgetting it");
            }
            exists
        });

        let builtins = BuiltinBot::ALL
            .iter()
            .map(|&bot| BotRecord {
                name: bot.name().to_owned(),
                source: BotSource::Builtin(bot.factory()),
                upload_time: None,
            })
            .collect();

        tracing::debug!(dir = %uploads_dir.display(), uploaded = uploaded.len(), "opened bot registry");
        Ok(BotRegistry {
            uploads_dir,
            builtins,
            uploaded,
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Register an additional in-process bot under `name`.
    pub fn add_builtin(&mut self, name: &str, factory: BotFactory) -> Result<(), RegistryError> {
        if self.contains(name) {
            return Err(RegistryError::AlreadyExists(name.to_owned()));
        }
        self.builtins.push(BotRecord {
            name: name.to_owned(),
            source: BotSource::Builtin(factory),
            upload_time: None,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.iter().any(|b| b.name == name) || self.uploaded.contains_key(name)
    }

    /// All bots, builtins first, then uploads sorted by name.
    pub fn list(&self) -> Vec<BotRecord> {
        let uploaded = self.uploaded.iter().map(|(name, stored)| self.uploaded_record(name, stored));
        self.builtins.iter().cloned().chain(uploaded).collect()
    }

    pub fn get(&self, name: &str) -> Option<BotRecord> {
        if let Some(record) = self.builtins.iter().find(|b| b.name == name) {
            return Some(record.clone());
        }
        self.uploaded
            .get(name)
            .map(|stored| self.uploaded_record(name, stored))
    }

    fn uploaded_record(&self, name: &str, stored: &StoredBot) -> BotRecord {
        BotRecord {
            name: name.to_owned(),
            source: BotSource::Uploaded(self.uploads_dir.join(&stored.file)),
            upload_time: Some(stored.upload_time),
        }
    }

    /// Vet and store an uploaded bot. The bot is named after the file without its `.py` extension.
    /// Uploads that fail vetting are handed to `quarantine` and never written to the uploads directory.
    pub fn upload(
        &mut self,
        filename: &str,
        bytes: &[u8],
        request_info: &RequestInfo,
        vetter: &SourceVetter,
        quarantine: &Quarantine,
    ) -> Result<BotRecord, UploadError> {
        let name = match filename.strip_suffix(".py") {
            Some(name) => name,
            None => return Err(UploadError::NotPython(filename.to_owned())),
        };
        if !is_plain_name(name) {
            return Err(UploadError::InvalidFilename(filename.to_owned()));
        }
        if self.contains(name) {
            return Err(UploadError::AlreadyExists(name.to_owned()));
        }

        let source = std::str::from_utf8(bytes).map_err(|_| UploadError::NotUtf8)?;
        let report = vetter.vet(source, filename);
        if !report.is_valid() {
            let quarantine_path = match quarantine.record(filename, &report.violations, request_info, bytes) {
                Ok(entry) => Some(entry.quarantine_path),
                Err(e) => {
                    tracing::error!(filename, error = %e, "failed to quarantine rejected upload");
                    None
                }
            };
            return Err(UploadError::Rejected {
                report,
                quarantine_path,
            });
        }

        let path = self.uploads_dir.join(filename);
        std::fs::write(&path, bytes).map_err(StoreError::io(&path))?;

        let stored = StoredBot {
            file: filename.to_owned(),
            upload_time: Utc::now(),
        };
        self.uploaded.insert(name.to_owned(), stored.clone());
        if let Err(e) = self.save() {
            self.uploaded.remove(name);
            if let Err(remove_err) = std::fs::remove_file(&path) {
                tracing::warn!(bot = name, error = %remove_err, "failed to clean up upload after metadata error");
            }
            return Err(e.into());
        }

        tracing::info!(bot = name, ip = request_info.ip.as_deref().unwrap_or("unknown"), "accepted upload");
        Ok(self.uploaded_record(name, &stored))
    }

    /// Delete an uploaded bot and its file.
    pub fn remove(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.builtins.iter().any(|b| b.name == name) {
            return Err(RegistryError::Builtin(name.to_owned()));
        }
        let stored = self
            .uploaded
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))?;

        let path = self.uploads_dir.join(&stored.file);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&path)(e).into()),
        }
        self.save()?;

        tracing::info!(bot = name, "removed uploaded bot");
        Ok(())
    }

    /// Give an uploaded bot a new name, moving its file along.
    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<BotRecord, RegistryError> {
        if self.builtins.iter().any(|b| b.name == name) {
            return Err(RegistryError::Builtin(name.to_owned()));
        }
        if !self.uploaded.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_owned()));
        }
        if !is_plain_name(new_name) {
            return Err(RegistryError::InvalidName(new_name.to_owned()));
        }
        if self.contains(new_name) {
            return Err(RegistryError::AlreadyExists(new_name.to_owned()));
        }

        let mut stored = self
            .uploaded
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))?;
        let old_path = self.uploads_dir.join(&stored.file);
        let new_file = format!("{}.py", new_name);
        let new_path = self.uploads_dir.join(&new_file);
        if let Err(e) = std::fs::rename(&old_path, &new_path) {
            self.uploaded.insert(name.to_owned(), stored);
            return Err(StoreError::io(&old_path)(e).into());
        }

        let old_file = std::mem::replace(&mut stored.file, new_file);
        self.uploaded.insert(new_name.to_owned(), stored.clone());
        if let Err(e) = self.save() {
            self.uploaded.remove(new_name);
            if let Err(rename_err) = std::fs::rename(&new_path, &old_path) {
                tracing::warn!(bot = name, error = %rename_err, "failed to move bot back after metadata error");
            }
            self.uploaded.insert(name.to_owned(), StoredBot { file: old_file, ..stored });
            return Err(e.into());
        }

        tracing::info!(bot = name, new_name, "renamed uploaded bot");
        Ok(self.uploaded_record(new_name, &stored))
    }

    fn save(&self) -> Result<(), StoreError> {
        let path = self.uploads_dir.join(Self::METADATA_FILE);
        let json = serde_json::to_string_pretty(&self.uploaded)?;
        std::fs::write(&path, json).map_err(StoreError::io(&path))
    }
}

/// A name that is safe to use as a file stem in the uploads directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

impl Display for BotOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BotOrigin::Builtin => write!(f, "builtin"),
            BotOrigin::Uploaded => write!(f, "uploaded"),
        }
    }
}
