//! Audit trail for rejected uploads.
//!
//! Every rejected file is kept verbatim as `<timestamp>_<filename>` next to an append-only log
//! with one JSON object per line.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;
use crate::vetter::Violation;

/// Who sent an upload, as far as the transport layer knows.
#[derive(Debug, Clone, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RequestInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuarantineEntry {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub quarantine_path: PathBuf,
    pub violations: Vec<Violation>,
    pub request_info: RequestInfo,
}

#[derive(Debug, Clone)]
pub struct Quarantine {
    dir: PathBuf,
}

impl Quarantine {
    pub const LOG_FILE: &'static str = "security_log.jsonl";

    /// Open the quarantine at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Quarantine, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(StoreError::io(&dir))?;
        Ok(Quarantine { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(Self::LOG_FILE)
    }

    /// Store `bytes` and append a log entry describing why they were rejected.
    pub fn record(
        &self,
        filename: &str,
        violations: &[Violation],
        request_info: &RequestInfo,
        bytes: &[u8],
    ) -> Result<QuarantineEntry, StoreError> {
        let timestamp = Utc::now();
        let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Micros, true).replace(':', "-");

        // only keep the last path component, the name comes from the client
        let base = Path::new(filename)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let quarantine_path = self.dir.join(format!("{}_{}", stamp, base));
        std::fs::write(&quarantine_path, bytes).map_err(StoreError::io(&quarantine_path))?;

        let entry = QuarantineEntry {
            timestamp,
            filename: filename.to_owned(),
            quarantine_path,
            violations: violations.to_vec(),
            request_info: request_info.clone(),
        };

        let log_path = self.log_path();
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .and_then(|mut f| f.write_all(line.as_bytes()))
            .map_err(StoreError::io(&log_path))?;

        tracing::warn!(
            filename,
            ip = request_info.ip.as_deref().unwrap_or("unknown"),
            violations = violations.len(),
            path = %entry.quarantine_path.display(),
            "quarantined upload"
        );
        Ok(entry)
    }

    /// The logged entries, most recent first, at most `limit` of them.
    /// Lines that cannot be parsed are skipped.
    pub fn entries(&self, limit: Option<usize>) -> Result<Vec<QuarantineEntry>, StoreError> {
        let log_path = self.log_path();
        let content = match std::fs::read_to_string(&log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StoreError::io(&log_path)(e)),
        };

        let entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<QuarantineEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed quarantine log line");
                    None
                }
            })
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(entries)
    }
}
