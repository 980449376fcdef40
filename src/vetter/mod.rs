//! Static checks on uploaded bot source, before it is ever executed.
//!
//! The source is parsed into a python syntax tree and every node is checked against a [Policy]:
//! imports must come from an allow-list, dangerous builtins may not be called by name, reflective
//! dunder attributes may not be touched and `del` statements are rejected outright.
//! All violations are collected, checking does not stop at the first one.
//!
//! Detection is purely syntactic and name based. Aliasing and indirect references are not resolved:
//! `e = eval; e("1")` or `getattr` reached through a container will not be detected. This is a first
//! filter, the real containment comes from running bots in a separate process under time limits.
use std::fmt::{Display, Formatter};

use rustpython_parser::{ast, Parse};

pub use policy::Policy;

pub mod policy;
mod walk;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    SyntaxError,
    DangerousImport,
    DisallowedImport,
    DangerousFunction,
    FileOperation,
    DangerousAttribute,
    DangerousOperation,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::SyntaxError => "SYNTAX_ERROR",
            ViolationKind::DangerousImport => "DANGEROUS_IMPORT",
            ViolationKind::DisallowedImport => "DISALLOWED_IMPORT",
            ViolationKind::DangerousFunction => "DANGEROUS_FUNCTION",
            ViolationKind::FileOperation => "FILE_OPERATION",
            ViolationKind::DangerousAttribute => "DANGEROUS_ATTRIBUTE",
            ViolationKind::DangerousOperation => "DANGEROUS_OPERATION",
        }
    }
}

impl Display for ViolationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single problem found in the source. `line` is 1-based, `snippet` is that line with surrounding whitespace removed.
#[derive(Debug, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub message: String,
    pub line: Option<usize>,
    pub snippet: Option<String>,
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} at line {}: {}", self.kind, line, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// The outcome of vetting a single source file.
#[derive(Debug, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VetReport {
    pub filename: String,
    pub violations: Vec<Violation>,
}

impl VetReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceVetter {
    policy: Policy,
}

impl SourceVetter {
    pub fn new(policy: Policy) -> Self {
        SourceVetter { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Check `source`. `filename` is only used in messages.
    ///
    /// A syntax error is reported as the single violation, no further checks are run on unparsable source.
    /// Source that nests too deeply is rejected the same way without being parsed.
    /// Otherwise the violations are grouped by check (imports, calls, attributes, other operations),
    /// each group in source order.
    pub fn vet(&self, source: &str, filename: &str) -> VetReport {
        let violations = if let Some(offset) = walk::too_deep(source) {
            let line = walk::line_of(source, offset);
            vec![Violation {
                kind: ViolationKind::SyntaxError,
                message: format!("Invalid Python syntax: too many nested expressions (line {})", line),
                line: Some(line),
                snippet: None,
            }]
        } else {
            self.check(source, filename)
        };

        if violations.is_empty() {
            tracing::debug!(filename, "source passed vetting");
        } else {
            tracing::info!(filename, count = violations.len(), "source failed vetting");
        }

        VetReport {
            filename: filename.to_owned(),
            violations,
        }
    }

    fn check(&self, source: &str, filename: &str) -> Vec<Violation> {
        match ast::Suite::parse(source, filename) {
            Ok(suite) => walk::check_suite(&self.policy, source, &suite),
            Err(e) => {
                let line = walk::line_of(source, u32::from(e.offset) as usize);
                vec![Violation {
                    kind: ViolationKind::SyntaxError,
                    message: format!("Invalid Python syntax: {} (line {})", e.error, line),
                    line: Some(line),
                    snippet: None,
                }]
            }
        }
    }
}
