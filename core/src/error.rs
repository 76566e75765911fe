//! Error types and remote error-text classification.
//!
//! The cluster API reports conflicts and load failures only as free text, so
//! every substring the engine relies on lives here, behind two classifier
//! functions with a closed result set.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConvergeError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConvergeError {
    /// Operator input rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    /// Engine misconfiguration (bad retry interval, unreadable manifest).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Remote answered with a non-2xx status.
    #[error("HTTP {status}{}", fmt_body(.body))]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request refused by policy (encryption toggle, missing key), or a
    /// change the cluster never reflected within the wait budget.
    #[error("{0}")]
    Policy(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ConvergeError>;

fn fmt_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({})", truncate(trimmed, 200))
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl ConvergeError {
    /// Classification of this error's text; see [`classify_remote_error`].
    pub fn class(&self) -> ErrorClass {
        match self {
            ConvergeError::Transport(_) => ErrorClass::Transient,
            ConvergeError::Validation(_)
            | ConvergeError::InvalidConfig(_)
            | ConvergeError::Policy(_) => ErrorClass::Fatal,
            other => classify_remote_error(&other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorClass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The requested state already holds ("already part of the topology").
    BenignConflict,
    /// A timing issue that another attempt may clear.
    Transient,
    /// A real failure that retrying cannot fix.
    Fatal,
    Unknown,
}

const ALREADY_PRESENT_PATTERNS: &[&str] = &[
    "already part of",
    "already in its topology",
    "already exists in the topology",
    "is already a member",
];

const TRANSIENT_PATTERNS: &[&str] = &[
    "(status: loading)",
    "still loading",
    "not responding",
    "timed out",
    "connection refused",
];

/// Classify error text returned by a mutating remote call.
pub fn classify_remote_error(text: &str) -> ErrorClass {
    let lower = text.to_lowercase();
    if ALREADY_PRESENT_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::BenignConflict
    } else if TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Unknown
    }
}

/// Classify a node's `LastError` for a database. Anything outside the
/// loading/not-responding allow-list is a genuine load failure.
pub fn classify_load_error(text: &str) -> ErrorClass {
    let lower = text.to_lowercase();
    if lower.trim().is_empty() {
        return ErrorClass::Unknown;
    }
    if TRANSIENT_PATTERNS[..3].iter().any(|p| lower.contains(p)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Fatal
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
