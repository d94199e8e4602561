//! Error types for ingestion, storage and keyword queries.
//!
//! Failures fall into four tiers, reported by [`ErrorKind`]:
//!
//! - **Fatal**: the store cannot be opened, the schema cannot be created, or
//!   a read query fails. The process should not continue.
//! - **Warning**: a data-quality problem that is logged and returned as a
//!   [`Warning`] value while processing carries on.
//! - **Caller**: a usage bug, such as a union of fewer than two keywords, a
//!   lookup of a keyword that was never aggregated, or a malformed
//!   `year:count` token.
//! - **Recoverable**: the operation failed but the session is intact, such as
//!   an insert rolled back on a constraint violation or an invalid search
//!   pattern. Any other failed insert means the store itself is broken and
//!   is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Field name constants for consistent error reporting.
pub mod fields {
    pub const DOI: &str = "doi";
    pub const EID: &str = "eid";
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const YEAR: &str = "year";
    pub const ABSTRACT: &str = "abstract";
    pub const PER_YEAR_CITATIONS: &str = "per_year_citations";
    pub const INDEX_TERMS: &str = "index_terms";
    pub const AUTHOR_KEYWORDS: &str = "author_keywords";
    pub const SUBJECT_AREAS: &str = "subject_areas";
}

/// The tier a failure or warning belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Startup or store failure; abort.
    Fatal,
    /// Data-quality problem; log and continue.
    Warning,
    /// Programming or usage error; the caller must not continue past it.
    Caller,
    /// The operation failed without damaging any state.
    Recoverable,
}

/// Top-level error type for keyword trend operations.
#[derive(Error, Debug)]
pub enum KeytrendError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Caller(#[from] CallerError),
}

impl KeytrendError {
    /// Classify the error into its tier.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeytrendError::Store(err) => err.kind(),
            KeytrendError::Parse(_) | KeytrendError::Caller(_) => ErrorKind::Caller,
        }
    }

    /// Whether the process should stop.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Failures of the relational store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot open paper store at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Cannot create relation {relation}: {source}")]
    Schema {
        relation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Insert of paper \"{key}\" into {relation} rolled back: {source}")]
    Insert {
        key: String,
        relation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query on {relation} failed: {source}")]
    Query {
        relation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Classify the error into its tier.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Insert { .. } if self.is_constraint_violation() => {
                ErrorKind::Recoverable
            }
            _ => ErrorKind::Fatal,
        }
    }

    /// Whether the underlying SQLite error is a constraint violation,
    /// e.g. a duplicate primary key.
    pub fn is_constraint_violation(&self) -> bool {
        let source = match self {
            StoreError::Open { source, .. }
            | StoreError::Schema { source, .. }
            | StoreError::Insert { source, .. }
            | StoreError::Query { source, .. } => source,
        };
        matches!(
            source.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        )
    }

    pub(crate) fn query(relation: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StoreError::Query { relation, source }
    }
}

/// A record that could not be turned into a paper.
#[derive(Error, Debug)]
#[error("Error in record{}: {error}",
    match key {
        Some(k) if !k.is_empty() => format!(" \"{}\"", k),
        _ => String::new(),
    }
)]
pub struct ParseError {
    /// Key of the record, when it was resolved before the failure
    pub key: Option<String>,
    /// The specific error that occurred
    pub error: ValueError,
}

impl ParseError {
    /// Create a new ParseError.
    pub fn new(key: Option<String>, error: ValueError) -> Self {
        Self { key, error }
    }

    /// Create a ParseError for a record whose key is not known.
    pub fn without_key(error: ValueError) -> Self {
        Self::new(None, error)
    }
}

/// Specific value-level errors that can occur while normalizing a record.
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("Bad syntax: {0}")]
    Syntax(String),

    #[error("Missing value for {key}")]
    MissingValue {
        field: &'static str,
        key: &'static str,
    },

    #[error("Bad value for {key}: \"{value}\" ({reason})")]
    BadValue {
        field: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Misuse of the query API.
#[derive(Error, Debug, PartialEq)]
pub enum CallerError {
    #[error("A union needs at least 2 keywords, {given} given")]
    UnionTooSmall { given: usize },

    #[error("Keyword \"{word}\" is not in the working set{}",
        if suggestions.is_empty() {
            String::new()
        } else {
            format!(" (did you mean: {}?)", suggestions.join(", "))
        }
    )]
    UnknownKeyword {
        word: String,
        suggestions: Vec<String>,
    },
}

/// Non-blocking conditions reported alongside a successful result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("Paper key \"{key}\" seen more than once; keeping the first record")]
    DuplicateKey { key: String },

    #[error("Record \"{title}\" has neither a DOI nor an EID")]
    MissingKey { title: String },

    #[error("No citation data for \"{word}\" in {year}")]
    MissingRecentYear { word: String, year: i32 },

    #[error("No keywords found for \"{query}\"")]
    EmptyResult { query: String },

    #[error("Invalid search pattern \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl Warning {
    /// Classify the warning into its tier.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Warning::InvalidPattern { .. } => ErrorKind::Recoverable,
            _ => ErrorKind::Warning,
        }
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, KeytrendError>;
