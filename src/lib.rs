//! Keyword citation-trend analytics over a bibliographic corpus.
//!
//! `keytrend` persists papers, their citations per year and their keywords in
//! a SQLite store, then answers analytical questions about keywords: how many
//! citations each keyword has gathered per year, whether recent activity is
//! above or below its historical mean, and how an impact-factor style ratio
//! evolves over time.
//!
//! # Features
//!
//! - `regex` - Use the `regex` crate for keyword search (enabled by default)
//! - `lite` - Use `regex-lite` instead, for smaller binaries
//! - `bundled` - Build SQLite from source (enabled by default)
//!
//! # Keyword Taxonomies
//!
//! A paper carries labels from three independent schemes, see [`Taxonomy`]:
//! index terms, author keywords and subject areas. The same literal word may
//! appear in several of them; aggregation merges it into a single record.
//!
//! # Basic Usage
//!
//! ```rust
//! use keytrend::{Ingestor, KeywordSession, PaperStore, Record, TrendConfig};
//!
//! let mut store = PaperStore::open_in_memory().unwrap();
//! store.create_schema().unwrap();
//!
//! let records = vec![
//!     Record::new()
//!         .with_field("doi", "10.1/a")
//!         .with_field("year", "2020")
//!         .with_field("per_year_citations", "2020:1,2021:3,2022:5")
//!         .with_field("index_terms", "ML, AI"),
//!     Record::new()
//!         .with_field("doi", "10.1/b")
//!         .with_field("year", "2021")
//!         .with_field("per_year_citations", "2021:2,2022:4")
//!         .with_field("index_terms", "AI"),
//! ];
//! let report = Ingestor::new().ingest(&mut store, &records).unwrap();
//! assert_eq!(report.inserted, 2);
//!
//! let mut session = KeywordSession::new(TrendConfig::new().with_reference_year(2023));
//! let results = session.search(&store, "^a").unwrap();
//! assert_eq!(results.len(), 1);
//!
//! let ai = session.lookup("ai").unwrap();
//! assert_eq!(ai.total_citations, 15);
//! ```
//!
//! # Error Handling
//!
//! Operations return [`Result`], wrapping [`KeytrendError`]. Every error and
//! every [`Warning`] can be classified with `kind()` into the tiers of
//! [`ErrorKind`], so callers decide whether to abort, report or continue.
//!
//! # Thread Safety
//!
//! The store and the session are single-threaded. Callers sharing a session
//! between threads must wrap it in a mutex, since searches, unions and
//! removals are read-modify-write sequences on the cached working set.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub mod aggregate;
pub mod config;
pub mod debounce;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod session;
pub mod stats;
pub mod store;

// Reexports
pub use aggregate::{
    Aggregated, KeywordAggregator, KeywordMembership, KeywordRecord, MembershipSource,
};
pub use config::TrendConfig;
pub use debounce::Debouncer;
pub use error::{
    CallerError, ErrorKind, KeytrendError, ParseError, Result, StoreError, ValueError, Warning,
};
pub use ingest::{IngestFailure, IngestReport, Ingestor};
pub use normalize::{FieldConfig, Normalized, RecordNormalizer};
pub use session::{KeywordSession, SearchResults};
pub use stats::{TrendPoint, ZTrend};
pub use store::PaperStore;

mod regex;
mod utils;

/// The three keyword classification schemes a paper can be labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Taxonomy {
    IndexTerm,
    AuthorKeyword,
    SubjectArea,
}

impl Taxonomy {
    /// All taxonomies, in storage order.
    pub const ALL: [Taxonomy; 3] = [
        Taxonomy::IndexTerm,
        Taxonomy::AuthorKeyword,
        Taxonomy::SubjectArea,
    ];

    /// Convert the taxonomy to a display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Taxonomy::IndexTerm => "Index Term",
            Taxonomy::AuthorKeyword => "Author Keyword",
            Taxonomy::SubjectArea => "Subject Area",
        }
    }
}

impl std::fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A paper ready for insertion, or read back from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// DOI, or EID when the DOI is absent
    pub key: String,
    /// Title of the work
    pub title: String,
    /// Author list as a single string
    pub authors: String,
    /// Publication year (0 when unknown)
    pub year: i32,
    /// Abstract text
    pub abstract_text: String,
    /// Sum of all yearly citation counts
    pub total_citations: u64,
    /// Citations received per calendar year
    pub citations: BTreeMap<i32, u32>,
    /// Index terms
    pub index_terms: BTreeSet<CompactString>,
    /// Author keywords
    pub author_keywords: BTreeSet<CompactString>,
    /// Subject areas
    pub subject_areas: BTreeSet<CompactString>,
}

impl Paper {
    /// Create a new empty Paper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of the paper in one taxonomy.
    pub fn labels(&self, taxonomy: Taxonomy) -> &BTreeSet<CompactString> {
        match taxonomy {
            Taxonomy::IndexTerm => &self.index_terms,
            Taxonomy::AuthorKeyword => &self.author_keywords,
            Taxonomy::SubjectArea => &self.subject_areas,
        }
    }

    pub(crate) fn labels_mut(&mut self, taxonomy: Taxonomy) -> &mut BTreeSet<CompactString> {
        match taxonomy {
            Taxonomy::IndexTerm => &mut self.index_terms,
            Taxonomy::AuthorKeyword => &mut self.author_keywords,
            Taxonomy::SubjectArea => &mut self.subject_areas,
        }
    }

    /// Whether the paper carries `keyword` in any taxonomy.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        Taxonomy::ALL
            .iter()
            .any(|&taxonomy| self.labels(taxonomy).contains(keyword))
    }
}

/// One already-parsed bibliographic record: field name to its values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: HashMap<String, Vec<String>>,
}

impl Record {
    /// Create a new empty Record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to a field, builder style.
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.add_field(name, value);
        self
    }

    /// Append a value to a field.
    pub fn add_field(&mut self, name: &str, value: &str) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Get the first value of a field, if it exists.
    pub fn get_first(&self, name: &str) -> Option<&String> {
        self.fields.get(name).and_then(|values| values.first())
    }
}

impl FromIterator<(String, Vec<String>)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
