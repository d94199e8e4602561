//! Record normalization.
//!
//! Turns one parsed bibliographic [`Record`] into a [`Paper`] ready for the
//! store, and tracks the keys seen during an ingestion run.
//!
//! # Example
//!
//! ```
//! use keytrend::{Record, RecordNormalizer};
//!
//! let record = Record::new()
//!     .with_field("doi", "10.1/a")
//!     .with_field("per_year_citations", "2020:1,2021:3")
//!     .with_field("author_keywords", "Graphs, NETWORKS");
//!
//! let mut normalizer = RecordNormalizer::new();
//! let normalized = normalizer.normalize(&record).unwrap();
//! assert_eq!(normalized.paper.key, "10.1/a");
//! assert_eq!(normalized.paper.total_citations, 4);
//! assert!(normalized.paper.author_keywords.contains("networks"));
//! ```

mod fields;

pub use fields::{FieldConfig, FieldKind};

use crate::error::{ParseError, Warning};
use crate::{Paper, Record};
use fields::{FIELD_HANDLERS, FieldHandler, PaperDraft};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// The outcome of normalizing one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The insertion payload
    pub paper: Paper,
    /// Data-quality problems found in the record
    pub warnings: Vec<Warning>,
}

impl Normalized {
    /// Whether the record resolved to a non-empty key.
    pub fn has_key(&self) -> bool {
        !self.paper.key.is_empty()
    }

    /// Whether the key was already seen earlier in the run.
    pub fn is_duplicate(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, Warning::DuplicateKey { .. }))
    }
}

/// Converts records into papers.
///
/// The normalizer remembers every key it produced, so a key that appears a
/// second time in the same run is flagged with [`Warning::DuplicateKey`].
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    fields: FieldConfig,
    handlers: HashMap<FieldKind, FieldHandler>,
    seen: HashSet<String>,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordNormalizer {
    /// Creates a normalizer with the default field names.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fields(FieldConfig::new())
    }

    /// Creates a normalizer with custom field aliases.
    #[must_use]
    pub fn with_fields(fields: FieldConfig) -> Self {
        Self {
            fields,
            handlers: FIELD_HANDLERS.iter().copied().collect(),
            seen: HashSet::new(),
        }
    }

    /// Gets a reference to the field configuration
    pub fn fields(&self) -> &FieldConfig {
        &self.fields
    }

    /// Number of distinct keys seen so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Forget every key seen so far, starting a new run.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Normalize one record.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` when a `year:count` token or the year is not an
    /// integer, or when a citation year is listed twice. Missing and
    /// duplicate keys are not errors; they are reported in
    /// [`Normalized::warnings`].
    pub fn normalize(&mut self, record: &Record) -> Result<Normalized, ParseError> {
        // Aliases of one kind pool their values in field-name order.
        // Identifier kinds sort first, so errors below can name the record.
        let mut recognized: BTreeMap<FieldKind, Vec<String>> = BTreeMap::new();
        for (name, values) in record.fields.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            match self.fields.kind_for(name) {
                Some(kind) => recognized
                    .entry(kind)
                    .or_default()
                    .extend(values.iter().cloned()),
                None => debug!(field = %name, "ignoring unrecognized record field"),
            }
        }

        let mut draft = PaperDraft::default();
        for (kind, values) in &recognized {
            if let Some(handler) = self.handlers.get(kind) {
                handler(&mut draft, values)
                    .map_err(|error| ParseError::new(draft.key().map(String::from), error))?;
            }
        }

        let mut paper = draft.paper;
        let mut warnings = Vec::new();
        match draft.doi.or(draft.eid) {
            Some(key) => {
                if !self.seen.insert(key.clone()) {
                    warn!(key = %key, "duplicate paper key");
                    warnings.push(Warning::DuplicateKey { key: key.clone() });
                }
                paper.key = key;
            }
            None => {
                warn!(title = %paper.title, "record has neither a DOI nor an EID");
                warnings.push(Warning::MissingKey {
                    title: paper.title.clone(),
                });
            }
        }

        Ok(Normalized { paper, warnings })
    }
}
