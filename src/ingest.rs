//! Write path: records through the normalizer into the store.
//!
//! Duplicate keys follow a first-write-wins policy. The first record with a
//! key is inserted; later ones are flagged [`Warning::DuplicateKey`] and
//! skipped. A key that already sits in the store from an earlier run is
//! rejected by the store and reported as a failure of that record.

use crate::Record;
use crate::error::{ErrorKind, KeytrendError, Result, Warning};
use crate::normalize::{FieldConfig, RecordNormalizer};
use crate::store::PaperStore;
use tracing::{info, warn};

/// A record that could not be stored.
#[derive(Debug)]
pub struct IngestFailure {
    /// Position of the record in the batch
    pub index: usize,
    /// Key of the record, when it was resolved
    pub key: Option<String>,
    pub error: KeytrendError,
}

/// Summary of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Papers written to the store
    pub inserted: usize,
    /// Records dropped for a missing or duplicate key
    pub skipped: usize,
    /// Data-quality warnings of all records
    pub warnings: Vec<Warning>,
    /// Records rejected by the normalizer or rolled back by the store
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    /// Whether every record was either inserted or deliberately skipped.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives records into a [`PaperStore`].
///
/// One ingestor is one ingestion run: keys are remembered across batches
/// until [`Ingestor::reset`].
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    normalizer: RecordNormalizer,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingestor accepting custom field names.
    pub fn with_fields(fields: FieldConfig) -> Self {
        Self {
            normalizer: RecordNormalizer::with_fields(fields),
        }
    }

    pub fn normalizer(&self) -> &RecordNormalizer {
        &self.normalizer
    }

    /// Forget the keys seen so far.
    pub fn reset(&mut self) {
        self.normalizer.reset();
    }

    /// Normalize and insert a batch of records.
    ///
    /// Per-record problems land in the report and the batch goes on.
    ///
    /// # Errors
    ///
    /// Returns the store error and stops at the first fatal one, e.g. a
    /// read-only or corrupt database. Papers inserted before it stay.
    pub fn ingest(&mut self, store: &mut PaperStore, records: &[Record]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for (index, record) in records.iter().enumerate() {
            let normalized = match self.normalizer.normalize(record) {
                Ok(normalized) => normalized,
                Err(err) => {
                    warn!(index, "{err}");
                    report.failures.push(IngestFailure {
                        index,
                        key: err.key.clone(),
                        error: err.into(),
                    });
                    continue;
                }
            };

            let skip = !normalized.has_key() || normalized.is_duplicate();
            report.warnings.extend(normalized.warnings);
            if skip {
                report.skipped += 1;
                continue;
            }

            match store.insert_paper(&normalized.paper) {
                Ok(()) => report.inserted += 1,
                Err(err) if err.kind() == ErrorKind::Fatal => return Err(err.into()),
                Err(err) => {
                    warn!(index, "{err}");
                    report.failures.push(IngestFailure {
                        index,
                        key: Some(normalized.paper.key),
                        error: err.into(),
                    });
                }
            }
        }

        info!(
            records = records.len(),
            inserted = report.inserted,
            skipped = report.skipped,
            failed = report.failures.len(),
            "ingestion batch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use pretty_assertions::assert_eq;

    fn store() -> PaperStore {
        let store = PaperStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store
    }

    fn record(doi: &str, title: &str, citations: &str) -> Record {
        Record::new()
            .with_field("doi", doi)
            .with_field("title", title)
            .with_field("year", "2020")
            .with_field("per_year_citations", citations)
            .with_field("index_terms", "graphs")
    }

    #[test]
    fn test_ingest_batch() {
        let mut store = store();
        let records = vec![
            record("10.1/a", "First", "2020:1"),
            record("10.1/b", "Second", "2021:2"),
        ];
        let report = Ingestor::new().ingest(&mut store, &records).unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.is_clean());
        assert_eq!(store.papers_by_keyword("graphs").unwrap().len(), 2);
    }

    #[test]
    fn test_first_write_wins() {
        let mut store = store();
        let records = vec![
            record("10.1/a", "First", "2020:1"),
            record("10.1/a", "Second", "2021:7"),
        ];
        let report = Ingestor::new().ingest(&mut store, &records).unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.warnings,
            vec![Warning::DuplicateKey {
                key: "10.1/a".to_string()
            }]
        );

        let paper = store.paper("10.1/a").unwrap().unwrap();
        assert_eq!(paper.title, "First");
        assert_eq!(paper.total_citations, 1);
    }

    #[test]
    fn test_keyless_record_skipped() {
        let mut store = store();
        let records = vec![Record::new().with_field("title", "Orphan")];
        let report = Ingestor::new().ingest(&mut store, &records).unwrap();

        assert_eq!(report.skipped, 1);
        assert!(matches!(report.warnings[0], Warning::MissingKey { .. }));
        assert_eq!(store.paper_count().unwrap(), 0);
    }

    #[test]
    fn test_parse_failure_does_not_stop_batch() {
        let mut store = store();
        let records = vec![
            record("10.1/a", "Broken", "2020:x"),
            record("10.1/b", "Fine", "2020:1"),
        ];
        let report = Ingestor::new().ingest(&mut store, &records).unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].key.as_deref(), Some("10.1/a"));
        assert_eq!(report.failures[0].error.kind(), ErrorKind::Caller);
    }

    #[test]
    fn test_key_from_earlier_run_rolled_back() {
        let mut store = store();
        Ingestor::new()
            .ingest(&mut store, &[record("10.1/a", "First", "2020:1")])
            .unwrap();

        // A new run does not know the key, so the store rejects it.
        let report = Ingestor::new()
            .ingest(&mut store, &[record("10.1/a", "Again", "2020:5")])
            .unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            KeytrendError::Store(StoreError::Insert { .. })
        ));
        assert_eq!(report.failures[0].error.kind(), ErrorKind::Recoverable);
        assert_eq!(store.paper("10.1/a").unwrap().unwrap().title, "First");
    }

    #[test]
    fn test_unwritable_store_aborts_batch() {
        let mut store = store();
        store
            .connection()
            .pragma_update(None, "query_only", true)
            .unwrap();

        let records = vec![
            record("10.1/a", "First", "2020:1"),
            record("10.1/b", "Second", "2021:2"),
        ];
        let err = Ingestor::new().ingest(&mut store, &records).unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(
            err,
            KeytrendError::Store(StoreError::Insert { ref key, .. }) if key == "10.1/a"
        ));
    }
}
