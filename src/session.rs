//! Keyword queries over a cached working set.
//!
//! A [`KeywordSession`] owns the aggregated keyword records. The first search
//! runs a full aggregation pass over the store and caches the result; later
//! searches, unions and removals work on that cache only, so store changes
//! made afterwards stay invisible until [`KeywordSession::reset`].

use crate::Taxonomy;
use crate::aggregate::{KeywordAggregator, KeywordRecord, MembershipSource};
use crate::config::TrendConfig;
use crate::error::{CallerError, Result, Warning};
use crate::regex::Regex;
use crate::utils::truncate_label;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use strsim::jaro_winkler;
use tracing::{debug, warn};

/// Records matching a search, most cited first.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults<'a> {
    pub records: Vec<&'a KeywordRecord>,
    /// Set when the search matched nothing or the pattern was invalid
    pub warning: Option<Warning>,
}

impl<'a> SearchResults<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a KeywordRecord> + '_ {
        self.records.iter().copied()
    }

    /// Keep the records found in at least one of `taxonomies`.
    #[must_use]
    pub fn only(mut self, taxonomies: &[Taxonomy]) -> Self {
        self.records
            .retain(|record| taxonomies.iter().any(|t| record.taxonomies.contains(t)));
        self
    }

    /// Keep at most `n` records.
    #[must_use]
    pub fn top(mut self, n: usize) -> Self {
        self.records.truncate(n);
        self
    }

    pub fn words(&self) -> Vec<&'a str> {
        self.records.iter().map(|record| record.word.as_str()).collect()
    }
}

/// The query layer: search, union, lookup and removal of keyword records.
///
/// # Examples
///
/// ```
/// use keytrend::{KeywordMembership, KeywordSession, Taxonomy, TrendConfig};
///
/// let corpus = vec![
///     KeywordMembership {
///         taxonomy: Taxonomy::IndexTerm,
///         keyword: "quantum".to_string(),
///         key: "10.1/a".to_string(),
///         publication_year: 2020,
///         citations: vec![(2021, 4)],
///     },
///     KeywordMembership {
///         taxonomy: Taxonomy::IndexTerm,
///         keyword: "optics".to_string(),
///         key: "10.1/b".to_string(),
///         publication_year: 2021,
///         citations: vec![(2022, 2)],
///     },
/// ];
///
/// let mut session = KeywordSession::new(TrendConfig::new().with_reference_year(2023));
/// assert_eq!(session.search(&corpus, "quant").unwrap().words(), vec!["quantum"]);
///
/// let union = session.union(&["quantum", "optics"]).unwrap();
/// assert_eq!(union.word, "quantum, optics");
/// assert_eq!(union.total_citations, 6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeywordSession {
    config: TrendConfig,
    records: Option<BTreeMap<String, KeywordRecord>>,
    warnings: Vec<Warning>,
}

impl KeywordSession {
    pub fn new(config: TrendConfig) -> Self {
        Self {
            config,
            records: None,
            warnings: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Whether the working set has been built.
    pub fn is_built(&self) -> bool {
        self.records.is_some()
    }

    /// Warnings raised when the working set was built.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of records in the working set.
    pub fn len(&self) -> usize {
        self.records.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the working set; the next search aggregates again.
    pub fn reset(&mut self) {
        self.records = None;
        self.warnings.clear();
    }

    /// Build the working set from `source` unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns the store error when the memberships cannot be read.
    pub fn build<S>(&mut self, source: &S) -> Result<&BTreeMap<String, KeywordRecord>>
    where
        S: MembershipSource + ?Sized,
    {
        if self.records.is_none() {
            let aggregated = KeywordAggregator::from_config(&self.config).aggregate_all(source)?;
            self.warnings = aggregated.warnings;
            self.records = Some(aggregated.records);
        }
        Ok(self.records.get_or_insert_default())
    }

    /// Records whose keyword matches `pattern` anywhere, most cited first.
    ///
    /// An invalid pattern is not an error: the results are empty and carry
    /// [`Warning::InvalidPattern`].
    pub fn search<S>(&mut self, source: &S, pattern: &str) -> Result<SearchResults<'_>>
    where
        S: MembershipSource + ?Sized,
    {
        let records = self.build(source)?;

        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(err) => {
                let warning = Warning::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: err.to_string(),
                };
                warn!("{warning}");
                return Ok(SearchResults {
                    records: Vec::new(),
                    warning: Some(warning),
                });
            }
        };

        let matches: Vec<&KeywordRecord> = records
            .values()
            .filter(|record| regex.is_match(&record.word))
            .sorted_by(|a, b| {
                b.total_citations
                    .cmp(&a.total_citations)
                    .then_with(|| a.word.cmp(&b.word))
            })
            .collect();

        let warning = matches.is_empty().then(|| Warning::EmptyResult {
            query: pattern.to_string(),
        });
        if let Some(warning) = &warning {
            warn!("{warning}");
        }
        debug!(pattern, matches = matches.len(), "keyword search");

        Ok(SearchResults {
            records: matches,
            warning,
        })
    }

    /// Exact-match retrieval from the working set.
    ///
    /// # Errors
    ///
    /// Returns `CallerError::UnknownKeyword` when `word` is not cached.
    pub fn lookup(&self, word: &str) -> Result<&KeywordRecord> {
        self.records
            .as_ref()
            .and_then(|records| records.get(word))
            .ok_or_else(|| self.unknown(word).into())
    }

    /// Remove one record from the working set and return it.
    ///
    /// # Errors
    ///
    /// Returns `CallerError::UnknownKeyword` when `word` is not cached.
    pub fn remove(&mut self, word: &str) -> Result<KeywordRecord> {
        if let Some(record) = self.records.as_mut().and_then(|records| records.remove(word)) {
            debug!(word, "removed keyword record");
            return Ok(record);
        }
        Err(self.unknown(word).into())
    }

    /// Merge two or more cached records into a synthetic one.
    ///
    /// The label joins the words and is truncated to the configured budget.
    /// Per-year counts are summed, so a paper shared by two of the words
    /// counts once per word. The result joins the working set, replacing a
    /// record with the same label, and is never written to the store.
    ///
    /// # Errors
    ///
    /// Returns `CallerError::UnionTooSmall` for fewer than two distinct
    /// words and `CallerError::UnknownKeyword` for a word that is not cached.
    pub fn union(&mut self, words: &[&str]) -> Result<&KeywordRecord> {
        let words: Vec<&str> = words.iter().copied().unique().collect();
        if words.len() < 2 {
            return Err(CallerError::UnionTooSmall { given: words.len() }.into());
        }

        let label = truncate_label(
            &words.join(self.config.union_separator()),
            self.config.union_label_budget(),
        );
        let mut merged = KeywordRecord::new(label.clone());
        for word in &words {
            match self.records.as_ref().and_then(|records| records.get(*word)) {
                Some(record) => merged.merge(record),
                None => return Err(self.unknown(word).into()),
            }
        }
        merged.refresh_z_score(self.config.reference_year());
        debug!(label = %label, parts = words.len(), "built keyword union");

        let records = self.records.get_or_insert_default();
        let record = match records.entry(label) {
            Entry::Occupied(mut entry) => {
                entry.insert(merged);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(merged),
        };
        Ok(record)
    }

    /// Cached keywords close to `word`, most similar first.
    pub fn suggest(&self, word: &str) -> Vec<String> {
        let Some(records) = &self.records else {
            return Vec::new();
        };
        records
            .keys()
            .map(|candidate| (jaro_winkler(word, candidate), candidate))
            .filter(|(score, _)| *score >= self.config.suggestion_threshold)
            .sorted_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)))
            .take(self.config.suggestion_limit)
            .map(|(_, candidate)| candidate.clone())
            .collect()
    }

    fn unknown(&self, word: &str) -> CallerError {
        CallerError::UnknownKeyword {
            word: word.to_string(),
            suggestions: self.suggest(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeywordMembership;
    use crate::error::KeytrendError;
    use pretty_assertions::assert_eq;

    fn membership(
        taxonomy: Taxonomy,
        keyword: &str,
        key: &str,
        year: i32,
        citations: &[(i32, u32)],
    ) -> KeywordMembership {
        KeywordMembership {
            taxonomy,
            keyword: keyword.to_string(),
            key: key.to_string(),
            publication_year: year,
            citations: citations.to_vec(),
        }
    }

    fn corpus() -> Vec<KeywordMembership> {
        vec![
            membership(Taxonomy::IndexTerm, "quantum", "a", 2020, &[(2021, 4)]),
            membership(Taxonomy::IndexTerm, "quantization", "b", 2021, &[(2022, 9)]),
            membership(Taxonomy::AuthorKeyword, "quantum", "c", 2021, &[(2022, 1)]),
            membership(Taxonomy::SubjectArea, "physics", "a", 2020, &[(2021, 4)]),
            membership(Taxonomy::AuthorKeyword, "antiquant", "d", 2019, &[(2020, 2)]),
        ]
    }

    fn session() -> KeywordSession {
        KeywordSession::new(TrendConfig::new().with_reference_year(2023))
    }

    #[test]
    fn test_search_anchored_prefix() {
        let mut session = session();
        let results = session.search(&corpus(), "^quant").unwrap();
        assert_eq!(results.words(), vec!["quantization", "quantum"]);
        assert_eq!(results.warning, None);
    }

    #[test]
    fn test_search_unanchored_substring() {
        let mut session = session();
        let results = session.search(&corpus(), "quant").unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().any(|r| r.word == "antiquant"));
    }

    #[test]
    fn test_search_invalid_pattern() {
        let mut session = session();
        let results = session.search(&corpus(), "((").unwrap();
        assert!(results.is_empty());
        assert!(matches!(
            results.warning,
            Some(Warning::InvalidPattern { ref pattern, .. }) if pattern == "(("
        ));
    }

    #[test]
    fn test_search_empty_result_warns() {
        let mut session = session();
        let results = session.search(&corpus(), "^zzz").unwrap();
        assert!(results.is_empty());
        assert_eq!(
            results.warning,
            Some(Warning::EmptyResult {
                query: "^zzz".to_string()
            })
        );
    }

    #[test]
    fn test_search_taxonomy_filter_and_cap() {
        let mut session = session();
        let results = session
            .search(&corpus(), "")
            .unwrap()
            .only(&[Taxonomy::AuthorKeyword, Taxonomy::SubjectArea]);
        assert_eq!(results.words(), vec!["quantum", "physics", "antiquant"]);
        assert_eq!(results.top(1).words(), vec!["quantum"]);
    }

    #[test]
    fn test_cache_ignores_later_source_changes_until_reset() {
        let mut session = session();
        let mut source = corpus();
        session.search(&source, "").unwrap();
        assert!(session.is_built());

        source.push(membership(Taxonomy::IndexTerm, "optics", "e", 2020, &[]));
        assert!(session.search(&source, "optics").unwrap().is_empty());

        session.reset();
        assert!(!session.is_built());
        assert_eq!(session.search(&source, "optics").unwrap().len(), 1);
    }

    #[test]
    fn test_union_sums_disjoint_records() {
        let mut session = session();
        session.build(&corpus()).unwrap();

        let union = session.union(&["quantization", "physics"]).unwrap();
        assert_eq!(union.word, "quantization, physics");
        assert_eq!(union.total_citations, 9 + 4);
        assert_eq!(union.year_to_citations, BTreeMap::from([(2021, 4), (2022, 9)]));
        assert_eq!(union.taxonomies.len(), 2);

        // The union joins the working set.
        let found = session.search(&corpus(), "physics").unwrap();
        assert_eq!(found.words(), vec!["quantization, physics", "physics"]);
    }

    #[test]
    fn test_union_double_counts_shared_papers() {
        let mut session = session();
        session.build(&corpus()).unwrap();

        // Paper "a" carries both words; its 2021 citations are summed twice.
        let union = session.union(&["quantum", "physics"]).unwrap();
        assert_eq!(union.year_to_citations[&2021], 4 + 4);
        assert_eq!(union.total_citations, 5 + 4);
        assert_eq!(union.papers.len(), 2);
    }

    #[test]
    fn test_union_label_truncated() {
        let mut config = TrendConfig::new().with_reference_year(2023);
        config.set_union_label_budget(10);
        let mut session = KeywordSession::new(config);
        session.build(&corpus()).unwrap();

        let union = session.union(&["quantization", "quantum"]).unwrap();
        assert_eq!(union.word, "quantizati...");
        assert!(session.lookup("quantizati...").is_ok());
    }

    #[test]
    fn test_union_too_small() {
        let mut session = session();
        session.build(&corpus()).unwrap();
        let err = session.union(&["quantum"]).unwrap_err();
        assert!(matches!(
            err,
            KeytrendError::Caller(CallerError::UnionTooSmall { given: 1 })
        ));
    }

    #[test]
    fn test_union_of_repeated_word_is_too_small() {
        let mut session = session();
        session.build(&corpus()).unwrap();
        let err = session.union(&["quantum", "quantum"]).unwrap_err();
        assert!(matches!(
            err,
            KeytrendError::Caller(CallerError::UnionTooSmall { given: 1 })
        ));
        assert_eq!(session.len(), 4);

        // Repeats beside two distinct words are merged once.
        let union = session.union(&["quantum", "physics", "quantum"]).unwrap();
        assert_eq!(union.word, "quantum, physics");
        assert_eq!(union.total_citations, 5 + 4);
    }

    #[test]
    fn test_union_unknown_word() {
        let mut session = session();
        session.build(&corpus()).unwrap();
        let err = session.union(&["quantum", "biology"]).unwrap_err();
        assert!(matches!(
            err,
            KeytrendError::Caller(CallerError::UnknownKeyword { ref word, .. }) if word == "biology"
        ));
    }

    #[test]
    fn test_lookup_and_remove() {
        let mut session = session();
        session.build(&corpus()).unwrap();

        assert_eq!(session.lookup("quantum").unwrap().total_citations, 5);
        let removed = session.remove("quantum").unwrap();
        assert_eq!(removed.word, "quantum");
        assert_eq!(session.len(), 3);

        let err = session.lookup("quantum").unwrap_err();
        assert!(matches!(err, KeytrendError::Caller(CallerError::UnknownKeyword { .. })));
        assert!(session.remove("quantum").is_err());
    }

    #[test]
    fn test_lookup_before_build_fails() {
        let session = session();
        assert!(session.lookup("quantum").is_err());
        assert!(session.suggest("quantum").is_empty());
    }

    #[test]
    fn test_unknown_keyword_suggestions() {
        let mut session = session();
        session.build(&corpus()).unwrap();

        let err = session.lookup("quantom").unwrap_err();
        match err {
            KeytrendError::Caller(CallerError::UnknownKeyword { suggestions, .. }) => {
                assert_eq!(suggestions.first().map(String::as_str), Some("quantum"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
