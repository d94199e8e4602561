//! Keyword aggregation.
//!
//! Folds the keyword memberships of the store into one [`KeywordRecord`] per
//! distinct keyword string. A word found in several taxonomies gives a single
//! record whose taxonomy set names all of them.
//!
//! # Example
//!
//! ```
//! use keytrend::{KeywordAggregator, KeywordMembership, Taxonomy};
//!
//! let memberships = vec![KeywordMembership {
//!     taxonomy: Taxonomy::IndexTerm,
//!     keyword: "ai".to_string(),
//!     key: "10.1/a".to_string(),
//!     publication_year: 2020,
//!     citations: vec![(2020, 1), (2021, 3)],
//! }];
//!
//! let aggregated = KeywordAggregator::new(2023).aggregate_all(&memberships).unwrap();
//! assert_eq!(aggregated.records["ai"].total_citations, 4);
//! ```

use crate::Taxonomy;
use crate::config::TrendConfig;
use crate::error::{StoreError, Warning};
use crate::stats::{self, ZTrend};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// One (keyword, paper) membership joined with the paper's publication year
/// and its citations per year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMembership {
    pub taxonomy: Taxonomy,
    pub keyword: String,
    pub key: String,
    pub publication_year: i32,
    /// `(year, count)` citation facts of the paper
    pub citations: Vec<(i32, u32)>,
}

/// Anything that can feed keyword memberships to the aggregator.
///
/// Implemented by [`crate::PaperStore`] and by in-memory membership lists.
pub trait MembershipSource {
    /// Every membership of every taxonomy.
    fn memberships(&self) -> Result<Vec<KeywordMembership>, StoreError>;

    /// Memberships of one literal keyword.
    fn memberships_of(&self, keyword: &str) -> Result<Vec<KeywordMembership>, StoreError> {
        let mut memberships = self.memberships()?;
        memberships.retain(|m| m.keyword == keyword);
        Ok(memberships)
    }
}

impl MembershipSource for [KeywordMembership] {
    fn memberships(&self) -> Result<Vec<KeywordMembership>, StoreError> {
        Ok(self.to_vec())
    }
}

impl MembershipSource for Vec<KeywordMembership> {
    fn memberships(&self) -> Result<Vec<KeywordMembership>, StoreError> {
        self.as_slice().memberships()
    }
}

/// Aggregated statistics of one keyword, or of a union of keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordRecord {
    /// The keyword, or the joined label of a union
    pub word: String,
    /// Taxonomies the keyword was found in
    pub taxonomies: BTreeSet<Taxonomy>,
    /// Citations received per calendar year, summed over all papers
    pub year_to_citations: BTreeMap<i32, u64>,
    /// Sum of `year_to_citations`
    pub total_citations: u64,
    /// Recent citation activity against the yearly mean
    pub z_score: f64,
    /// Keys of the papers carrying the keyword
    pub papers: BTreeSet<String>,
    /// Paper keys by publication year
    pub year_to_papers: BTreeMap<i32, BTreeSet<String>>,
    /// Citations landing in a year on papers published one or two years
    /// earlier; the numerator of the impact factor
    pub year_to_impact_citations: BTreeMap<i32, u64>,
}

impl KeywordRecord {
    /// An empty record for `word`.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    /// Add one membership. A paper already counted for this keyword only
    /// contributes its taxonomy.
    pub fn add_membership(&mut self, membership: &KeywordMembership) {
        self.taxonomies.insert(membership.taxonomy);
        if !self.papers.insert(membership.key.clone()) {
            return;
        }

        let published = membership.publication_year;
        self.year_to_papers
            .entry(published)
            .or_default()
            .insert(membership.key.clone());

        for &(year, count) in &membership.citations {
            let count = u64::from(count);
            *self.year_to_citations.entry(year).or_default() += count;
            self.total_citations += count;
            if matches!(i64::from(year) - i64::from(published), 1 | 2) {
                *self.year_to_impact_citations.entry(year).or_default() += count;
            }
        }
    }

    /// Merge another record into this one, year by year.
    ///
    /// The per-year maps are summed even for papers both records share, so
    /// a shared paper's citations count twice.
    pub fn merge(&mut self, other: &KeywordRecord) {
        self.taxonomies.extend(other.taxonomies.iter().copied());
        for (&year, &count) in &other.year_to_citations {
            *self.year_to_citations.entry(year).or_default() += count;
        }
        for (&year, &count) in &other.year_to_impact_citations {
            *self.year_to_impact_citations.entry(year).or_default() += count;
        }
        for (&year, keys) in &other.year_to_papers {
            self.year_to_papers
                .entry(year)
                .or_default()
                .extend(keys.iter().cloned());
        }
        self.papers.extend(other.papers.iter().cloned());
        self.total_citations += other.total_citations;
    }

    /// Recompute the z-score against `reference_year`.
    pub fn refresh_z_score(&mut self, reference_year: i32) -> Option<Warning> {
        let (z_score, warning) = stats::z_score(self, reference_year);
        self.z_score = z_score;
        if let Some(warning) = &warning {
            warn!(word = %self.word, "{warning}");
        }
        warning
    }

    /// Impact factor of the keyword in `year`.
    pub fn impact_factor(&self, year: i32) -> f64 {
        stats::impact_factor(self, year)
    }

    /// Trend label of the current z-score.
    pub fn trend(&self) -> ZTrend {
        ZTrend::from_z(self.z_score)
    }
}

/// The outcome of an aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    /// Records by keyword
    pub records: BTreeMap<String, KeywordRecord>,
    /// Data-quality warnings raised while scoring
    pub warnings: Vec<Warning>,
}

/// Builds keyword records from a [`MembershipSource`].
#[derive(Debug, Clone, Copy)]
pub struct KeywordAggregator {
    reference_year: i32,
}

impl KeywordAggregator {
    /// Aggregator scoring against `reference_year`.
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    /// Aggregator using the reference year of a configuration.
    pub fn from_config(config: &TrendConfig) -> Self {
        Self::new(config.reference_year())
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Aggregate every keyword of the source.
    pub fn aggregate_all<S>(&self, source: &S) -> Result<Aggregated, StoreError>
    where
        S: MembershipSource + ?Sized,
    {
        let memberships = source.memberships()?;
        let aggregated = self.fold(&memberships, "*");
        info!(
            memberships = memberships.len(),
            keywords = aggregated.records.len(),
            "aggregated keyword citations"
        );
        Ok(aggregated)
    }

    /// Aggregate a single keyword, giving the record the full pass would
    /// give for it.
    pub fn aggregate_keyword<S>(&self, source: &S, keyword: &str) -> Result<Aggregated, StoreError>
    where
        S: MembershipSource + ?Sized,
    {
        let memberships = source.memberships_of(keyword)?;
        Ok(self.fold(&memberships, keyword))
    }

    fn fold(&self, memberships: &[KeywordMembership], query: &str) -> Aggregated {
        let mut records: BTreeMap<String, KeywordRecord> = BTreeMap::new();
        for membership in memberships {
            records
                .entry(membership.keyword.clone())
                .or_insert_with(|| KeywordRecord::new(&membership.keyword))
                .add_membership(membership);
        }

        let mut warnings: Vec<Warning> = records
            .values_mut()
            .filter_map(|record| record.refresh_z_score(self.reference_year))
            .collect();

        if records.values().all(|record| record.total_citations == 0) {
            let warning = Warning::EmptyResult {
                query: query.to_string(),
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        Aggregated { records, warnings }
    }
}
