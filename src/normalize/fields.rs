//! Recognized record fields, their aliases and their handlers.
//!
//! Field names are resolved to a [`FieldKind`] through an alias table built
//! once per [`FieldConfig`]; each kind is then applied to the paper draft by
//! the handler registered for it in [`FIELD_HANDLERS`].

use crate::error::{ValueError, fields};
use crate::utils::split_labels;
use crate::{Paper, Taxonomy};
use std::collections::HashMap;
use std::collections::btree_map::Entry;

/// Fields understood by the normalizer.
///
/// The declaration order is the order in which fields are applied, so the
/// identifier fields are always resolved before anything that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKind {
    Doi,
    Eid,
    Title,
    Author,
    Year,
    Abstract,
    PerYearCitations,
    IndexTerms,
    AuthorKeywords,
    SubjectAreas,
}

impl FieldKind {
    /// Canonical field name.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Doi => fields::DOI,
            FieldKind::Eid => fields::EID,
            FieldKind::Title => fields::TITLE,
            FieldKind::Author => fields::AUTHOR,
            FieldKind::Year => fields::YEAR,
            FieldKind::Abstract => fields::ABSTRACT,
            FieldKind::PerYearCitations => fields::PER_YEAR_CITATIONS,
            FieldKind::IndexTerms => fields::INDEX_TERMS,
            FieldKind::AuthorKeywords => fields::AUTHOR_KEYWORDS,
            FieldKind::SubjectAreas => fields::SUBJECT_AREAS,
        }
    }
}

/// Default field-name aliases for each field kind
pub(crate) const DEFAULT_FIELDS: &[(FieldKind, &[&str])] = &[
    (FieldKind::Doi, &["doi"]),
    (FieldKind::Eid, &["eid"]),
    (FieldKind::Title, &["title"]),
    (FieldKind::Author, &["author", "authors"]),
    (FieldKind::Year, &["year"]),
    (FieldKind::Abstract, &["abstract"]),
    (FieldKind::PerYearCitations, &["per_year_citations"]),
    (FieldKind::IndexTerms, &["index_terms"]),
    (FieldKind::AuthorKeywords, &["author_keywords"]),
    (FieldKind::SubjectAreas, &["subject_areas"]),
];

/// Applies the values of one field to a draft.
pub(crate) type FieldHandler = fn(&mut PaperDraft, &[String]) -> Result<(), ValueError>;

/// Handler registered for every field kind.
pub(crate) const FIELD_HANDLERS: &[(FieldKind, FieldHandler)] = &[
    (FieldKind::Doi, apply_doi),
    (FieldKind::Eid, apply_eid),
    (FieldKind::Title, apply_title),
    (FieldKind::Author, apply_author),
    (FieldKind::Year, apply_year),
    (FieldKind::Abstract, apply_abstract),
    (FieldKind::PerYearCitations, apply_citations),
    (FieldKind::IndexTerms, apply_index_terms),
    (FieldKind::AuthorKeywords, apply_author_keywords),
    (FieldKind::SubjectAreas, apply_subject_areas),
];

/// A paper under construction, with both identifier candidates kept apart
/// until the key is resolved.
#[derive(Debug, Default)]
pub(crate) struct PaperDraft {
    pub(crate) doi: Option<String>,
    pub(crate) eid: Option<String>,
    pub(crate) paper: Paper,
}

impl PaperDraft {
    /// First non-empty identifier, DOI before EID.
    pub(crate) fn key(&self) -> Option<&str> {
        self.doi.as_deref().or(self.eid.as_deref())
    }
}

fn first_non_empty(values: &[String]) -> Option<String> {
    values
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(String::from)
}

fn first_or_default(values: &[String]) -> String {
    values.first().cloned().unwrap_or_default()
}

fn apply_doi(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    draft.doi = first_non_empty(values);
    Ok(())
}

fn apply_eid(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    draft.eid = first_non_empty(values);
    Ok(())
}

fn apply_title(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    draft.paper.title = first_or_default(values);
    Ok(())
}

fn apply_author(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    draft.paper.authors = first_or_default(values);
    Ok(())
}

fn apply_abstract(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    draft.paper.abstract_text = first_or_default(values);
    Ok(())
}

fn apply_year(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    let Some(year) = values.first().map(|value| value.trim()) else {
        return Ok(());
    };
    if year.is_empty() {
        return Ok(());
    }
    draft.paper.year = year.parse().map_err(|_| ValueError::BadValue {
        field: fields::YEAR,
        key: fields::YEAR,
        value: year.to_string(),
        reason: "year is not an integer".to_string(),
    })?;
    Ok(())
}

fn apply_citations(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    for value in values {
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (year, count) = parse_citation_token(token)?;
            match draft.paper.citations.entry(year) {
                Entry::Vacant(slot) => {
                    slot.insert(count);
                }
                Entry::Occupied(_) => {
                    return Err(bad_citation(token, "year listed twice"));
                }
            }
        }
    }
    draft.paper.total_citations = draft
        .paper
        .citations
        .values()
        .map(|&count| u64::from(count))
        .sum();
    Ok(())
}

fn apply_index_terms(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    apply_labels(draft, Taxonomy::IndexTerm, values);
    Ok(())
}

fn apply_author_keywords(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    apply_labels(draft, Taxonomy::AuthorKeyword, values);
    Ok(())
}

fn apply_subject_areas(draft: &mut PaperDraft, values: &[String]) -> Result<(), ValueError> {
    apply_labels(draft, Taxonomy::SubjectArea, values);
    Ok(())
}

fn apply_labels(draft: &mut PaperDraft, taxonomy: Taxonomy, values: &[String]) {
    let labels = draft.paper.labels_mut(taxonomy);
    for value in values {
        labels.extend(split_labels(value));
    }
}

/// Parse one `year:count` token.
pub(crate) fn parse_citation_token(token: &str) -> Result<(i32, u32), ValueError> {
    let (year, count) = token
        .split_once(':')
        .ok_or_else(|| bad_citation(token, "expected year:count"))?;
    let year = year
        .trim()
        .parse()
        .map_err(|_| bad_citation(token, "year is not an integer"))?;
    let count = count
        .trim()
        .parse()
        .map_err(|_| bad_citation(token, "count is not a non-negative integer"))?;
    Ok((year, count))
}

fn bad_citation(token: &str, reason: &str) -> ValueError {
    ValueError::BadValue {
        field: fields::PER_YEAR_CITATIONS,
        key: fields::PER_YEAR_CITATIONS,
        value: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Field-name aliases for each recognized field kind.
///
/// # Examples
///
/// ```
/// use keytrend::FieldConfig;
/// use keytrend::normalize::FieldKind;
///
/// let mut config = FieldConfig::new();
/// config.add_field_aliases(FieldKind::Doi, vec!["DI".to_string()]);
/// assert_eq!(config.kind_for("di"), Some(FieldKind::Doi));
/// ```
#[derive(Debug, Clone)]
pub struct FieldConfig {
    /// Aliases per field kind
    pub(crate) alias_map: HashMap<FieldKind, Vec<String>>,
    /// Reverse lookup map for O(1) name-to-kind mapping
    pub(crate) reverse_map: HashMap<String, FieldKind>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldConfig {
    /// Creates a configuration with the default aliases
    #[must_use]
    pub fn new() -> Self {
        let mut config = Self {
            alias_map: HashMap::new(),
            reverse_map: HashMap::new(),
        };
        for (kind, aliases) in DEFAULT_FIELDS {
            config
                .alias_map
                .insert(*kind, aliases.iter().map(|s| s.to_string()).collect());
        }
        config.rebuild_reverse_map();
        config
    }

    /// Rebuild the reverse lookup map after alias changes
    fn rebuild_reverse_map(&mut self) {
        self.reverse_map.clear();
        for (kind, aliases) in &self.alias_map {
            for alias in aliases {
                self.reverse_map.insert(alias.to_lowercase(), *kind);
            }
        }
    }

    /// Replaces the aliases of a field kind
    pub fn set_field_aliases(&mut self, kind: FieldKind, aliases: Vec<String>) -> &mut Self {
        self.alias_map.insert(kind, aliases);
        self.rebuild_reverse_map();
        self
    }

    /// Adds aliases to a field kind
    pub fn add_field_aliases(&mut self, kind: FieldKind, aliases: Vec<String>) -> &mut Self {
        self.alias_map.entry(kind).or_default().extend(aliases);
        self.rebuild_reverse_map();
        self
    }

    /// Finds the field kind for a field name, case-insensitively
    pub fn kind_for(&self, name: &str) -> Option<FieldKind> {
        self.reverse_map.get(&name.to_lowercase()).copied()
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        let mut owners: HashMap<String, FieldKind> = HashMap::new();
        for (kind, aliases) in &self.alias_map {
            for alias in aliases {
                if alias.is_empty() {
                    return Err(format!("Empty alias found for field '{}'", kind.name()));
                }
                let alias_lower = alias.to_lowercase();
                if let Some(existing) = owners.get(&alias_lower)
                    && existing != kind
                {
                    return Err(format!(
                        "Alias '{}' is mapped to both '{}' and '{}'",
                        alias,
                        existing.name(),
                        kind.name()
                    ));
                }
                owners.insert(alias_lower, *kind);
            }
        }
        Ok(())
    }
}
