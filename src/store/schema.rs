//! Relation definitions of the paper store.

use crate::Taxonomy;

pub(crate) const PAPER: &str = "paper";
pub(crate) const CITATION: &str = "citation";
pub(crate) const INDEX_TERM_MEMBERSHIP: &str = "index_term_membership";
pub(crate) const AUTHOR_KEYWORD_MEMBERSHIP: &str = "author_keyword_membership";
pub(crate) const SUBJECT_AREA_MEMBERSHIP: &str = "subject_area_membership";

/// `CREATE` statements in dependency order, paired with the relation name.
pub(crate) const RELATIONS: &[(&str, &str)] = &[
    (
        PAPER,
        "CREATE TABLE IF NOT EXISTS paper (
            key TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER NOT NULL,
            authors_list TEXT NOT NULL,
            abstract TEXT NOT NULL,
            total_citations INTEGER NOT NULL
        )",
    ),
    (
        CITATION,
        "CREATE TABLE IF NOT EXISTS citation (
            key TEXT NOT NULL REFERENCES paper(key),
            year INTEGER NOT NULL,
            number INTEGER NOT NULL,
            PRIMARY KEY (key, year)
        )",
    ),
    (
        INDEX_TERM_MEMBERSHIP,
        "CREATE TABLE IF NOT EXISTS index_term_membership (
            term TEXT NOT NULL,
            key TEXT NOT NULL REFERENCES paper(key),
            PRIMARY KEY (term, key)
        )",
    ),
    (
        AUTHOR_KEYWORD_MEMBERSHIP,
        "CREATE TABLE IF NOT EXISTS author_keyword_membership (
            keyword TEXT NOT NULL,
            key TEXT NOT NULL REFERENCES paper(key),
            PRIMARY KEY (keyword, key)
        )",
    ),
    (
        SUBJECT_AREA_MEMBERSHIP,
        "CREATE TABLE IF NOT EXISTS subject_area_membership (
            area TEXT NOT NULL,
            key TEXT NOT NULL REFERENCES paper(key),
            PRIMARY KEY (area, key)
        )",
    ),
];

/// Membership relation of a taxonomy and the column holding its label.
pub(crate) fn membership_relation(taxonomy: Taxonomy) -> (&'static str, &'static str) {
    match taxonomy {
        Taxonomy::IndexTerm => (INDEX_TERM_MEMBERSHIP, "term"),
        Taxonomy::AuthorKeyword => (AUTHOR_KEYWORD_MEMBERSHIP, "keyword"),
        Taxonomy::SubjectArea => (SUBJECT_AREA_MEMBERSHIP, "area"),
    }
}
