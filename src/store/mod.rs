//! SQLite persistence of papers, yearly citations and keyword memberships.
//!
//! Every paper is written together with its citation and membership rows in
//! one transaction, so a paper is never visible without its siblings.
//!
//! # Example
//!
//! ```
//! use keytrend::{Paper, PaperStore};
//!
//! let mut store = PaperStore::open_in_memory().unwrap();
//! store.create_schema().unwrap();
//!
//! let mut paper = Paper::new();
//! paper.key = "10.1/a".to_string();
//! paper.year = 2020;
//! paper.citations.insert(2021, 4);
//! paper.total_citations = 4;
//! paper.index_terms.insert("graphs".into());
//! store.insert_paper(&paper).unwrap();
//!
//! let found = store.papers_by_keyword("graphs").unwrap();
//! assert_eq!(found, vec![paper]);
//! ```

mod schema;

use crate::aggregate::{KeywordMembership, MembershipSource};
use crate::error::StoreError;
use crate::{Paper, Taxonomy};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use schema::{CITATION, PAPER, RELATIONS, membership_relation};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PAPER_COLUMNS: &str = "key, title, year, authors_list, abstract, total_citations";

/// Relational store of the corpus.
#[derive(Debug)]
pub struct PaperStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl PaperStore {
    /// Open (or create) a store backed by a database file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Open` when the file cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| StoreError::Open {
            path: path.clone(),
            source,
        };
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(open_err)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(open_err)?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let open_err = |source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        };
        let conn = Connection::open_in_memory().map_err(open_err)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(open_err)?;
        Ok(Self { conn, path: None })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Path of the database file, `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create the relations that do not exist yet.
    ///
    /// Safe to call on an already initialised store.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        for &(relation, ddl) in RELATIONS {
            self.conn
                .execute(ddl, [])
                .map_err(|source| StoreError::Schema { relation, source })?;
        }
        info!(path = ?self.path, "paper store schema ready");
        Ok(())
    }

    /// Insert a paper with its citations and keyword memberships.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Insert` naming the relation that rejected a row,
    /// e.g. on a duplicate key. Nothing of the paper is kept in that case.
    /// The error is fatal unless it is a constraint violation.
    pub fn insert_paper(&mut self, paper: &Paper) -> Result<(), StoreError> {
        let key = paper.key.as_str();
        let insert_err = |relation: &'static str| {
            move |source| StoreError::Insert {
                key: key.to_string(),
                relation,
                source,
            }
        };

        // Dropping the transaction on an early return rolls it back.
        let tx = self.conn.transaction().map_err(insert_err(PAPER))?;

        tx.execute(
            "INSERT INTO paper (key, title, year, authors_list, abstract, total_citations) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                paper.title,
                paper.year,
                paper.authors,
                paper.abstract_text,
                paper.total_citations
            ],
        )
        .map_err(insert_err(PAPER))?;

        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO citation (key, year, number) VALUES (?1, ?2, ?3)")
                .map_err(insert_err(CITATION))?;
            for (year, number) in &paper.citations {
                stmt.execute(params![key, year, number])
                    .map_err(insert_err(CITATION))?;
            }
        }

        for taxonomy in Taxonomy::ALL {
            let (relation, column) = membership_relation(taxonomy);
            let mut stmt = tx
                .prepare_cached(&format!(
                    "INSERT INTO {relation} ({column}, key) VALUES (?1, ?2)"
                ))
                .map_err(insert_err(relation))?;
            for label in paper.labels(taxonomy) {
                stmt.execute(params![label.as_str(), key])
                    .map_err(insert_err(relation))?;
            }
        }

        tx.commit().map_err(insert_err(PAPER))?;
        debug!(key, citations = paper.citations.len(), "inserted paper");
        Ok(())
    }

    /// Every paper carrying `keyword` in any taxonomy, fully populated.
    ///
    /// Papers are returned once each, newest first.
    pub fn papers_by_keyword(&self, keyword: &str) -> Result<Vec<Paper>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!(
                "SELECT {PAPER_COLUMNS} FROM paper WHERE key IN (
                    SELECT key FROM index_term_membership WHERE term = ?1
                    UNION SELECT key FROM author_keyword_membership WHERE keyword = ?1
                    UNION SELECT key FROM subject_area_membership WHERE area = ?1
                ) ORDER BY year DESC, key"
            ))
            .map_err(StoreError::query(PAPER))?;
        let papers = stmt
            .query_map(params![keyword], paper_from_row)
            .map_err(StoreError::query(PAPER))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::query(PAPER))?;

        papers
            .into_iter()
            .map(|paper| self.with_details(paper))
            .collect()
    }

    /// Fetch one fully populated paper by key.
    pub fn paper(&self, key: &str) -> Result<Option<Paper>, StoreError> {
        let paper = self
            .conn
            .query_row(
                &format!("SELECT {PAPER_COLUMNS} FROM paper WHERE key = ?1"),
                params![key],
                paper_from_row,
            )
            .optional()
            .map_err(StoreError::query(PAPER))?;
        paper.map(|paper| self.with_details(paper)).transpose()
    }

    /// Number of stored papers.
    pub fn paper_count(&self) -> Result<usize, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM paper", [], |row| row.get(0))
            .map_err(StoreError::query(PAPER))
    }

    /// Every keyword membership of every taxonomy, joined with the paper's
    /// publication year and yearly citations.
    pub fn all_keyword_memberships(&self) -> Result<Vec<KeywordMembership>, StoreError> {
        let citations = self.all_citations()?;
        let mut memberships = Vec::new();
        for taxonomy in Taxonomy::ALL {
            let (relation, column) = membership_relation(taxonomy);
            let mut stmt = self
                .conn
                .prepare_cached(&format!(
                    "SELECT m.{column}, m.key, p.year FROM {relation} m \
                     JOIN paper p ON p.key = m.key ORDER BY m.{column}, m.key"
                ))
                .map_err(StoreError::query(relation))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get(2)?))
                })
                .map_err(StoreError::query(relation))?;
            for row in rows {
                let (keyword, key, publication_year) = row.map_err(StoreError::query(relation))?;
                let paper_citations = citations.get(&key).cloned().unwrap_or_default();
                memberships.push(KeywordMembership {
                    taxonomy,
                    keyword,
                    key,
                    publication_year,
                    citations: paper_citations,
                });
            }
        }
        Ok(memberships)
    }

    /// Memberships of one literal keyword across all taxonomies.
    pub fn keyword_memberships(&self, keyword: &str) -> Result<Vec<KeywordMembership>, StoreError> {
        let mut memberships = Vec::new();
        for taxonomy in Taxonomy::ALL {
            let (relation, column) = membership_relation(taxonomy);
            let mut stmt = self
                .conn
                .prepare_cached(&format!(
                    "SELECT m.key, p.year FROM {relation} m \
                     JOIN paper p ON p.key = m.key WHERE m.{column} = ?1 ORDER BY m.key"
                ))
                .map_err(StoreError::query(relation))?;
            let rows = stmt
                .query_map(params![keyword], |row| {
                    Ok((row.get::<_, String>(0)?, row.get(1)?))
                })
                .map_err(StoreError::query(relation))?
                .collect::<Result<Vec<(String, i32)>, _>>()
                .map_err(StoreError::query(relation))?;
            for (key, publication_year) in rows {
                let citations = self.citations_of(&key)?;
                memberships.push(KeywordMembership {
                    taxonomy,
                    keyword: keyword.to_string(),
                    key,
                    publication_year,
                    citations,
                });
            }
        }
        Ok(memberships)
    }

    fn all_citations(&self) -> Result<HashMap<String, Vec<(i32, u32)>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key, year, number FROM citation ORDER BY key, year")
            .map_err(StoreError::query(CITATION))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(StoreError::query(CITATION))?;
        let mut citations: HashMap<String, Vec<(i32, u32)>> = HashMap::new();
        for row in rows {
            let (key, year, number) = row.map_err(StoreError::query(CITATION))?;
            citations.entry(key).or_default().push((year, number));
        }
        Ok(citations)
    }

    fn citations_of(&self, key: &str) -> Result<Vec<(i32, u32)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT year, number FROM citation WHERE key = ?1 ORDER BY year")
            .map_err(StoreError::query(CITATION))?;
        stmt.query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(StoreError::query(CITATION))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::query(CITATION))
    }

    /// Fill in citations and all three label sets.
    fn with_details(&self, mut paper: Paper) -> Result<Paper, StoreError> {
        paper.citations = self.citations_of(&paper.key)?.into_iter().collect();
        for taxonomy in Taxonomy::ALL {
            let (relation, column) = membership_relation(taxonomy);
            let mut stmt = self
                .conn
                .prepare_cached(&format!(
                    "SELECT {column} FROM {relation} WHERE key = ?1 ORDER BY {column}"
                ))
                .map_err(StoreError::query(relation))?;
            let labels = stmt
                .query_map(params![paper.key], |row| row.get::<_, String>(0))
                .map_err(StoreError::query(relation))?;
            let set = paper.labels_mut(taxonomy);
            for label in labels {
                set.insert(label.map_err(StoreError::query(relation))?.into());
            }
        }
        Ok(paper)
    }
}

impl MembershipSource for PaperStore {
    fn memberships(&self) -> Result<Vec<KeywordMembership>, StoreError> {
        self.all_keyword_memberships()
    }

    fn memberships_of(&self, keyword: &str) -> Result<Vec<KeywordMembership>, StoreError> {
        self.keyword_memberships(keyword)
    }
}

fn paper_from_row(row: &Row<'_>) -> rusqlite::Result<Paper> {
    Ok(Paper {
        key: row.get(0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        authors: row.get(3)?,
        abstract_text: row.get(4)?,
        total_citations: row.get(5)?,
        ..Paper::default()
    })
}
