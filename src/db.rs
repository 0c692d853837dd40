use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::dedup::{fingerprint, DedupPolicy};
use crate::error::StoreError;
use crate::parser::Candidate;

pub type ArticleId = i64;
pub type NoteId = i64;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ARTICLE_COLUMNS: &str = "id, title, link, saved, note_id, fingerprint, created_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub link: Option<String>,
    pub saved: bool,
    pub note_id: Option<NoteId>,
    #[serde(skip)]
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied content of a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteFields {
    pub title: String,
    pub body: String,
}

/// An article with its note reference resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleWithNote {
    #[serde(flatten)]
    pub article: Article,
    pub note: Option<Note>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub articles: usize,
    pub saved: usize,
    pub notes: usize,
    pub orphan_notes: usize,
}

/// SQLite-backed article and note collections.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!("Opened store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Close the connection, surfacing any error SQLite reports on shutdown.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    // ── Scrape results ──

    /// Write one scrape's candidates and return how many new articles were created.
    ///
    /// Runs as one write-locked transaction. Under [`DedupPolicy::Fingerprint`] a
    /// candidate whose fingerprint is already stored refreshes that article's
    /// title/link and leaves its id, saved flag and note alone.
    pub fn upsert_all(
        &self,
        candidates: &[Candidate],
        base: Option<&Url>,
        policy: DedupPolicy,
    ) -> Result<usize, StoreError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let mut inserted = 0;
        let mut refreshed = 0;
        {
            let mut insert = tx.prepare(
                "INSERT INTO articles (title, link, saved, fingerprint, created_at)
                 VALUES (?1, ?2, 0, ?3, ?4)",
            )?;
            let mut refresh =
                tx.prepare("UPDATE articles SET title = ?2, link = ?3 WHERE fingerprint = ?1")?;
            let now = Utc::now();

            for c in candidates {
                let fp = fingerprint(c, base);
                if policy == DedupPolicy::Fingerprint {
                    let changed = refresh.execute(params![fp, c.title, c.link])?;
                    if changed > 0 {
                        refreshed += 1;
                        continue;
                    }
                }
                inserted += insert.execute(params![c.title, c.link, fp, now])?;
            }
        }
        tx.commit()?;
        info!(
            "Stored {} candidates ({} new, {} refreshed)",
            candidates.len(),
            inserted,
            refreshed
        );
        Ok(inserted)
    }

    // ── Reads ──

    pub fn list_unsaved(&self) -> Result<Vec<Article>, StoreError> {
        self.query_articles(&format!(
            "SELECT {} FROM articles WHERE saved = 0 ORDER BY id",
            ARTICLE_COLUMNS
        ))
    }

    pub fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        self.query_articles(&format!(
            "SELECT {} FROM articles ORDER BY id",
            ARTICLE_COLUMNS
        ))
    }

    fn query_articles(&self, sql: &str) -> Result<Vec<Article>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], article_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_by_id(&self, id: ArticleId) -> Result<ArticleWithNote, StoreError> {
        let article = find_article(&self.conn, id)?.ok_or(StoreError::NotFound(id))?;
        let note = match article.note_id {
            Some(note_id) => find_note(&self.conn, note_id)?,
            None => None,
        };
        Ok(ArticleWithNote { article, note })
    }

    pub fn count_articles(&self) -> Result<usize, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |r| r.get(0))?)
    }

    // ── Notes ──

    pub fn create_note(&self, fields: &NoteFields) -> Result<Note, StoreError> {
        insert_note(&self.conn, fields)
    }

    /// Point `article_id` at `note_id`, replacing any previous note reference.
    ///
    /// Both ids are checked inside the transaction before the update.
    pub fn attach_note(&self, article_id: ArticleId, note_id: NoteId) -> Result<Article, StoreError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        if find_article(&tx, article_id)?.is_none() {
            return Err(StoreError::NotFound(article_id));
        }
        if find_note(&tx, note_id)?.is_none() {
            return Err(StoreError::NoteNotFound(note_id));
        }
        attach(&tx, article_id, note_id)?;
        let article = find_article(&tx, article_id)?.ok_or(StoreError::NotFound(article_id))?;
        tx.commit()?;
        Ok(article)
    }

    /// Create a note and attach it to `article_id` in one transaction.
    ///
    /// The article is checked first, so a missing id creates no note.
    pub fn annotate(&self, article_id: ArticleId, fields: &NoteFields) -> Result<Article, StoreError> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        if find_article(&tx, article_id)?.is_none() {
            return Err(StoreError::NotFound(article_id));
        }
        let note = insert_note(&tx, fields)?;
        attach(&tx, article_id, note.id)?;
        let article = find_article(&tx, article_id)?.ok_or(StoreError::NotFound(article_id))?;
        tx.commit()?;
        debug!("Attached note {} to article {}", note.id, article_id);
        Ok(article)
    }

    /// Delete notes that no article references any more.
    pub fn prune_orphan_notes(&self) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM notes
             WHERE NOT EXISTS (SELECT 1 FROM articles a WHERE a.note_id = notes.id)",
            [],
        )?;
        info!("Pruned {} orphaned notes", removed);
        Ok(removed)
    }

    // ── Saved flag ──

    pub fn set_saved(&self, id: ArticleId, saved: bool) -> Result<Article, StoreError> {
        let changed = self.conn.execute(
            "UPDATE articles SET saved = ?2 WHERE id = ?1",
            params![id, saved],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        find_article(&self.conn, id)?.ok_or(StoreError::NotFound(id))
    }

    // ── Stats ──

    pub fn stats(&self) -> Result<Stats, StoreError> {
        let count = |sql: &str| -> Result<usize, StoreError> {
            Ok(self.conn.query_row(sql, [], |r| r.get(0))?)
        };
        Ok(Stats {
            articles: self.count_articles()?,
            saved: count("SELECT COUNT(*) FROM articles WHERE saved = 1")?,
            notes: count("SELECT COUNT(*) FROM notes")?,
            orphan_notes: count(
                "SELECT COUNT(*) FROM notes
                 WHERE NOT EXISTS (SELECT 1 FROM articles a WHERE a.note_id = notes.id)",
            )?,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS articles (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL DEFAULT '',
            link        TEXT,
            saved       BOOLEAN NOT NULL DEFAULT 0,
            note_id     INTEGER REFERENCES notes(id),
            fingerprint TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_articles_saved ON articles(saved);
        CREATE INDEX IF NOT EXISTS idx_articles_fingerprint ON articles(fingerprint);
        CREATE INDEX IF NOT EXISTS idx_articles_note ON articles(note_id);
        ",
    )?;
    Ok(())
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        link: row.get(2)?,
        saved: row.get(3)?,
        note_id: row.get(4)?,
        fingerprint: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn find_article(conn: &Connection, id: ArticleId) -> Result<Option<Article>, StoreError> {
    let sql = format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS);
    Ok(conn.query_row(&sql, [id], article_from_row).optional()?)
}

fn find_note(conn: &Connection, id: NoteId) -> Result<Option<Note>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, title, body, created_at FROM notes WHERE id = ?1",
            [id],
            |row| {
                Ok(Note {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    body: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?)
}

fn insert_note(conn: &Connection, fields: &NoteFields) -> Result<Note, StoreError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO notes (title, body, created_at) VALUES (?1, ?2, ?3)",
        params![fields.title, fields.body, created_at],
    )?;
    Ok(Note {
        id: conn.last_insert_rowid(),
        title: fields.title.clone(),
        body: fields.body.clone(),
        created_at,
    })
}

fn attach(conn: &Connection, article_id: ArticleId, note_id: NoteId) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE articles SET note_id = ?2 WHERE id = ?1",
        params![article_id, note_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(article_id));
    }
    Ok(())
}

// ── Tests ──
