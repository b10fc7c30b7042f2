//! Pair record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Look up combination memos by canonical pair or by result text.
//! - Insert new memos idempotently per canonical pair.
//!
//! # Invariants
//! - Write paths call `PairRecord::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `find_by_text` is deterministic: earliest record wins.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::element::{PairRecord, PairRecordValidationError};
use crate::model::pair::CanonicalPair;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};

const PAIR_SELECT_SQL: &str = "SELECT
    word1,
    word2,
    emoji,
    text
FROM pair_records";

const REQUIRED_COLUMNS: &[&str] = &["word1", "word2", "emoji", "text", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for pair persistence and lookups.
#[derive(Debug)]
pub enum RepoError {
    Validation(PairRecordValidationError),
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted to a valid record.
    InvalidData(String),
    /// A previous holder of the connection lock panicked.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "pair repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "pair repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "pair repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted pair data: {message}"),
            Self::LockPoisoned => write!(f, "pair repository connection lock is poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PairRecordValidationError> for RepoError {
    fn from(value: PairRecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of an idempotent insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written by this call.
    Inserted,
    /// Another writer already stored a record for the same pair.
    AlreadyPresent(PairRecord),
}

/// Repository interface for combination memos.
pub trait PairRepository: Send + Sync {
    /// Loads the memo for one canonical pair.
    fn find_by_pair(&self, pair: &CanonicalPair) -> RepoResult<Option<PairRecord>>;
    /// Loads the earliest memo whose result has the given normalized text.
    fn find_by_text(&self, text: &str) -> RepoResult<Option<PairRecord>>;
    /// Inserts a memo unless one already exists for its pair.
    fn insert(&self, record: &PairRecord) -> RepoResult<InsertOutcome>;
    /// Number of stored memos.
    fn count(&self) -> RepoResult<u64>;
}

impl<R: PairRepository + ?Sized> PairRepository for Arc<R> {
    fn find_by_pair(&self, pair: &CanonicalPair) -> RepoResult<Option<PairRecord>> {
        (**self).find_by_pair(pair)
    }

    fn find_by_text(&self, text: &str) -> RepoResult<Option<PairRecord>> {
        (**self).find_by_text(text)
    }

    fn insert(&self, record: &PairRecord) -> RepoResult<InsertOutcome> {
        (**self).insert(record)
    }

    fn count(&self) -> RepoResult<u64> {
        (**self).count()
    }
}

/// SQLite-backed pair repository.
///
/// Owns its connection behind a mutex so one store can be shared by
/// concurrently running resolutions.
pub struct SqlitePairRepository {
    conn: Mutex<Connection>,
}

impl SqlitePairRepository {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_pair_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl PairRepository for SqlitePairRepository {
    fn find_by_pair(&self, pair: &CanonicalPair) -> RepoResult<Option<PairRecord>> {
        let conn = self.lock()?;
        load_by_pair(&conn, pair.word1(), pair.word2())
    }

    fn find_by_text(&self, text: &str) -> RepoResult<Option<PairRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{PAIR_SELECT_SQL}
             WHERE text = ?1
             ORDER BY created_at ASC, rowid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([text])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_pair_row(row)?));
        }
        Ok(None)
    }

    fn insert(&self, record: &PairRecord) -> RepoResult<InsertOutcome> {
        record.validate()?;

        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO pair_records (word1, word2, emoji, text)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (word1, word2) DO NOTHING;",
            params![
                record.word1.as_str(),
                record.word2.as_str(),
                record.emoji.as_str(),
                record.text.as_str(),
            ],
        )?;

        if changed == 1 {
            return Ok(InsertOutcome::Inserted);
        }

        match load_by_pair(&conn, &record.word1, &record.word2)? {
            Some(existing) => Ok(InsertOutcome::AlreadyPresent(existing)),
            None => Err(RepoError::InvalidData(format!(
                "insert for ({}, {}) was ignored but no row exists",
                record.word1, record.word2
            ))),
        }
    }

    fn count(&self) -> RepoResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pair_records;", [], |row| {
            row.get(0)
        })?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

fn load_by_pair(conn: &Connection, word1: &str, word2: &str) -> RepoResult<Option<PairRecord>> {
    let row = conn
        .query_row(
            &format!("{PAIR_SELECT_SQL} WHERE word1 = ?1 AND word2 = ?2;"),
            params![word1, word2],
            |row| {
                Ok((
                    row.get::<_, String>("word1")?,
                    row.get::<_, String>("word2")?,
                    row.get::<_, String>("emoji")?,
                    row.get::<_, String>("text")?,
                ))
            },
        )
        .optional()?;

    row.map(|(word1, word2, emoji, text)| {
        checked_record(PairRecord {
            word1,
            word2,
            emoji,
            text,
        })
    })
    .transpose()
}

fn parse_pair_row(row: &Row<'_>) -> RepoResult<PairRecord> {
    checked_record(PairRecord {
        word1: row.get("word1")?,
        word2: row.get("word2")?,
        emoji: row.get("emoji")?,
        text: row.get("text")?,
    })
}

fn checked_record(record: PairRecord) -> RepoResult<PairRecord> {
    record.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "pair ({}, {}) failed validation: {err}",
            record.word1, record.word2
        ))
    })?;
    Ok(record)
}

fn ensure_pair_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "pair_records")? {
        return Err(RepoError::MissingRequiredTable("pair_records"));
    }

    for &column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "pair_records", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "pair_records",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
