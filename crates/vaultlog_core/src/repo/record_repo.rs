//! Record store contract and SQLite vault implementation.
//!
//! # Responsibility
//! - Provide search, checkout and whole-content write primitives over a
//!   shared multi-writer vault.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - A record is writable only while checked out by this store's writer id.
//! - Staged writes become visible on `check_in` and are discarded by
//!   `undo_check_out`.
//! - `created_at` is strictly increasing across all records of one vault.

use crate::db::DbError;
use crate::model::record::{RecordId, RecordKind, RecordRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    uuid,
    kind,
    title,
    version,
    created_at
FROM records";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for record vault operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(RecordId),
    /// Object type/class/property definitions for this kind are absent.
    StructureMissing(RecordKind),
    /// The store handle may not create or remove vault structure.
    StructureMutationForbidden,
    /// The record is not checked out by this writer.
    NotCheckedOut(RecordId),
    /// The record was rewritten since it was observed.
    VersionConflict {
        id: RecordId,
        expected: i64,
        actual: i64,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::StructureMissing(kind) => {
                write!(f, "vault structure for `{}` records is missing", kind.as_str())
            }
            Self::StructureMutationForbidden => {
                write!(f, "vault structure mutation is not allowed on this store")
            }
            Self::NotCheckedOut(id) => write!(f, "record is not checked out by this writer: {id}"),
            Self::VersionConflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "record {id} changed concurrently: expected version {expected}, found {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Backing store primitives consumed by the rolling writer.
///
/// The store offers no append primitive: every append is a checkout, a
/// whole-content write and a check-in.
pub trait RecordStore {
    /// Whether the schema needed to hold `kind` records exists.
    fn is_structure_present(&self, kind: RecordKind) -> StoreResult<bool>;

    /// Non-deleted `kind` records whose title starts with `title_prefix`,
    /// in no particular order.
    fn search_records(&self, kind: RecordKind, title_prefix: &str) -> StoreResult<Vec<RecordRef>>;

    /// Current committed content of `record`.
    fn read_content(&self, record: &RecordRef) -> StoreResult<String>;

    /// Whether any writer currently holds `id` checked out.
    fn is_locked(&self, id: RecordId) -> StoreResult<bool>;

    /// Tries to take exclusive access to `id`.
    ///
    /// Returns `Ok(false)` when another writer won the race.
    fn check_out(&self, id: RecordId) -> StoreResult<bool>;

    /// Stages `content` as the full new content of a checked-out record.
    ///
    /// Fails with `VersionConflict` when the record moved past
    /// `record.version`.
    fn write_content(&self, record: &RecordRef, content: &str) -> StoreResult<()>;

    /// Commits staged content and releases the checkout.
    fn check_in(&self, id: RecordId) -> StoreResult<()>;

    /// Discards staged content and releases the checkout.
    fn undo_check_out(&self, id: RecordId) -> StoreResult<()>;

    /// Creates and commits a new record in one step.
    fn create_record(&self, kind: RecordKind, title: &str, content: &str)
        -> StoreResult<RecordRef>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn is_structure_present(&self, kind: RecordKind) -> StoreResult<bool> {
        (**self).is_structure_present(kind)
    }

    fn search_records(&self, kind: RecordKind, title_prefix: &str) -> StoreResult<Vec<RecordRef>> {
        (**self).search_records(kind, title_prefix)
    }

    fn read_content(&self, record: &RecordRef) -> StoreResult<String> {
        (**self).read_content(record)
    }

    fn is_locked(&self, id: RecordId) -> StoreResult<bool> {
        (**self).is_locked(id)
    }

    fn check_out(&self, id: RecordId) -> StoreResult<bool> {
        (**self).check_out(id)
    }

    fn write_content(&self, record: &RecordRef, content: &str) -> StoreResult<()> {
        (**self).write_content(record, content)
    }

    fn check_in(&self, id: RecordId) -> StoreResult<()> {
        (**self).check_in(id)
    }

    fn undo_check_out(&self, id: RecordId) -> StoreResult<()> {
        (**self).undo_check_out(id)
    }

    fn create_record(
        &self,
        kind: RecordKind,
        title: &str,
        content: &str,
    ) -> StoreResult<RecordRef> {
        (**self).create_record(kind, title, content)
    }
}

/// SQLite-backed record vault.
///
/// Several stores (processes, or handles with distinct writer ids) may share
/// one database; checkout ownership is tracked per writer id.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
    writer_id: String,
    structure_mutation: bool,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates a store with a fresh random writer id.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_writer_id(conn, Uuid::new_v4().to_string())
    }

    /// Creates a store that checks records out as `writer_id`.
    pub fn with_writer_id(conn: &'conn Connection, writer_id: impl Into<String>) -> Self {
        Self {
            conn,
            writer_id: writer_id.into(),
            structure_mutation: true,
        }
    }

    /// Sets whether this handle may provision or remove vault structure.
    ///
    /// Cached long-lived handles are typically created with `false`.
    pub fn with_structure_mutation(mut self, allowed: bool) -> Self {
        self.structure_mutation = allowed;
        self
    }

    pub fn writer_id(&self) -> &str {
        &self.writer_id
    }

    pub fn allows_structure_mutation(&self) -> bool {
        self.structure_mutation
    }

    /// Creates the structure required for `kind` records. Idempotent.
    pub fn provision_structure(&self, kind: RecordKind) -> StoreResult<()> {
        self.ensure_structure_mutation()?;
        self.conn.execute(
            "INSERT OR IGNORE INTO vault_structures (kind, created_at) VALUES (?1, ?2);",
            params![kind.as_str(), now_epoch_ms()],
        )?;
        Ok(())
    }

    /// Removes the structure for `kind` records. Existing records are kept.
    pub fn remove_structure(&self, kind: RecordKind) -> StoreResult<()> {
        self.ensure_structure_mutation()?;
        self.conn.execute(
            "DELETE FROM vault_structures WHERE kind = ?1;",
            [kind.as_str()],
        )?;
        Ok(())
    }

    /// Tombstones a record so searches no longer return it.
    pub fn soft_delete_record(&self, id: RecordId) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE records SET is_deleted = 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn ensure_structure_mutation(&self) -> StoreResult<()> {
        if self.structure_mutation {
            Ok(())
        } else {
            Err(StoreError::StructureMutationForbidden)
        }
    }

    /// Returns `(version, checked_out_by)` for a live record.
    fn lock_state(&self, id: RecordId) -> StoreResult<(i64, Option<String>)> {
        self.conn
            .query_row(
                "SELECT version, checked_out_by FROM records WHERE uuid = ?1 AND is_deleted = 0;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    fn release(&self, id: RecordId, commit: bool) -> StoreResult<()> {
        let sql = if commit {
            "UPDATE records
             SET
                content = CASE WHEN kind = 'property' THEN pending_content ELSE content END,
                file_content = CASE WHEN kind = 'file' THEN pending_file_content ELSE file_content END,
                version = version + 1,
                pending_content = NULL,
                pending_file_content = NULL,
                pending = 0,
                checked_out_by = NULL
             WHERE uuid = ?1 AND checked_out_by = ?2 AND pending = 1;"
        } else {
            "UPDATE records
             SET
                pending_content = NULL,
                pending_file_content = NULL,
                pending = 0,
                checked_out_by = NULL
             WHERE uuid = ?1 AND checked_out_by = ?2;"
        };

        let changed = self
            .conn
            .execute(sql, params![id.to_string(), self.writer_id])?;
        if changed == 1 {
            return Ok(());
        }

        if commit {
            // Checked out but nothing staged: release without a version bump.
            let released = self.conn.execute(
                "UPDATE records SET checked_out_by = NULL WHERE uuid = ?1 AND checked_out_by = ?2;",
                params![id.to_string(), self.writer_id],
            )?;
            if released == 1 {
                return Ok(());
            }
        }

        self.lock_state(id)?;
        Err(StoreError::NotCheckedOut(id))
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn is_structure_present(&self, kind: RecordKind) -> StoreResult<bool> {
        let present: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM vault_structures WHERE kind = ?1);",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(present == 1)
    }

    fn search_records(&self, kind: RecordKind, title_prefix: &str) -> StoreResult<Vec<RecordRef>> {
        // substr keeps the match case-sensitive, unlike LIKE.
        let mut stmt = self.conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE kind = ?1
               AND is_deleted = 0
               AND substr(title, 1, length(?2)) = ?2;"
        ))?;
        let mut rows = stmt.query(params![kind.as_str(), title_prefix])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn read_content(&self, record: &RecordRef) -> StoreResult<String> {
        let id = record.id;
        match record.kind {
            RecordKind::Property => self
                .conn
                .query_row(
                    "SELECT content FROM records WHERE uuid = ?1 AND is_deleted = 0;",
                    [id.to_string()],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .map(Option::unwrap_or_default)
                .ok_or(StoreError::NotFound(id)),
            RecordKind::File => {
                let bytes = self
                    .conn
                    .query_row(
                        "SELECT file_content FROM records WHERE uuid = ?1 AND is_deleted = 0;",
                        [id.to_string()],
                        |row| row.get::<_, Option<Vec<u8>>>(0),
                    )
                    .optional()?
                    .ok_or(StoreError::NotFound(id))?
                    .unwrap_or_default();
                String::from_utf8(bytes).map_err(|_| {
                    StoreError::InvalidData(format!("file content of record {id} is not UTF-8"))
                })
            }
        }
    }

    fn is_locked(&self, id: RecordId) -> StoreResult<bool> {
        let (_, checked_out_by) = self.lock_state(id)?;
        Ok(checked_out_by.is_some())
    }

    fn check_out(&self, id: RecordId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE records
             SET checked_out_by = ?1
             WHERE uuid = ?2 AND is_deleted = 0 AND checked_out_by IS NULL;",
            params![self.writer_id, id.to_string()],
        )?;
        if changed == 1 {
            return Ok(true);
        }

        self.lock_state(id)?;
        Ok(false)
    }

    fn write_content(&self, record: &RecordRef, content: &str) -> StoreResult<()> {
        let (column, value): (&str, rusqlite::types::Value) = match record.kind {
            RecordKind::Property => ("pending_content", content.to_string().into()),
            RecordKind::File => ("pending_file_content", content.as_bytes().to_vec().into()),
        };

        let changed = self.conn.execute(
            &format!(
                "UPDATE records
                 SET {column} = ?1, pending = 1
                 WHERE uuid = ?2 AND checked_out_by = ?3 AND version = ?4 AND is_deleted = 0;"
            ),
            params![value, record.id.to_string(), self.writer_id, record.version],
        )?;
        if changed == 1 {
            return Ok(());
        }

        let (actual, checked_out_by) = self.lock_state(record.id)?;
        if checked_out_by.as_deref() != Some(self.writer_id.as_str()) {
            return Err(StoreError::NotCheckedOut(record.id));
        }
        Err(StoreError::VersionConflict {
            id: record.id,
            expected: record.version,
            actual,
        })
    }

    fn check_in(&self, id: RecordId) -> StoreResult<()> {
        self.release(id, true)
    }

    fn undo_check_out(&self, id: RecordId) -> StoreResult<()> {
        self.release(id, false)
    }

    fn create_record(
        &self,
        kind: RecordKind,
        title: &str,
        content: &str,
    ) -> StoreResult<RecordRef> {
        if !self.is_structure_present(kind)? {
            return Err(StoreError::StructureMissing(kind));
        }

        let id = Uuid::new_v4();
        let (text, bytes) = match kind {
            RecordKind::Property => (Some(content), None),
            RecordKind::File => (None, Some(content.as_bytes())),
        };
        let created_at: i64 = self.conn.query_row(
            "INSERT INTO records (uuid, kind, title, content, file_content, created_at)
             VALUES (
                ?1, ?2, ?3, ?4, ?5,
                MAX(?6, COALESCE((SELECT MAX(created_at) FROM records), 0) + 1)
             )
             RETURNING created_at;",
            params![
                id.to_string(),
                kind.as_str(),
                title,
                text,
                bytes,
                now_epoch_ms()
            ],
            |row| row.get(0),
        )?;

        Ok(RecordRef {
            id,
            kind,
            title: title.to_string(),
            version: 0,
            created_at,
        })
    }
}

fn parse_record_row(row: &Row<'_>) -> StoreResult<RecordRef> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{uuid_text}` in records.uuid"))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = RecordKind::parse(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid record kind `{kind_text}` in records.kind"))
    })?;

    Ok(RecordRef {
        id,
        kind,
        title: row.get("title")?,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
    })
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
