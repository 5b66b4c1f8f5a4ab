//! SQLite-backed attendance store.
//!
//! Provides persistent storage for:
//! - Subjects, unique per (user, name)
//! - Attendance records, unique per (user, subject, date, time slot)
//!
//! The connection lives behind a mutex and every call runs on tokio's
//! blocking pool, so callers simply await each operation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use super::migrations;
use crate::error::LedgerError;
use crate::ledger::{
    AttendanceRecord, AttendanceStatus, AttendanceStore, NewSubject, Subject, TripleKey,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SUBJECT_COLUMNS: &str = "id, user_id, name, required_percentage, credits, created_at";
const RECORD_COLUMNS: &str = "user_id, subject_id, date, time_slot, status, recorded_at";

fn corrupt(field: &str, value: &str) -> LedgerError {
    LedgerError::Corrupt {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(field, value))
}

fn parse_date(value: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| corrupt("date", value))
}

fn parse_status(value: &str) -> Result<AttendanceStatus, LedgerError> {
    value.parse().map_err(|_| corrupt("status", value))
}

fn row_to_subject(row: &Row) -> Result<Subject, LedgerError> {
    let created_at: String = row.get("created_at")?;
    Ok(Subject {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        required_percentage: row.get("required_percentage")?,
        credits: row.get("credits")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_record(row: &Row) -> Result<AttendanceRecord, LedgerError> {
    let date: String = row.get("date")?;
    let status: String = row.get("status")?;
    let recorded_at: String = row.get("recorded_at")?;
    Ok(AttendanceRecord {
        user_id: row.get("user_id")?,
        subject_id: row.get("subject_id")?,
        date: parse_date(&date)?,
        time_slot: row.get("time_slot")?,
        status: parse_status(&status)?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn find_subject_by_name(
    conn: &Connection,
    user_id: &str,
    name: &str,
) -> Result<Option<Subject>, LedgerError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ?1 AND name = ?2"
    ))?;
    let mut rows = stmt.query(params![user_id, name])?;
    let subject = match rows.next()? {
        Some(row) => Some(row_to_subject(row)?),
        None => None,
    };
    Ok(subject)
}

/// SQLite database holding subjects and attendance records.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(|e| {
            LedgerError::Unreachable(format!("failed to open {}: {e}", path.display()))
        })?;
        let store = Self::init(conn, Some(path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), "attendance database opened");
        Ok(store)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, LedgerError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Location on disk, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LedgerError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| LedgerError::Unreachable("database connection poisoned".into()))?;
            task(&mut guard)
        })
        .await?
    }
}

#[async_trait]
impl AttendanceStore for SqliteStore {
    async fn upsert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, LedgerError> {
        tracing::debug!(
            subject_id = %record.subject_id,
            date = %record.date,
            time_slot = %record.time_slot,
            status = record.status.as_str(),
            "upserting attendance record"
        );
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO attendance_records (user_id, subject_id, date, time_slot, status, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (user_id, subject_id, date, time_slot)
                 DO UPDATE SET status = excluded.status, recorded_at = excluded.recorded_at",
                params![
                    record.user_id,
                    record.subject_id,
                    record.date.format(DATE_FORMAT).to_string(),
                    record.time_slot,
                    record.status.as_str(),
                    record.recorded_at.to_rfc3339(),
                ],
            )?;
            Ok(record)
        })
        .await
    }

    async fn remove(
        &self,
        user_id: &str,
        key: &TripleKey,
    ) -> Result<Option<AttendanceRecord>, LedgerError> {
        let user_id = user_id.to_string();
        let key = key.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let existing = tx
                .prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM attendance_records
                     WHERE user_id = ?1 AND subject_id = ?2 AND date = ?3 AND time_slot = ?4"
                ))?
                .query_and_then(
                    params![
                        user_id,
                        key.subject_id,
                        key.date.format(DATE_FORMAT).to_string(),
                        key.time_slot,
                    ],
                    row_to_record,
                )?
                .next()
                .transpose()?;

            if existing.is_some() {
                tx.execute(
                    "DELETE FROM attendance_records
                     WHERE user_id = ?1 AND subject_id = ?2 AND date = ?3 AND time_slot = ?4",
                    params![
                        user_id,
                        key.subject_id,
                        key.date.format(DATE_FORMAT).to_string(),
                        key.time_slot,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(existing)
        })
        .await
    }

    async fn status_of(
        &self,
        user_id: &str,
        key: &TripleKey,
    ) -> Result<Option<AttendanceStatus>, LedgerError> {
        let user_id = user_id.to_string();
        let key = key.clone();
        self.execute(move |conn| {
            let status: Option<String> = conn
                .query_row(
                    "SELECT status FROM attendance_records
                     WHERE user_id = ?1 AND subject_id = ?2 AND date = ?3 AND time_slot = ?4",
                    params![
                        user_id,
                        key.subject_id,
                        key.date.format(DATE_FORMAT).to_string(),
                        key.time_slot,
                    ],
                    |row| row.get(0),
                )
                .optional()?;
            status.as_deref().map(parse_status).transpose()
        })
        .await
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE user_id = ?1"
            ))?;
            let mut rows = stmt.query(params![user_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    async fn seed_subjects(&self, user_id: &str, names: &[String]) -> Result<usize, LedgerError> {
        let user_id = user_id.to_string();
        let names = names.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut created = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO subjects (id, user_id, name, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (user_id, name) DO NOTHING",
                )?;
                let now = Utc::now().to_rfc3339();
                for name in &names {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    created += stmt.execute(params![
                        Uuid::new_v4().to_string(),
                        user_id,
                        name,
                        now
                    ])?;
                }
            }
            tx.commit()?;
            Ok(created)
        })
        .await
    }

    async fn add_subject(
        &self,
        user_id: &str,
        subject: NewSubject,
    ) -> Result<Subject, LedgerError> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let created = Subject {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.clone(),
                name: subject.name.trim().to_string(),
                required_percentage: subject.required_percentage,
                credits: subject.credits,
                created_at: Utc::now(),
            };

            let inserted = conn.execute(
                "INSERT INTO subjects (id, user_id, name, required_percentage, credits, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    created.id,
                    created.user_id,
                    created.name,
                    created.required_percentage,
                    created.credits,
                    created.created_at.to_rfc3339(),
                ],
            );

            match inserted {
                Ok(_) => Ok(created),
                Err(err) if is_unique_violation(&err) => {
                    tracing::debug!(name = %created.name, "subject already recorded");
                    find_subject_by_name(conn, &user_id, &created.name)?.ok_or_else(|| {
                        LedgerError::DuplicateKey {
                            user_id: user_id.clone(),
                            name: created.name.clone(),
                        }
                    })
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn subjects_for_user(&self, user_id: &str) -> Result<Vec<Subject>, LedgerError> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ?1 ORDER BY name ASC"
            ))?;
            let mut rows = stmt.query(params![user_id])?;
            let mut subjects = Vec::new();
            while let Some(row) = rows.next()? {
                subjects.push(row_to_subject(row)?);
            }
            Ok(subjects)
        })
        .await
    }
}
