//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

use super::{Job, JobStatus, JobStore, JobStoreError};

const JOB_COLUMNS: &str = "id, title, thumbnail, channel_name, channel_id, group_name, status, \
     progress, speed, eta, error, output_path, enqueued_at, sequence, attempt, started_at, \
     updated_at";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                thumbnail TEXT,
                channel_name TEXT NOT NULL,
                channel_id TEXT,
                group_name TEXT,
                status TEXT NOT NULL,
                progress REAL NOT NULL DEFAULT 0,
                speed TEXT,
                eta TEXT,
                error TEXT,
                output_path TEXT,
                enqueued_at TEXT NOT NULL,
                sequence INTEGER NOT NULL DEFAULT 0,
                attempt INTEGER NOT NULL DEFAULT 0,
                started_at TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_enqueued_at ON jobs(enqueued_at, sequence);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, JobStoreError> {
        self.conn
            .lock()
            .map_err(|_| JobStoreError::Database("connection lock poisoned".to_string()))
    }

    fn write_job(conn: &Connection, job: &Job) -> rusqlite::Result<usize> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO jobs ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                JOB_COLUMNS
            ),
            params![
                job.id,
                job.title,
                job.thumbnail,
                job.channel_name,
                job.channel_id,
                job.group_name,
                job.status.as_str(),
                job.progress as f64,
                job.speed,
                job.eta,
                job.error,
                job.output_path,
                job.enqueued_at.to_rfc3339(),
                job.sequence as i64,
                job.attempt,
                job.started_at.map(|t| t.to_rfc3339()),
                job.updated_at.to_rfc3339(),
            ],
        )
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let status_str: String = row.get(6)?;
        let status = status_str
            .parse::<JobStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, e.into()))?;

        let started_at: Option<String> = row.get(15)?;

        Ok(Job {
            id: row.get(0)?,
            title: row.get(1)?,
            thumbnail: row.get(2)?,
            channel_name: row.get(3)?,
            channel_id: row.get(4)?,
            group_name: row.get(5)?,
            status,
            progress: row.get::<_, f64>(7)? as f32,
            speed: row.get(8)?,
            eta: row.get(9)?,
            error: row.get(10)?,
            output_path: row.get(11)?,
            enqueued_at: parse_timestamp(12, &row.get::<_, String>(12)?)?,
            sequence: row.get::<_, i64>(13)? as u64,
            attempt: row.get(14)?,
            started_at: started_at
                .map(|s| parse_timestamp(15, &s))
                .transpose()?,
            updated_at: parse_timestamp(16, &row.get::<_, String>(16)?)?,
        })
    }
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

impl JobStore for SqliteJobStore {
    fn load_all(&self) -> Result<Vec<Job>, JobStoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs ORDER BY enqueued_at ASC, sequence ASC",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map([], Self::row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn upsert(&self, job: &Job) -> Result<(), JobStoreError> {
        let conn = self.conn()?;
        Self::write_job(&conn, job)?;
        Ok(())
    }

    fn upsert_many(&self, jobs: &[Job]) -> Result<(), JobStoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for job in jobs {
            Self::write_job(&tx, job)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, JobStoreError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn delete_many(&self, ids: &[String]) -> Result<usize, JobStoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        for id in ids {
            removed += tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(removed)
    }
}
