use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::io;
use std::path::{Path, PathBuf};

/// One finished (or stopped mid-play) session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub played_at: DateTime<Local>,
    pub fingerprint: String,
    pub score: u32,
    pub best: u32,
}

/// Database of past sessions. Optional everywhere it is used: when the
/// database cannot be opened the game simply plays without history.
#[derive(Debug)]
pub struct SessionDb {
    conn: Connection,
}

impl SessionDb {
    pub fn new() -> Result<Self> {
        let db_path = crate::app_dirs::AppDirs::db_path()
            .unwrap_or_else(|| PathBuf::from("sumgrid_history.db"));
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::open(&db_path)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Result<Self> {
        Self::open(p.as_ref())
    }

    fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                played_at TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                score INTEGER NOT NULL,
                best INTEGER NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_fingerprint ON sessions(fingerprint)",
            [],
        )?;
        Ok(SessionDb { conn })
    }

    pub fn record(&self, rec: &SessionRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (played_at, fingerprint, score, best)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                rec.played_at.to_rfc3339(),
                rec.fingerprint,
                rec.score,
                rec.best,
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT played_at, fingerprint, score, best FROM sessions
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            let played_at: String = row.get(0)?;
            Ok(SessionRecord {
                played_at: DateTime::parse_from_rfc3339(&played_at)
                    .map(|dt| dt.with_timezone(&Local))
                    .unwrap_or_else(|_| Local::now()),
                fingerprint: row.get(1)?,
                score: row.get(2)?,
                best: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn session_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
    }

    /// Dump every session as CSV, oldest first.
    pub fn export_csv<W: io::Write>(&self, out: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["played_at", "fingerprint", "score", "best"])
            .map_err(csv_to_sqlite_err)?;
        let mut stmt = self.conn.prepare(
            "SELECT played_at, fingerprint, score, best FROM sessions ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?;
        for row in rows {
            let (played_at, fingerprint, score, best) = row?;
            wtr.write_record([
                played_at,
                fingerprint,
                score.to_string(),
                best.to_string(),
            ])
            .map_err(csv_to_sqlite_err)?;
        }
        wtr.flush()
            .map_err(|e| csv_to_sqlite_err(csv::Error::from(e)))?;
        Ok(())
    }
}

fn csv_to_sqlite_err(e: csv::Error) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
        Some(e.to_string()),
    )
}
