//! SQLite result history

use anyhow::{Context, Result};
use meter::HistoryRecord;
use rusqlite::{Connection, Row, params};
use std::path::Path;
use tracing::{debug, info};

pub struct Database {
    conn: Connection,
    max_history: usize,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P, max_history: usize) -> Result<Self> {
        let conn = Connection::open(path)
            .context("Failed to open database")?;

        // Enable WAL mode for better concurrent read/write performance
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;

        conn.pragma_update(None, "busy_timeout", "5000")
            .context("Failed to set busy timeout")?;

        Ok(Self { conn, max_history })
    }

    #[cfg(test)]
    pub fn in_memory(max_history: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, max_history })
    }

    pub fn initialize(&self) -> Result<()> {
        info!("Initializing database schema");

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                target_id TEXT NOT NULL,
                target_name TEXT NOT NULL,
                avg_rtt REAL NOT NULL,
                avg_jitter REAL NOT NULL,
                max_jitter REAL NOT NULL,
                std_dev_rtt REAL NOT NULL,
                packet_loss_ratio REAL NOT NULL,
                mos_estimate REAL NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_target ON history(target_id)",
            [],
        )?;

        Ok(())
    }

    /// Insert a record and drop everything beyond the newest `max_history`
    pub fn save(&self, record: &HistoryRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO history (
                timestamp, target_id, target_name, avg_rtt, avg_jitter, max_jitter,
                std_dev_rtt, packet_loss_ratio, mos_estimate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.timestamp,
                &record.target_id,
                &record.target_name,
                record.avg_rtt,
                record.avg_jitter,
                record.max_jitter,
                record.std_dev_rtt,
                record.packet_loss_ratio,
                record.mos_estimate,
            ],
        )?;

        let trimmed = self.conn.execute(
            "DELETE FROM history WHERE id NOT IN (
                SELECT id FROM history ORDER BY timestamp DESC, id DESC LIMIT ?1
            )",
            params![self.max_history as i64],
        )?;
        if trimmed > 0 {
            debug!("Trimmed {} old history entries", trimmed);
        }

        Ok(())
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                timestamp, target_id, target_name, avg_rtt, avg_jitter, max_jitter,
                std_dev_rtt, packet_loss_ratio, mos_estimate
            FROM history
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1"
        )?;

        let records = stmt.query_map(params![limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn all(&self) -> Result<Vec<HistoryRecord>> {
        self.recent(self.max_history)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        timestamp: row.get(0)?,
        target_id: row.get(1)?,
        target_name: row.get(2)?,
        avg_rtt: row.get(3)?,
        avg_jitter: row.get(4)?,
        max_jitter: row.get(5)?,
        std_dev_rtt: row.get(6)?,
        packet_loss_ratio: row.get(7)?,
        mos_estimate: row.get(8)?,
    })
}
