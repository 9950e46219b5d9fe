use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::model::record::DetectionRecord;

/// SQLite sink for detection records.
///
/// Summary columns are kept alongside the full record as JSON, so records can
/// be queried by symbol and risk without decoding the payload.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS detection_records (
                record_id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                event_time_ms INTEGER NOT NULL,
                risk_score REAL NOT NULL,
                anomaly_count INTEGER NOT NULL,
                high_severity_count INTEGER NOT NULL,
                anomalies_json TEXT NOT NULL,
                record_json TEXT NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_detection_records_symbol_time
                ON detection_records(symbol, event_time_ms);
            "#,
        )
        .context("failed to create detection_records schema")?;
        Ok(Self { conn })
    }

    /// Insert or overwrite by record id.
    pub fn persist(&self, record: &DetectionRecord) -> Result<()> {
        let anomalies_json = serde_json::to_string(record.anomalies())?;
        let record_json = serde_json::to_string(record)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            r#"
            INSERT INTO detection_records (
                record_id, symbol, event_time_ms, risk_score, anomaly_count,
                high_severity_count, anomalies_json, record_json, updated_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(record_id) DO UPDATE SET
                symbol = excluded.symbol,
                event_time_ms = excluded.event_time_ms,
                risk_score = excluded.risk_score,
                anomaly_count = excluded.anomaly_count,
                high_severity_count = excluded.high_severity_count,
                anomalies_json = excluded.anomalies_json,
                record_json = excluded.record_json,
                updated_at_ms = excluded.updated_at_ms
            "#,
            params![
                record.record_id().to_string(),
                record.symbol(),
                record.timestamp().timestamp_millis(),
                record.risk_score(),
                record.anomaly_count() as i64,
                record.high_severity_count() as i64,
                anomalies_json,
                record_json,
                now_ms,
            ],
        )?;
        Ok(())
    }

    /// Up to `limit` most recent records for `symbol`, newest first.
    pub fn load_recent(&self, symbol: &str, limit: usize) -> Result<Vec<DetectionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT record_json
            FROM detection_records
            WHERE symbol = ?1
            ORDER BY event_time_ms DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![symbol, limit as i64], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let json = row?;
            let record: DetectionRecord =
                serde_json::from_str(&json).context("corrupt record_json in detection_records")?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM detection_records", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
