//! SQLite prediction history.
//!
//! RULE: Only store.rs talks to the database.
//! Operations call store methods; they never execute SQL directly.

use crate::error::DashResult;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    Single,
    Batch,
}

impl PredictionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch  => "batch",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "batch"  => Some(Self::Batch),
            _        => None,
        }
    }
}

/// One stored prediction, as returned by `history`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub id:              i64,
    pub prediction_type: PredictionType,
    pub input_data:      Value,
    pub prediction:      u8,
    pub probability:     f64,
    pub created_at:      String,
}

pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &str) -> DashResult<Self> {
        let conn = Connection::open(path)?;
        // WAL so concurrent runner processes don't block readers.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DashResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DashResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_prediction_history.sql"))?;
        Ok(())
    }

    // ── Write ──────────────────────────────────────────────────

    pub fn record(
        &self,
        kind: PredictionType,
        input: &Value,
        prediction: u8,
        probability: f64,
    ) -> DashResult<i64> {
        self.conn.execute(
            "INSERT INTO prediction (prediction_type, input_data, prediction, probability, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kind.as_str(),
                serde_json::to_string(input)?,
                i64::from(prediction),
                probability,
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record every (input, prediction, probability) triple in one
    /// transaction. All rows land or none do.
    pub fn record_batch(&self, rows: &[(Value, u8, f64)]) -> DashResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO prediction (prediction_type, input_data, prediction, probability, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            for (input, prediction, probability) in rows {
                stmt.execute(params![
                    PredictionType::Batch.as_str(),
                    serde_json::to_string(input)?,
                    i64::from(*prediction),
                    probability,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    // ── Read ───────────────────────────────────────────────────

    /// At most `limit` predictions, newest first.
    pub fn recent(&self, limit: u32) -> DashResult<Vec<PredictionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, prediction_type, input_data, prediction, probability, created_at
             FROM prediction ORDER BY id DESC LIMIT ?1",
        )?;
        let raw = stmt
            .query_map(params![i64::from(limit)], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, kind, input, prediction, probability, created_at)| -> DashResult<PredictionRecord> {
                let prediction_type = PredictionType::parse(&kind)
                    .ok_or_else(|| anyhow::anyhow!("Row {id}: unknown prediction type '{kind}'"))?;
                Ok(PredictionRecord {
                    id,
                    prediction_type,
                    input_data: serde_json::from_str(&input)?,
                    prediction: u8::from(prediction != 0),
                    probability,
                    created_at,
                })
            })
            .collect()
    }

    pub fn count(&self) -> DashResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM prediction", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
