//! Row mapping for the `deals` table.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::{format_timestamp, parse_timestamp, text_conversion, SqlRecord};
use crate::types::{Deal, DealStage};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl SqlRecord for Deal {
    const COLUMNS: &'static str = "id, contact_id, value, stage, stage_entered_at, \
         expected_close_date, probability, assigned_rep, notes";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stage: String = row.get(3)?;
        let stage_entered_at: String = row.get(4)?;
        let close: String = row.get(5)?;
        Ok(Deal {
            id: row.get::<_, i64>(0)? as u64,
            contact_id: row.get::<_, i64>(1)? as u64,
            value: row.get(2)?,
            stage: stage.parse::<DealStage>().map_err(|e| text_conversion(3, e))?,
            stage_entered_at: parse_timestamp(4, &stage_entered_at)?,
            expected_close_date: NaiveDate::parse_from_str(&close, DATE_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
            })?,
            probability: row.get(6)?,
            assigned_rep: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    fn insert(&self, conn: &Connection, id: Option<u64>) -> rusqlite::Result<u64> {
        conn.execute(
            "INSERT INTO deals (id, contact_id, value, stage, stage_entered_at,
                                expected_close_date, probability, assigned_rep, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.map(|id| id as i64),
                self.contact_id as i64,
                self.value,
                self.stage.as_str(),
                format_timestamp(&self.stage_entered_at),
                self.expected_close_date.format(DATE_FORMAT).to_string(),
                self.probability,
                self.assigned_rep,
                self.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    fn write(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE deals
             SET contact_id = ?2, value = ?3, stage = ?4, stage_entered_at = ?5,
                 expected_close_date = ?6, probability = ?7, assigned_rep = ?8,
                 notes = ?9
             WHERE id = ?1",
            params![
                self.id as i64,
                self.contact_id as i64,
                self.value,
                self.stage.as_str(),
                format_timestamp(&self.stage_entered_at),
                self.expected_close_date.format(DATE_FORMAT).to_string(),
                self.probability,
                self.assigned_rep,
                self.notes,
            ],
        )
    }

    fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }
}
