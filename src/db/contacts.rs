//! Row mapping for the `contacts` table.

use rusqlite::{params, Connection, Row};

use super::{format_timestamp, parse_timestamp, text_conversion, SqlRecord};
use crate::types::{Contact, ContactStatus};

impl SqlRecord for Contact {
    const COLUMNS: &'static str =
        "id, name, company, email, status, assigned_rep, last_activity, created_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get(4)?;
        let last_activity: String = row.get(6)?;
        let created_at: Option<String> = row.get(7)?;
        Ok(Contact {
            id: row.get::<_, i64>(0)? as u64,
            name: row.get(1)?,
            company: row.get(2)?,
            email: row.get(3)?,
            status: status
                .parse::<ContactStatus>()
                .map_err(|e| text_conversion(4, e))?,
            assigned_rep: row.get(5)?,
            last_activity: parse_timestamp(6, &last_activity)?,
            created_at: created_at
                .as_deref()
                .map(|raw| parse_timestamp(7, raw))
                .transpose()?,
        })
    }

    fn insert(&self, conn: &Connection, id: Option<u64>) -> rusqlite::Result<u64> {
        conn.execute(
            "INSERT INTO contacts (id, name, company, email, status, assigned_rep,
                                   last_activity, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.map(|id| id as i64),
                self.name,
                self.company,
                self.email,
                self.status.as_str(),
                self.assigned_rep,
                format_timestamp(&self.last_activity),
                self.created_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(conn.last_insert_rowid() as u64)
    }

    fn write(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE contacts
             SET name = ?2, company = ?3, email = ?4, status = ?5,
                 assigned_rep = ?6, last_activity = ?7
             WHERE id = ?1",
            params![
                self.id as i64,
                self.name,
                self.company,
                self.email,
                self.status.as_str(),
                self.assigned_rep,
                format_timestamp(&self.last_activity),
            ],
        )
    }

    fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }
}
