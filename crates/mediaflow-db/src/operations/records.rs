//! Knowledge record operations.

use super::queue::parse_time;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use mediaflow_core::{KnowledgeRecord, Metadata};
use rusqlite::params;

impl Database {
    /// Insert a knowledge record. Content is stored verbatim.
    pub fn insert_record(&self, record: &KnowledgeRecord) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO records (id, knowledge_base_id, content, metadata, source, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.knowledge_base_id,
                record.content,
                serde_json::to_string(&record.metadata)?,
                record.source(),
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a record by ID.
    pub fn get_record(&self, id: &str) -> DbResult<KnowledgeRecord> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, knowledge_base_id, content, metadata, created_at FROM records WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("Record not found: {}", id))
            }
            _ => DbError::from(e),
        })
    }

    /// Most recent records first, optionally only those with the given `source`.
    pub fn list_records(&self, source: Option<&str>, limit: i64) -> DbResult<Vec<KnowledgeRecord>> {
        let conn = self.conn()?;

        let records = match source {
            Some(source) => {
                let mut stmt = conn.prepare(
                    "SELECT id, knowledge_base_id, content, metadata, created_at FROM records
                     WHERE source = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![source, limit], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, knowledge_base_id, content, metadata, created_at FROM records
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(records)
    }

    /// Total number of records.
    pub fn count_records(&self) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<KnowledgeRecord> {
    let metadata_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;

    Ok(KnowledgeRecord {
        id: row.get(0)?,
        knowledge_base_id: row.get(1)?,
        content: row.get(2)?,
        metadata: serde_json::from_str::<Metadata>(&metadata_str).unwrap_or_default(),
        created_at: parse_time(&created_at_str),
    })
}
