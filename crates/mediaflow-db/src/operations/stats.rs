//! Pipeline statistics.

use crate::database::Database;
use crate::error::DbResult;
use mediaflow_core::PipelineStats;
use std::collections::HashMap;

impl Database {
    /// Gather queue, record, and execution counts.
    pub fn get_stats(&self, queue: &str) -> DbResult<PipelineStats> {
        let (queue_pending, queue_processing, queue_done, queue_failed) = self.queue_counts(queue)?;

        let conn = self.conn()?;

        let records_by_source = group_counts(
            &conn,
            "SELECT COALESCE(source, 'unknown'), COUNT(*) FROM records GROUP BY source",
        )?;
        let executions_by_workflow = group_counts(
            &conn,
            "SELECT workflow_id, COUNT(*) FROM executions GROUP BY workflow_id",
        )?;
        drop(conn);

        Ok(PipelineStats {
            queue_pending,
            queue_processing,
            queue_done,
            queue_failed,
            total_records: records_by_source.values().sum(),
            records_by_source,
            total_executions: executions_by_workflow.values().sum(),
            executions_by_workflow,
            database_size_bytes: self.file_size()?,
        })
    }
}

fn group_counts(conn: &rusqlite::Connection, sql: &str) -> DbResult<HashMap<String, i64>> {
    let mut counts = HashMap::new();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((key, count))
    })?;
    for row in rows {
        let (key, count) = row?;
        *counts.entry(key).or_insert(0) += count;
    }
    Ok(counts)
}
