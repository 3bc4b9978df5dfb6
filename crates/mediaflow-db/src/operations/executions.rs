//! Workflow execution log.

use super::queue::parse_time;
use crate::database::Database;
use crate::error::DbResult;
use mediaflow_core::WorkflowExecution;
use rusqlite::params;

impl Database {
    /// Record a started workflow execution.
    pub fn insert_execution(&self, execution: &WorkflowExecution) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO executions (id, workflow_id, input, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                execution.id,
                execution.workflow_id,
                serde_json::to_string(&execution.input)?,
                execution.started_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent executions first, optionally for a single workflow.
    pub fn list_executions(&self, workflow_id: Option<&str>, limit: i64) -> DbResult<Vec<WorkflowExecution>> {
        let conn = self.conn()?;

        let rows: Vec<(String, String, String, String)> = match workflow_id {
            Some(workflow_id) => {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, input, started_at FROM executions
                     WHERE workflow_id = ?1 ORDER BY started_at DESC, rowid DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![workflow_id, limit], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, input, started_at FROM executions
                     ORDER BY started_at DESC, rowid DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        rows.into_iter()
            .map(|(id, workflow_id, input, started_at)| -> DbResult<WorkflowExecution> {
                Ok(WorkflowExecution {
                    id,
                    workflow_id,
                    input: serde_json::from_str(&input)?,
                    started_at: parse_time(&started_at),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaflow_core::WorkflowInput;

    fn input(key: &str) -> WorkflowInput {
        WorkflowInput {
            bucket_name: "media".to_string(),
            object_key: key.to_string(),
            filename: key.rsplit('/').next().unwrap().to_string(),
            file_extension: ".pdf".to_string(),
        }
    }

    #[test]
    fn test_execution_log() {
        let db = Database::open_in_memory().unwrap();
        db.insert_execution(&WorkflowExecution::new("extract", input("processed/a.pdf"))).unwrap();
        db.insert_execution(&WorkflowExecution::new("transcribe", input("processed/b.mp4"))).unwrap();

        let all = db.list_executions(None, 10).unwrap();
        assert_eq!(all.len(), 2);

        let extract = db.list_executions(Some("extract"), 10).unwrap();
        assert_eq!(extract.len(), 1);
        assert_eq!(extract[0].input, input("processed/a.pdf"));
    }
}
