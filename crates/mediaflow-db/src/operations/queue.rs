//! Routing-message queue operations.
//!
//! Messages move pending → processing → done | failed. Receiving marks a
//! batch as processing and bumps its attempt counter. A message left
//! processing past its visibility timeout goes back to pending; failed
//! messages stay failed until explicitly retried.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Duration, Utc};
use mediaflow_core::{QueueMessage, QueueStatus};
use rusqlite::params;

const MESSAGE_COLUMNS: &str =
    "id, queue, body, status, attempts, error, created_at, started_at, completed_at";

impl Database {
    /// Add a message to its queue.
    pub fn enqueue(&self, message: &QueueMessage) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO messages (id, queue, body, status, attempts, error, created_at, started_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                message.id,
                message.queue,
                message.body,
                message.status.as_str(),
                message.attempts,
                message.error,
                message.created_at.to_rfc3339(),
                message.started_at.map(|dt| dt.to_rfc3339()),
                message.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Get a message by ID.
    pub fn get_message(&self, id: &str) -> DbResult<QueueMessage> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS),
            params![id],
            row_to_message,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("Message not found: {}", id))
            }
            _ => DbError::from(e),
        })
    }

    /// Take up to `max` pending messages, oldest first, and mark them processing.
    pub fn receive(&self, queue: &str, max: usize) -> DbResult<Vec<QueueMessage>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM messages
                 WHERE queue = ?1 AND status = 'pending'
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![queue, max as i64], |row| row.get(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut batch = Vec::with_capacity(ids.len());
        for id in &ids {
            tx.execute(
                "UPDATE messages SET status = 'processing', started_at = ?2, attempts = attempts + 1 WHERE id = ?1",
                params![id, now],
            )?;
            let message = tx.query_row(
                &format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS),
                params![id],
                row_to_message,
            )?;
            batch.push(message);
        }

        tx.commit()?;
        Ok(batch)
    }

    /// Mark a message as successfully handled.
    pub fn mark_completed(&self, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE messages SET status = 'done', completed_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Message not found: {}", id)));
        }
        Ok(())
    }

    /// Mark a message as failed, recording the error.
    pub fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE messages SET status = 'failed', error = ?2, completed_at = ?3 WHERE id = ?1",
            params![id, error, now],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Message not found: {}", id)));
        }
        Ok(())
    }

    /// Return messages claimed longer than `timeout` ago to pending, so a
    /// consumer that died mid-batch does not strand them. Returns how many moved.
    pub fn requeue_stale(&self, queue: &str, timeout: Duration) -> DbResult<usize> {
        let Some(cutoff) = Utc::now().checked_sub_signed(timeout) else {
            return Ok(0);
        };
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let claimed: Vec<(String, Option<String>)> = {
            let mut stmt = tx.prepare(
                "SELECT id, started_at FROM messages WHERE queue = ?1 AND status = 'processing'",
            )?;
            let rows = stmt.query_map(params![queue], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut moved = 0;
        for (id, started_at) in claimed {
            let expired = match parse_optional_time(started_at) {
                Some(started) => started <= cutoff,
                None => true,
            };
            if expired {
                moved += tx.execute(
                    "UPDATE messages SET status = 'pending', started_at = NULL WHERE id = ?1 AND status = 'processing'",
                    params![id],
                )?;
            }
        }

        tx.commit()?;
        Ok(moved)
    }

    /// Put every failed message of a queue back to pending. Returns how many moved.
    pub fn retry_failed(&self, queue: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE messages SET status = 'pending', error = NULL, started_at = NULL, completed_at = NULL
             WHERE queue = ?1 AND status = 'failed'",
            params![queue],
        )?;
        Ok(rows)
    }

    /// List messages of a queue, optionally filtered by status.
    pub fn list_messages(&self, queue: &str, status: Option<QueueStatus>) -> DbResult<Vec<QueueMessage>> {
        let conn = self.conn()?;

        let messages = match status {
            Some(s) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM messages WHERE queue = ?1 AND status = ?2 ORDER BY created_at ASC, rowid ASC",
                    MESSAGE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![queue, s.as_str()], row_to_message)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM messages WHERE queue = ?1 ORDER BY created_at ASC, rowid ASC",
                    MESSAGE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![queue], row_to_message)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(messages)
    }

    /// Delete completed messages of a queue.
    pub fn clear_completed(&self, queue: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute(
            "DELETE FROM messages WHERE queue = ?1 AND status = 'done'",
            params![queue],
        )?;
        Ok(count)
    }

    /// Message counts of a queue as (pending, processing, done, failed).
    pub fn queue_counts(&self, queue: &str) -> DbResult<(i64, i64, i64, i64)> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM messages WHERE queue = ?1 GROUP BY status")?;
        let rows = stmt.query_map(params![queue], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let (mut pending, mut processing, mut done, mut failed) = (0, 0, 0, 0);
        for row in rows {
            let (status, count) = row?;
            match QueueStatus::from_str(&status) {
                Some(QueueStatus::Pending) => pending = count,
                Some(QueueStatus::Processing) => processing = count,
                Some(QueueStatus::Done) => done = count,
                Some(QueueStatus::Failed) => failed = count,
                None => {}
            }
        }

        Ok((pending, processing, done, failed))
    }
}

pub(crate) fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<QueueMessage> {
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(6)?;

    Ok(QueueMessage {
        id: row.get(0)?,
        queue: row.get(1)?,
        body: row.get(2)?,
        status: QueueStatus::from_str(&status_str).unwrap_or(QueueStatus::Pending),
        attempts: row.get(4)?,
        error: row.get(5)?,
        created_at: parse_time(&created_at_str),
        started_at: parse_optional_time(row.get(7)?),
        completed_at: parse_optional_time(row.get(8)?),
    })
}
