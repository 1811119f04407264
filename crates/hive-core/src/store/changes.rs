//! Change feed: the durable stream of committed document transitions.
//!
//! Every document write records its before/after snapshot pair here in
//! the same SQLite transaction, so a commit and its change record are
//! inseparable. The notification dispatcher consumes the feed through
//! the `dispatch_state` cursor, giving at-least-once processing across
//! crashes and retries.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::DocumentStore;

/// One committed document transition.
///
/// `before == None` means the document was created; `after == None`
/// means it was deleted; both present means it was updated in place.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub seq: i64,
    pub path: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub committed_at: String,
}

impl ChangeRecord {
    /// The document came into existence with this commit.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    /// The document was replaced in place.
    #[must_use]
    pub const fn is_update(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }

    /// The document was removed.
    #[must_use]
    pub const fn is_delete(&self) -> bool {
        self.after.is_none()
    }
}

/// Append a change row inside the caller's open transaction.
pub(crate) fn record(
    conn: &Connection,
    path: &str,
    before: Option<&str>,
    after: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO changes (path, before, after, committed_at) VALUES (?, ?, ?, ?)",
        params![path, before, after, Utc::now().to_rfc3339()],
    )
    .context("Failed to record change")?;
    Ok(())
}

impl DocumentStore {
    /// Read all change records with `seq > after_seq`, in commit order.
    pub fn changes_after(&self, after_seq: i64) -> Result<Vec<ChangeRecord>> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT seq, path, before, after, committed_at
                 FROM changes WHERE seq > ? ORDER BY seq",
            )
            .context("Failed to prepare change query")?;

        let rows = stmt
            .query_map(params![after_seq], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("Failed to query changes")?;

        let mut records = Vec::new();
        for row in rows {
            let (seq, path, before, after, committed_at) =
                row.context("Failed to read change row")?;
            records.push(ChangeRecord {
                seq,
                path,
                before: parse_snapshot(before.as_deref())?,
                after: parse_snapshot(after.as_deref())?,
                committed_at,
            });
        }
        Ok(records)
    }

    /// Last change sequence number the dispatcher has processed.
    ///
    /// Returns 0 if nothing has been dispatched yet.
    pub fn last_dispatched_seq(&self) -> Result<i64> {
        let seq: Option<i64> = self
            .conn()
            .query_row(
                "SELECT last_seq FROM dispatch_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query dispatch_state")?;

        Ok(seq.unwrap_or(0))
    }

    /// Advance the dispatch cursor past a processed change.
    pub fn set_last_dispatched_seq(&self, seq: i64) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE dispatch_state SET last_seq = ?, last_dispatch_ts = ? WHERE id = 1",
                params![seq, Utc::now().to_rfc3339()],
            )
            .context("Failed to update dispatch_state")?;
        Ok(())
    }
}

fn parse_snapshot(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(|s| serde_json::from_str(s).context("Stored change snapshot is not valid JSON"))
        .transpose()
}
