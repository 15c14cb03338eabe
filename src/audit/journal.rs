//! Append-only, queryable Audit Journal backed by `rusqlite`.
//!
//! Grounded on the teacher's `SecurityPolicy::log_action`/`audit_log`
//! pattern (`policy/engine.rs`), generalized from an in-memory `Mutex<Vec<_>>`
//! to durable storage since this journal must survive process restarts.

use std::{path::PathBuf, sync::Mutex};

use rusqlite::{Connection, params};

use super::entry::{AuditEntry, AuditFilter, AuditResult, Severity};

/// Append-only security journal.
///
/// Write failures are caught and logged via `tracing::error!`; `log()`
/// never returns an error to the caller (§4.A/§7 — audit must not poison a
/// user task).
pub struct AuditJournal {
    conn: Mutex<Connection>,
}

impl AuditJournal {
    /// Open (creating if necessary) the sqlite database at `path`.
    pub fn open(path: &std::path::Path) -> crate::error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database, useful for tests and short-lived processes.
    pub fn open_in_memory() -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> crate::error::Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_entries (
                id TEXT PRIMARY KEY,
                event_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                agent_id TEXT,
                session_id TEXT,
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                target TEXT,
                result TEXT NOT NULL,
                detail TEXT,
                host_id TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_entries(timestamp DESC)",
            [],
        )?;
        Ok(())
    }

    /// Append `entry`. Storage failures are logged and swallowed — the
    /// caller always proceeds as if the write succeeded.
    #[tracing::instrument(skip(self, entry), fields(event_type = %entry.event_type))]
    pub fn log(&self, entry: AuditEntry) {
        if let Err(err) = self.try_log(&entry) {
            tracing::error!(error = %err, event_type = %entry.event_type, "audit write failed");
        }
    }

    fn try_log(&self, entry: &AuditEntry) -> crate::error::Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| crate::error::AgentCoreError::Storage("audit lock poisoned".into()))?;
        conn.execute(
            "INSERT INTO audit_entries
                (id, event_type, severity, timestamp, agent_id, session_id, user_id, action, target, result, detail, host_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                entry.id,
                entry.event_type,
                entry.severity.as_str(),
                entry.timestamp.to_rfc3339(),
                entry.agent_id,
                entry.session_id,
                entry.user_id,
                entry.action,
                entry.target,
                entry.result.as_str(),
                entry.detail.as_ref().map(|d| d.to_string()),
                entry.host_id,
            ],
        )?;
        Ok(())
    }

    /// Return entries matching `filter`, newest first.
    pub fn query(&self, filter: &AuditFilter) -> crate::error::Result<Vec<AuditEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| crate::error::AgentCoreError::Storage("audit lock poisoned".into()))?;

        let mut sql = String::from("SELECT id, event_type, severity, timestamp, agent_id, session_id, user_id, action, target, result, detail, host_id FROM audit_entries WHERE 1=1");
        let mut clauses: Vec<String> = Vec::new();

        if filter.since.is_some() {
            clauses.push("timestamp >= ?".to_string());
        }
        if filter.until.is_some() {
            clauses.push("timestamp <= ?".to_string());
        }
        if let Some(ref agent_id) = filter.agent_id {
            let _ = agent_id;
            clauses.push("agent_id = ?".to_string());
        }
        if let Some(ref session_id) = filter.session_id {
            let _ = session_id;
            clauses.push("session_id = ?".to_string());
        }
        if !filter.event_types.is_empty() {
            let placeholders = filter
                .event_types
                .iter()
                .map(|_| "?")
                .collect::<Vec<_>>()
                .join(",");
            clauses.push(format!("event_type IN ({placeholders})"));
        }
        if !filter.severities.is_empty() {
            let placeholders = filter
                .severities
                .iter()
                .map(|_| "?")
                .collect::<Vec<_>>()
                .join(",");
            clauses.push(format!("severity IN ({placeholders})"));
        }
        if filter.text.is_some() {
            clauses.push("(action LIKE ? OR target LIKE ?)".to_string());
        }

        for clause in &clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ? OFFSET ?");

        let mut stmt = conn.prepare(&sql)?;

        // Bind parameters in the same order the clauses were appended.
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(since) = filter.since {
            bound.push(Box::new(since.to_rfc3339()));
        }
        if let Some(until) = filter.until {
            bound.push(Box::new(until.to_rfc3339()));
        }
        if let Some(ref agent_id) = filter.agent_id {
            bound.push(Box::new(agent_id.clone()));
        }
        if let Some(ref session_id) = filter.session_id {
            bound.push(Box::new(session_id.clone()));
        }
        for et in &filter.event_types {
            bound.push(Box::new(et.clone()));
        }
        for sev in &filter.severities {
            bound.push(Box::new(sev.as_str().to_string()));
        }
        if let Some(ref text) = filter.text {
            let pattern = format!("%{text}%");
            bound.push(Box::new(pattern.clone()));
            bound.push(Box::new(pattern));
        }
        bound.push(Box::new(filter.limit));
        bound.push(Box::new(filter.offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            let severity_str: String = row.get(2)?;
            let result_str: String = row.get(9)?;
            let timestamp_str: String = row.get(3)?;
            let detail_str: Option<String> = row.get(10)?;

            Ok(AuditEntry {
                id: row.get(0)?,
                event_type: row.get(1)?,
                severity: parse_severity(&severity_str),
                timestamp: chrono::DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now()),
                agent_id: row.get(4)?,
                session_id: row.get(5)?,
                user_id: row.get(6)?,
                action: row.get(7)?,
                target: row.get(8)?,
                result: parse_result(&result_str),
                detail: detail_str.and_then(|s| serde_json::from_str(&s).ok()),
                host_id: row.get(11)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Materialize entries matching `filter` as CSV at a process-temporary path.
    ///
    /// Header row: `id, event_type, severity, timestamp (ISO-8601 UTC),
    /// agent_id, session_id, user_id, action, target, result`. Commas
    /// within `action` are replaced with semicolons.
    pub fn export(&self, filter: &AuditFilter) -> crate::error::Result<PathBuf> {
        let entries = self.query(filter)?;

        let mut out = String::from(
            "id,event_type,severity,timestamp,agent_id,session_id,user_id,action,target,result\n",
        );
        for e in &entries {
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                e.id,
                e.event_type,
                e.severity,
                e.timestamp.to_rfc3339(),
                e.agent_id.as_deref().unwrap_or(""),
                e.session_id.as_deref().unwrap_or(""),
                e.user_id,
                e.action.replace(',', ";"),
                e.target.as_deref().unwrap_or(""),
                e.result,
            ));
        }

        let path = std::env::temp_dir().join(format!("agentcore-audit-{}.csv", uuid::Uuid::new_v4()));
        std::fs::write(&path, out)?;
        Ok(path)
    }
}

fn parse_severity(s: &str) -> Severity {
    match s {
        "warning" => Severity::Warning,
        "error" => Severity::Error,
        "critical" => Severity::Critical,
        _ => Severity::Info,
    }
}

fn parse_result(s: &str) -> AuditResult {
    match s {
        "failure" => AuditResult::Failure,
        "blocked" => AuditResult::Blocked,
        "partial" => AuditResult::Partial,
        _ => AuditResult::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(action: &str) -> AuditEntry {
        AuditEntry::new("command_executed", Severity::Info, "alice", action, AuditResult::Success)
    }

    #[test]
    fn log_then_query_round_trips() {
        let journal = AuditJournal::open_in_memory().unwrap();
        journal.log(sample("ls -la"));

        let results = journal.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action, "ls -la");
    }

    #[test]
    fn logging_same_event_twice_produces_two_entries() {
        let journal = AuditJournal::open_in_memory().unwrap();
        journal.log(sample("ls -la"));
        journal.log(sample("ls -la"));

        let results = journal.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 2, "audit must never dedup identical events");
        assert_ne!(results[0].id, results[1].id);
    }

    #[test]
    fn append_only_entries_accumulate_over_time() {
        let journal = AuditJournal::open_in_memory().unwrap();
        journal.log(sample("a"));
        let first_snapshot = journal.query(&AuditFilter::new()).unwrap();

        journal.log(sample("b"));
        let second_snapshot = journal.query(&AuditFilter::new()).unwrap();

        assert!(second_snapshot.len() >= first_snapshot.len());
        let first_ids: std::collections::HashSet<_> = first_snapshot.iter().map(|e| &e.id).collect();
        assert!(
            second_snapshot.iter().all(|e| first_ids.contains(&e.id) || e.action == "b"),
            "later snapshot must be a superset of the earlier one"
        );
    }

    #[test]
    fn query_filters_by_severity() {
        let journal = AuditJournal::open_in_memory().unwrap();
        journal.log(AuditEntry::new(
            "security_violation",
            Severity::Critical,
            "alice",
            "rm -rf /",
            AuditResult::Blocked,
        ));
        journal.log(sample("ls -la"));

        let filter = AuditFilter::new().severity(Severity::Critical);
        let results = journal.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_type, "security_violation");
    }

    #[test]
    fn query_filters_by_text_substring() {
        let journal = AuditJournal::open_in_memory().unwrap();
        journal.log(sample("write_file /tmp/x"));
        journal.log(sample("read_file /tmp/y"));

        let filter = AuditFilter::new().text("write_file");
        let results = journal.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].action.contains("write_file"));
    }

    #[test]
    fn export_escapes_commas_in_action() {
        let journal = AuditJournal::open_in_memory().unwrap();
        journal.log(sample("run_command(a, b)"));

        let path = journal.export(&AuditFilter::new()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("run_command(a; b)"));
        assert!(content.starts_with(
            "id,event_type,severity,timestamp,agent_id,session_id,user_id,action,target,result"
        ));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn query_respects_limit_and_offset() {
        let journal = AuditJournal::open_in_memory().unwrap();
        for i in 0..5 {
            journal.log(sample(&format!("cmd-{i}")));
        }

        let page = journal.query(&AuditFilter::new().limit(2).offset(1)).unwrap();
        assert_eq!(page.len(), 2);
    }
}
