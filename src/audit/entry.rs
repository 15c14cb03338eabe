//! Audit Entry data model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
    Blocked,
    Partial,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Failure => "failure",
            AuditResult::Blocked => "blocked",
            AuditResult::Partial => "partial",
        }
    }
}

impl std::fmt::Display for AuditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One write-once entry in the audit journal.
///
/// Entries are never updated or deleted — see `journal::AuditJournal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub event_type: String,
    pub severity: Severity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: String,
    pub action: String,
    pub target: Option<String>,
    pub result: AuditResult,
    pub detail: Option<serde_json::Value>,
    pub host_id: String,
}

impl AuditEntry {
    /// Build a new entry; `id` and `timestamp` are filled in automatically.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_type: impl Into<String>,
        severity: Severity,
        user_id: impl Into<String>,
        action: impl Into<String>,
        result: AuditResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            severity,
            timestamp: chrono::Utc::now(),
            agent_id: None,
            session_id: None,
            user_id: user_id.into(),
            action: action.into(),
            target: None,
            result,
            detail: None,
            host_id: host_identifier(),
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

fn host_identifier() -> String {
    hostname_os()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

fn hostname_os() -> Option<String> {
    // `hostname` crate is not in the dependency table; the teacher's own
    // code reaches for `std::env` / `dirs` rather than shelling out, so we
    // do the same here via a lightweight syscall-free fallback.
    std::env::var("HOST").ok()
}

/// Filter criteria for `AuditJournal::query` / `export`.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub until: Option<chrono::DateTime<chrono::Utc>>,
    pub event_types: Vec<String>,
    pub severities: Vec<Severity>,
    pub agent_id: Option<String>,
    pub session_id: Option<String>,
    /// Substring match against `action` or `target`.
    pub text: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn since(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.since = Some(ts);
        self
    }

    pub fn until(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.until = Some(ts);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severities.push(severity);
        self
    }

    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}
