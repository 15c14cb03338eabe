//! Execution Session data model (`spec.md` §3).
//!
//! These types are the persisted/observable record of one run of the
//! Execution Loop: the session itself, the ordered steps it produced, and
//! the snapshot of agent configuration it ran against. None of them know
//! how to run a loop — see `agent::loop_::ExecutionLoop` for that.

use serde::{Deserialize, Serialize};

use crate::policy::{RiskLevel, SecurityPolicy};

/// A point-in-time copy of the agent configuration a session is running
/// against. Taken fresh at the start of every iteration (`spec.md` §9) so
/// an `update_self` call takes effect on the next step, never mid-step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub enabled_tools: Vec<String>,
    pub agent_mode: bool,
    pub security_policy: SecurityPolicy,
}

impl AgentSnapshot {
    pub fn new(agent_id: impl Into<String>, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature: 0.7,
            max_tokens: None,
            enabled_tools: Vec::new(),
            agent_mode: false,
            security_policy: SecurityPolicy::default(),
        }
    }

    pub fn with_enabled_tools(mut self, tools: Vec<String>) -> Self {
        self.enabled_tools = tools;
        self
    }

    pub fn with_agent_mode(mut self, agent_mode: bool) -> Self {
        self.agent_mode = agent_mode;
        self
    }

    pub fn with_security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.security_policy = policy;
        self
    }

    /// Iteration ceiling for this snapshot: 30 in agent mode, 10 otherwise.
    pub fn iteration_ceiling(&self) -> usize {
        if self.agent_mode { 30 } else { 10 }
    }

    /// Clamp a proposed temperature update into `update_self`'s valid range.
    pub fn clamp_temperature(value: f32) -> f32 {
        value.clamp(0.0, 2.0)
    }
}

/// One recorded step in an execution session's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionStep {
    Thinking {
        content: String,
    },
    ModelResponse {
        content: Option<String>,
        tool_call_count: usize,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: std::collections::HashMap<String, String>,
        risk: RiskLevel,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        output: String,
        success: bool,
    },
    ApprovalRequested {
        call_id: String,
        approval_id: String,
        risk: RiskLevel,
    },
    ApprovalDecision {
        approval_id: String,
        decision: String,
    },
    ScreenshotObservation {
        path: String,
    },
    Error {
        message: String,
    },
}

/// Terminal outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

/// Final result persisted when a session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), error: None }
    }

    pub fn failed(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self { success: false, output: output.into(), error: Some(error.into()) }
    }
}

/// One run of the Execution Loop, start to finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub id: String,
    pub agent_id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub steps: Vec<ExecutionStep>,
    pub iteration: usize,
    pub result: Option<ExecutionResult>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExecutionSession {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            user_id: user_id.into(),
            status: SessionStatus::Running,
            steps: Vec::new(),
            iteration: 0,
            result: None,
            started_at: chrono::Utc::now(),
            ended_at: None,
        }
    }

    pub fn record(&mut self, step: ExecutionStep) {
        self.steps.push(step);
    }

    pub fn finish(&mut self, status: SessionStatus, result: ExecutionResult) {
        self.status = status;
        self.result = Some(result);
        self.ended_at = Some(chrono::Utc::now());
    }

    /// Number of `model_response` steps recorded so far — used to check the
    /// bounded-loop property (`spec.md` §8.4).
    pub fn model_response_count(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, ExecutionStep::ModelResponse { .. })).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_ceiling_raises_in_agent_mode() {
        let snapshot = AgentSnapshot::new("agent-1", "gpt-4", "you are an agent");
        assert_eq!(snapshot.iteration_ceiling(), 10);
        assert_eq!(snapshot.with_agent_mode(true).iteration_ceiling(), 30);
    }

    #[test]
    fn clamp_temperature_respects_bounds() {
        assert_eq!(AgentSnapshot::clamp_temperature(-1.0), 0.0);
        assert_eq!(AgentSnapshot::clamp_temperature(5.0), 2.0);
        assert_eq!(AgentSnapshot::clamp_temperature(1.3), 1.3);
    }

    #[test]
    fn session_tracks_model_response_steps() {
        let mut session = ExecutionSession::new("s1", "agent-1", "alice");
        session.record(ExecutionStep::ModelResponse { content: Some("hi".into()), tool_call_count: 0 });
        session.record(ExecutionStep::ToolCall {
            call_id: "c1".into(),
            tool_name: "read_file".into(),
            arguments: Default::default(),
            risk: RiskLevel::Low,
        });
        session.record(ExecutionStep::ModelResponse { content: None, tool_call_count: 1 });
        assert_eq!(session.model_response_count(), 2);
    }

    #[test]
    fn finish_sets_terminal_status_and_end_time() {
        let mut session = ExecutionSession::new("s1", "agent-1", "alice");
        session.finish(SessionStatus::Completed, ExecutionResult::ok("done"));
        assert!(session.status.is_terminal());
        assert!(session.ended_at.is_some());
        assert!(session.result.unwrap().success);
    }
}
