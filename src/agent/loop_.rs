//! Execution Loop (`spec.md` §4.E).
//!
//! Drives one run from a user message to a terminal [`ExecutionResult`]:
//! calls the LLM, evaluates each requested tool call against policy, routes
//! `ask` decisions through the [`ApprovalQueue`], dispatches approved calls
//! against the [`ToolRegistry`], and records every step to both the
//! in-memory [`ExecutionSession`] and the durable [`AuditJournal`].
//!
//! Grounded on the teacher's `AgentLoop` (`agent/loop_.rs`): the same
//! `#[tracing::instrument]`d `run`/per-call dispatch split and the same
//! cooperative `AtomicBool` cancellation flag, generalized from the
//! teacher's inline 30s `EventBus` round-trip to the dedicated
//! [`ApprovalQueue`], and from the teacher's single
//! `SecurityPolicy::validate_command` call to the full policy/approval/audit
//! pipeline this core requires. `update_self` is intercepted here, never
//! dispatched to a handler, so a malicious or buggy tool can never reach it.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use uuid::Uuid;

use crate::approval::{ApprovalError, ApprovalQueue, ApprovalRequest, ApprovalStatus};
use crate::audit::{AuditEntry, AuditJournal, AuditResult, Severity};
use crate::event_bus::{AppEvent, EventBus};
use crate::llm::{
    CompletionRequest, LlmClient, Message, ToolCallRequest, ToolParameterSchema, ToolSchema,
};
use crate::policy::Decision;
use crate::tools::media::ScreenCapture;
use crate::tools::{Tool, ToolInfo, ToolRegistry};

use super::types::{AgentSnapshot, ExecutionResult, ExecutionSession, ExecutionStep, SessionStatus};

/// Tools that trigger a post-dispatch vision-feedback screenshot in
/// `agent_mode` (`spec.md` §4.E step 6 / §9). `open_application` is listed
/// in the spec's mutating set but has no corresponding built-in tool, so it
/// never matches here — a harmless dead entry kept for fidelity to the spec
/// text.
const SCREEN_MUTATING_TOOLS: &[&str] = &[
    "open_application",
    "click_mouse",
    "scroll_mouse",
    "type_text",
    "press_key",
    "run_applescript_or_platform_script",
    "take_screenshot",
];

const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 60;
const VISION_FEEDBACK_DELAY_MS: u64 = 900;

pub struct ExecutionLoop {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    approvals: Arc<ApprovalQueue>,
    audit: Arc<AuditJournal>,
    bus: Option<Arc<dyn EventBus>>,
    screen_capture: Option<Arc<dyn ScreenCapture>>,
    cancel: Option<Arc<AtomicBool>>,
    approval_timeout_secs: u64,
}

impl ExecutionLoop {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        approvals: Arc<ApprovalQueue>,
        audit: Arc<AuditJournal>,
    ) -> Self {
        Self {
            llm,
            tools,
            approvals,
            audit,
            bus: None,
            screen_capture: None,
            cancel: None,
            approval_timeout_secs: DEFAULT_APPROVAL_TIMEOUT_SECS,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_screen_capture(mut self, capture: Arc<dyn ScreenCapture>) -> Self {
        self.screen_capture = Some(capture);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_approval_timeout_secs(mut self, secs: u64) -> Self {
        self.approval_timeout_secs = secs;
        self
    }

    /// The approval queue this loop routes `ask` decisions through — exposed
    /// so a caller (or a test harness standing in for a human reviewer) can
    /// watch and decide on pending requests out of band.
    pub fn approvals(&self) -> &Arc<ApprovalQueue> {
        &self.approvals
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|f| f.load(Ordering::SeqCst)).unwrap_or(false)
    }

    /// Run one session to completion. Returns the finished session with its
    /// full step timeline and terminal [`ExecutionResult`].
    #[tracing::instrument(skip(self, user_message, snapshot), fields(agent_id = %snapshot.agent_id))]
    pub async fn run(
        &self,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        user_message: impl Into<String>,
        mut snapshot: AgentSnapshot,
    ) -> ExecutionSession {
        let mut session = ExecutionSession::new(session_id.into(), snapshot.agent_id.clone(), user_id.into());

        self.audit.log(
            AuditEntry::new(
                "session_started",
                Severity::Info,
                session.user_id.clone(),
                format!("execution session {} started", session.id),
                AuditResult::Success,
            )
            .with_agent_id(snapshot.agent_id.clone())
            .with_session_id(session.id.clone()),
        );
        if let Some(bus) = &self.bus {
            let _ = bus.publish(AppEvent::AgentStarted { session_id: session.id.clone() });
        }

        let mut messages = vec![Message::user(user_message.into())];
        let mut final_text = String::new();

        loop {
            if self.is_cancelled() {
                return self.finalize(session, SessionStatus::Cancelled, ExecutionResult::failed(final_text, "cancelled"));
            }

            let ceiling = snapshot.iteration_ceiling();
            if session.iteration >= ceiling {
                session.record(ExecutionStep::Error { message: "max iterations reached".to_string() });
                return self.finalize(
                    session,
                    SessionStatus::Failed,
                    ExecutionResult::failed(final_text, "max iterations reached"),
                );
            }
            session.iteration += 1;

            let request = self.build_request(&snapshot, messages.clone());
            let response = match self.llm.send_message(request).await {
                Ok(r) => r,
                Err(e) => {
                    session.record(ExecutionStep::Error { message: format!("llm transport failure: {e}") });
                    return self.finalize(
                        session,
                        SessionStatus::Failed,
                        ExecutionResult::failed(final_text, e.to_string()),
                    );
                }
            };

            session.record(ExecutionStep::ModelResponse {
                content: response.content.clone(),
                tool_call_count: response.tool_calls.len(),
            });

            if let Some(text) = &response.content {
                if !text.is_empty() {
                    final_text = text.clone();
                }
            }

            if response.tool_calls.is_empty() {
                messages.push(Message::assistant(response.content.unwrap_or_default()));
                return self.finalize(session, SessionStatus::Completed, ExecutionResult::ok(final_text));
            }

            messages.push(Message::assistant_with_tool_calls(
                response.content.unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            let mut dispatched_names = Vec::new();

            for call in &response.tool_calls {
                if self.is_cancelled() {
                    return self.finalize(session, SessionStatus::Cancelled, ExecutionResult::failed(final_text, "cancelled"));
                }

                let output = self.handle_tool_call(call, &mut snapshot, &mut session).await;
                dispatched_names.push(call.name.clone());
                messages.push(Message::tool_result(call.id.clone(), output));
            }

            self.maybe_capture_vision_feedback(&snapshot, &dispatched_names, &mut messages, &mut session).await;
        }
    }

    fn finalize(&self, mut session: ExecutionSession, status: SessionStatus, result: ExecutionResult) -> ExecutionSession {
        let severity = if result.success { Severity::Info } else { Severity::Error };
        let audit_result = if result.success { AuditResult::Success } else { AuditResult::Failure };
        self.audit.log(
            AuditEntry::new(
                "session_ended",
                severity,
                session.user_id.clone(),
                format!("execution session {} ended ({status:?})", session.id),
                audit_result,
            )
            .with_agent_id(session.agent_id.clone())
            .with_session_id(session.id.clone()),
        );
        if let Some(bus) = &self.bus {
            let _ = bus.publish(AppEvent::AgentComplete {
                session_id: session.id.clone(),
                message: result.output.clone(),
            });
        }
        session.finish(status, result);
        session
    }

    fn build_request(&self, snapshot: &AgentSnapshot, messages: Vec<Message>) -> CompletionRequest {
        let request = CompletionRequest::new(snapshot.model.clone(), messages)
            .with_system_prompt(snapshot.system_prompt.clone())
            .with_tools(self.build_tool_schemas(snapshot))
            .with_temperature(snapshot.temperature);
        match snapshot.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        }
    }

    /// Offered tool set: `enabled_tools` normally, every registered tool in
    /// `agent_mode`, always plus the synthetic `update_self` descriptor.
    fn build_tool_schemas(&self, snapshot: &AgentSnapshot) -> Vec<ToolSchema> {
        let infos: Vec<ToolInfo> = if snapshot.agent_mode {
            self.tools.list()
        } else {
            let enabled: HashSet<String> = snapshot.enabled_tools.iter().cloned().collect();
            self.tools.list_filtered(&enabled)
        };

        let mut schemas: Vec<ToolSchema> = infos.iter().map(tool_info_to_schema).collect();
        schemas.push(update_self_schema());
        schemas
    }

    /// Evaluate, approve, dispatch, and audit one tool call. Returns the
    /// text that goes back to the model as the `tool` message.
    async fn handle_tool_call(
        &self,
        call: &ToolCallRequest,
        snapshot: &mut AgentSnapshot,
        session: &mut ExecutionSession,
    ) -> String {
        if call.name == "update_self" {
            let summary = apply_update_self(snapshot, call);
            session.record(ExecutionStep::ToolCall {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments: call.arguments.clone(),
                risk: crate::policy::RiskLevel::Low,
            });
            session.record(ExecutionStep::ToolResult {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                output: summary.clone(),
                success: true,
            });
            self.audit.log(
                AuditEntry::new(
                    "configuration_changed",
                    Severity::Info,
                    session.user_id.clone(),
                    summary.clone(),
                    AuditResult::Success,
                )
                .with_agent_id(snapshot.agent_id.clone())
                .with_session_id(session.id.clone()),
            );
            return summary;
        }

        let Some(tool) = self.tools.get(&call.name) else {
            let msg = format!("Tool not found: {}", call.name);
            session.record(ExecutionStep::ToolResult {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                output: msg.clone(),
                success: false,
            });
            return msg;
        };

        let category = tool.category().to_string();
        let command_text = command_text_for(call);
        let path_arg = path_arg_for(call);
        let decision = snapshot.security_policy.evaluate_command(&command_text, tool.intrinsic_risk(), path_arg);

        session.record(ExecutionStep::ToolCall {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            risk: decision.risk(),
        });

        let timeout_secs = snapshot.security_policy.max_execution_time_seconds;

        let (output, success) = match decision {
            Decision::Block { risk, reasoning } => {
                self.audit.log(
                    AuditEntry::new(
                        "security_violation",
                        Severity::Critical,
                        session.user_id.clone(),
                        command_text.clone(),
                        AuditResult::Blocked,
                    )
                    .with_agent_id(snapshot.agent_id.clone())
                    .with_session_id(session.id.clone())
                    .with_target(call.name.clone())
                    .with_detail(serde_json::json!({ "risk": risk.as_str(), "reasoning": reasoning })),
                );
                (format!("Blocked: {reasoning}"), false)
            }
            Decision::Ask { risk, reasoning, impact } => {
                self.run_approval_flow(
                    call,
                    &command_text,
                    risk,
                    reasoning,
                    impact,
                    snapshot,
                    session,
                    timeout_secs,
                    &tool,
                    &category,
                )
                .await
            }
            Decision::Allow => {
                let (output, success) = dispatch_tool(&tool, call, None, timeout_secs).await;
                self.log_dispatch_audit(&call.name, &category, &command_text, success, snapshot, session);
                (output, success)
            }
        };

        session.record(ExecutionStep::ToolResult {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: output.clone(),
            success,
        });

        output
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_approval_flow(
        &self,
        call: &ToolCallRequest,
        command_text: &str,
        risk: crate::policy::RiskLevel,
        reasoning: String,
        impact: String,
        snapshot: &AgentSnapshot,
        session: &mut ExecutionSession,
        timeout_secs: u64,
        tool: &Arc<dyn Tool>,
        category: &str,
    ) -> (String, bool) {
        let approval_id = Uuid::new_v4().to_string();
        let request = ApprovalRequest::new(
            approval_id.clone(),
            session.id.clone(),
            snapshot.agent_id.clone(),
            call.name.clone(),
            command_text.to_string(),
            risk,
            reasoning,
            impact,
            self.approval_timeout_secs,
        );
        let deadline = request.expires_at;
        self.approvals.submit(request).await;
        session.record(ExecutionStep::ApprovalRequested { call_id: call.id.clone(), approval_id: approval_id.clone(), risk });

        let decision = self.approvals.await_decision(&approval_id, deadline).await;

        match decision {
            Ok(decided) => {
                session.record(ExecutionStep::ApprovalDecision {
                    approval_id: approval_id.clone(),
                    decision: format!("{:?}", decided.status),
                });
                match decided.status {
                    ApprovalStatus::Approved => {
                        self.log_approval_granted(command_text, snapshot, session);
                        let (output, success) = dispatch_tool(tool, call, None, timeout_secs).await;
                        self.log_dispatch_audit(&call.name, category, command_text, success, snapshot, session);
                        (output, success)
                    }
                    ApprovalStatus::Modified => {
                        self.log_approval_granted(command_text, snapshot, session);
                        let override_command = decided.modified_command.as_deref();
                        let (output, success) = dispatch_tool(tool, call, override_command, timeout_secs).await;
                        self.log_dispatch_audit(&call.name, category, command_text, success, snapshot, session);
                        (output, success)
                    }
                    ApprovalStatus::Denied => {
                        self.audit.log(
                            AuditEntry::new(
                                "approval_denied",
                                Severity::Warning,
                                session.user_id.clone(),
                                command_text.to_string(),
                                AuditResult::Blocked,
                            )
                            .with_agent_id(snapshot.agent_id.clone())
                            .with_session_id(session.id.clone()),
                        );
                        let reason = decided.justification.unwrap_or_else(|| "denied by operator".to_string());
                        (format!("Denied: {reason}"), false)
                    }
                    ApprovalStatus::Expired | ApprovalStatus::Pending => {
                        self.audit.log(
                            AuditEntry::new(
                                "approval_expired",
                                Severity::Warning,
                                session.user_id.clone(),
                                command_text.to_string(),
                                AuditResult::Blocked,
                            )
                            .with_agent_id(snapshot.agent_id.clone())
                            .with_session_id(session.id.clone()),
                        );
                        ("Error: approval timed out".to_string(), false)
                    }
                }
            }
            Err(ApprovalError::TimedOut) => {
                self.audit.log(
                    AuditEntry::new(
                        "approval_expired",
                        Severity::Warning,
                        session.user_id.clone(),
                        command_text.to_string(),
                        AuditResult::Blocked,
                    )
                    .with_agent_id(snapshot.agent_id.clone())
                    .with_session_id(session.id.clone()),
                );
                ("Error: approval timed out".to_string(), false)
            }
            Err(e) => (format!("Error: {e}"), false),
        }
    }

    fn log_approval_granted(&self, command_text: &str, snapshot: &AgentSnapshot, session: &ExecutionSession) {
        self.audit.log(
            AuditEntry::new(
                "approval_granted",
                Severity::Info,
                session.user_id.clone(),
                command_text.to_string(),
                AuditResult::Success,
            )
            .with_agent_id(snapshot.agent_id.clone())
            .with_session_id(session.id.clone()),
        );
    }

    fn log_dispatch_audit(
        &self,
        tool_name: &str,
        category: &str,
        command_text: &str,
        success: bool,
        snapshot: &AgentSnapshot,
        session: &ExecutionSession,
    ) {
        let event_type = if is_privileged_command(command_text) {
            "sudo_executed"
        } else {
            audit_event_type(tool_name, category)
        };
        let severity = if success { Severity::Info } else { Severity::Error };
        let result = if success { AuditResult::Success } else { AuditResult::Failure };
        self.audit.log(
            AuditEntry::new(event_type, severity, session.user_id.clone(), command_text.to_string(), result)
                .with_agent_id(snapshot.agent_id.clone())
                .with_session_id(session.id.clone())
                .with_target(tool_name.to_string()),
        );
    }

    async fn maybe_capture_vision_feedback(
        &self,
        snapshot: &AgentSnapshot,
        dispatched_names: &[String],
        messages: &mut Vec<Message>,
        session: &mut ExecutionSession,
    ) {
        if !snapshot.agent_mode {
            return;
        }
        if !dispatched_names.iter().any(|n| SCREEN_MUTATING_TOOLS.contains(&n.as_str())) {
            return;
        }
        let Some(capture) = &self.screen_capture else {
            return;
        };

        tokio::time::sleep(std::time::Duration::from_millis(VISION_FEEDBACK_DELAY_MS)).await;

        let destination = std::env::temp_dir().join(format!("agentcore-vision-{}.jpg", Uuid::new_v4()));
        let Ok(path) = capture.capture(&destination.to_string_lossy()).await else {
            return;
        };
        let Ok(bytes) = std::fs::read(&path) else {
            return;
        };

        let image = crate::llm::ImageBlock { data: STANDARD.encode(bytes), mime_type: "image/jpeg".to_string() };
        messages.push(Message::user_with_image("current screen state after the last action", image));
        session.record(ExecutionStep::ScreenshotObservation { path });
    }
}

fn apply_update_self(snapshot: &mut AgentSnapshot, call: &ToolCallRequest) -> String {
    let mut changed = Vec::new();

    if let Some(model) = call.arguments.get("model") {
        snapshot.model = model.clone();
        changed.push("model");
    }
    if let Some(prompt) = call.arguments.get("system_prompt") {
        snapshot.system_prompt = prompt.clone();
        changed.push("system_prompt");
    }
    if let Some(temp) = call.arguments.get("temperature").and_then(|v| v.parse::<f32>().ok()) {
        snapshot.temperature = AgentSnapshot::clamp_temperature(temp);
        changed.push("temperature");
    }
    if let Some(max_tokens) = call.arguments.get("max_tokens").and_then(|v| v.parse::<u32>().ok()) {
        snapshot.max_tokens = Some(max_tokens);
        changed.push("max_tokens");
    }

    if changed.is_empty() {
        "update_self: no recognized fields were provided".to_string()
    } else {
        format!("update_self: updated {}", changed.join(", "))
    }
}

fn command_text_for(call: &ToolCallRequest) -> String {
    for key in ["command", "script", "code", "url"] {
        if let Some(value) = call.arguments.get(key) {
            // Passed verbatim to `SecurityPolicy::evaluate_command`: prefixing
            // this with the tool name would shift every prefix-anchored check
            // (privilege tokens, allowlist entries) off the actual command.
            return value.clone();
        }
    }
    if call.arguments.is_empty() {
        return call.name.clone();
    }
    let mut parts: Vec<String> = call.arguments.iter().map(|(k, v)| format!("{k}={v}")).collect();
    parts.sort();
    format!("{} {}", call.name, parts.join(" "))
}

fn path_arg_for(call: &ToolCallRequest) -> Option<&str> {
    call.arguments
        .get("path")
        .or_else(|| call.arguments.get("destination"))
        .or_else(|| call.arguments.get("working_dir"))
        .map(String::as_str)
}

fn is_privileged_command(command: &str) -> bool {
    let trimmed = command.trim_start();
    trimmed.starts_with("sudo ") || trimmed.starts_with("su -") || trimmed.starts_with("su root")
}

fn audit_event_type(tool_name: &str, category: &str) -> &'static str {
    match category {
        "shell" | "code_exec" | "git" => "command_executed",
        "network" => "network_request",
        "file_ops" => {
            if matches!(
                tool_name,
                "write_file" | "append_to_file" | "move_file" | "copy_file" | "create_directory" | "delete_file"
            ) {
                "file_modified"
            } else {
                "file_accessed"
            }
        }
        _ => "tool_executed",
    }
}

fn args_to_json(arguments: &HashMap<String, String>) -> Value {
    let map = arguments
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::from_str(v).unwrap_or_else(|_| Value::String(v.clone()))))
        .collect();
    Value::Object(map)
}

async fn dispatch_tool(
    tool: &Arc<dyn Tool>,
    call: &ToolCallRequest,
    override_command: Option<&str>,
    timeout_secs: u64,
) -> (String, bool) {
    let mut args = args_to_json(&call.arguments);
    if let Some(cmd) = override_command {
        if let Value::Object(map) = &mut args {
            map.insert("command".to_string(), Value::String(cmd.to_string()));
        }
    }

    let budget = std::time::Duration::from_secs(timeout_secs.max(1));
    match tokio::time::timeout(budget, tool.execute(args)).await {
        Ok(Ok(result)) => (result.output, result.success),
        Ok(Err(e)) => (format!("Error: {e}"), false),
        Err(_) => ("Error: timeout".to_string(), false),
    }
}

fn tool_info_to_schema(info: &ToolInfo) -> ToolSchema {
    ToolSchema { name: info.name.clone(), description: info.description.clone(), parameters: json_schema_to_params(&info.schema) }
}

fn json_schema_to_params(schema: &Value) -> Vec<ToolParameterSchema> {
    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: HashSet<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    props
        .iter()
        .map(|(name, prop)| ToolParameterSchema {
            name: name.clone(),
            description: prop.get("description").and_then(Value::as_str).unwrap_or_default().to_string(),
            param_type: prop.get("type").and_then(Value::as_str).unwrap_or("string").to_string(),
            enum_values: prop
                .get("enum")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()),
            required: required.contains(name.as_str()),
        })
        .collect()
}

fn update_self_schema() -> ToolSchema {
    ToolSchema {
        name: "update_self".to_string(),
        description: "Update this agent's own model, system prompt, temperature, or max_tokens. Takes effect on the next iteration.".to_string(),
        parameters: vec![
            ToolParameterSchema {
                name: "model".to_string(),
                description: "New model identifier".to_string(),
                param_type: "string".to_string(),
                enum_values: None,
                required: false,
            },
            ToolParameterSchema {
                name: "system_prompt".to_string(),
                description: "New system prompt".to_string(),
                param_type: "string".to_string(),
                enum_values: None,
                required: false,
            },
            ToolParameterSchema {
                name: "temperature".to_string(),
                description: "New sampling temperature; clamped to [0, 2]".to_string(),
                param_type: "number".to_string(),
                enum_values: None,
                required: false,
            },
            ToolParameterSchema {
                name: "max_tokens".to_string(),
                description: "New max_tokens ceiling".to_string(),
                param_type: "integer".to_string(),
                enum_values: None,
                required: false,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockTurn};
    use crate::policy::{RiskLevel, SecurityPolicy};
    use crate::tools::file_ops::WriteFileTool;
    use crate::tools::screen_control::{ClickMouseTool, HeadlessScreenController};
    use crate::tools::shell::ExecuteCommandTool;
    use crate::tools::system::GetCurrentDatetimeTool;
    use async_trait::async_trait;

    fn snapshot(agent_mode: bool) -> AgentSnapshot {
        AgentSnapshot::new("agent-1", "mock", "you are helpful")
            .with_enabled_tools(vec![
                "get_current_datetime".to_string(),
                "write_file".to_string(),
                "execute_command".to_string(),
                "click_mouse".to_string(),
            ])
            .with_agent_mode(agent_mode)
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(GetCurrentDatetimeTool));
        reg.register(Arc::new(WriteFileTool));
        reg.register(Arc::new(ExecuteCommandTool));
        reg.register(Arc::new(ClickMouseTool { backend: Arc::new(HeadlessScreenController) }));
        Arc::new(reg)
    }

    fn exec_loop(llm: MockLlmClient) -> ExecutionLoop {
        ExecutionLoop::new(
            Arc::new(llm),
            registry(),
            Arc::new(ApprovalQueue::new()),
            Arc::new(AuditJournal::open_in_memory().unwrap()),
        )
    }

    fn tool_call(name: &str, args: &[(&str, &str)]) -> ToolCallRequest {
        ToolCallRequest {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            arguments: args.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    // ── S1: safe read path ──────────────────────────────────────────────

    #[tokio::test]
    async fn s1_low_risk_tool_call_auto_approves_and_completes() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("get_current_datetime", &[])]),
            MockTurn::Text("all done".to_string()),
        ]);
        let exec = exec_loop(llm);
        let session = exec.run("s1", "alice", "what time is it?", snapshot(false)).await;

        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.result.unwrap().output, "all done");
    }

    // ── S2: dangerous shell blocked ─────────────────────────────────────

    #[tokio::test]
    async fn s2_catastrophic_command_is_blocked_not_dispatched() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("execute_command", &[("command", "rm -rf /")])]),
            MockTurn::Text("acknowledged".to_string()),
        ]);
        let exec = exec_loop(llm);
        let session = exec.run("s2", "alice", "clean up", snapshot(false)).await;

        let blocked = session.steps.iter().any(|s| matches!(
            s,
            ExecutionStep::ToolResult { output, success: false, .. } if output.starts_with("Blocked:") && output.contains("critical pattern")
        ));
        assert!(blocked, "expected a Blocked tool result, got: {:?}", session.steps);
    }

    // ── S3: approval roundtrip ───────────────────────────────────────────

    #[tokio::test]
    async fn s3_medium_risk_write_approved_within_timeout() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("write_file", &[("path", "/tmp/agentcore-test.txt"), ("content", "hi")])]),
            MockTurn::Text("wrote it".to_string()),
        ]);
        let exec = Arc::new(exec_loop(llm).with_approval_timeout_secs(5));

        let exec2 = Arc::clone(&exec);
        let approver = tokio::spawn(async move {
            for _ in 0..50 {
                if let Some(req) = exec2.approvals().current().await {
                    exec2.approvals().approve(&req.id, Some("looks fine".to_string()), None).await.unwrap();
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        });

        let mut snap = snapshot(false);
        snap.security_policy = SecurityPolicy { require_approval: true, ..SecurityPolicy::default() };
        let session = exec.run("s3", "alice", "write the file", snap).await;
        approver.await.unwrap();

        assert_eq!(session.status, SessionStatus::Completed);
        let _ = std::fs::remove_file("/tmp/agentcore-test.txt");
    }

    // ── S4: approval expiry ──────────────────────────────────────────────

    #[tokio::test]
    async fn s4_unanswered_approval_expires_and_surfaces_as_error() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("write_file", &[("path", "/tmp/agentcore-test2.txt"), ("content", "hi")])]),
            MockTurn::Text("done".to_string()),
        ]);
        let exec = exec_loop(llm).with_approval_timeout_secs(0);

        let session = exec.run("s4", "alice", "write the file", snapshot(false)).await;

        let timed_out = session.steps.iter().any(|s| matches!(
            s,
            ExecutionStep::ToolResult { output, success: false, .. } if output.contains("approval timed out")
        ));
        assert!(timed_out, "expected an approval-timeout tool result, got: {:?}", session.steps);
    }

    // ── S5: vision feedback loop ──────────────────────────────────────────

    struct StubCapture {
        path: std::path::PathBuf,
    }

    #[async_trait]
    impl ScreenCapture for StubCapture {
        async fn capture(&self, _destination: &str) -> Result<String, String> {
            Ok(self.path.to_string_lossy().to_string())
        }
    }

    #[tokio::test]
    async fn s5_agent_mode_click_triggers_screenshot_observation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, b"not-a-real-jpeg").unwrap();

        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("click_mouse", &[])]),
            MockTurn::Text("clicked".to_string()),
        ]);
        let exec = exec_loop(llm).with_screen_capture(Arc::new(StubCapture { path }));

        let session = exec.run("s5", "alice", "click the button", snapshot(true)).await;

        let observed = session.steps.iter().any(|s| matches!(s, ExecutionStep::ScreenshotObservation { .. }));
        assert!(observed, "expected a screenshot_observation step, got: {:?}", session.steps);
    }

    #[tokio::test]
    async fn headless_capture_degrades_silently_without_a_step() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("click_mouse", &[])]),
            MockTurn::Text("clicked".to_string()),
        ]);
        let exec = exec_loop(llm); // no screen_capture configured
        let session = exec.run("s5b", "alice", "click the button", snapshot(true)).await;

        let observed = session.steps.iter().any(|s| matches!(s, ExecutionStep::ScreenshotObservation { .. }));
        assert!(!observed);
        assert_eq!(session.status, SessionStatus::Completed);
    }

    // ── S6: ceiling trip ──────────────────────────────────────────────────

    #[tokio::test]
    async fn s6_non_agent_mode_ceiling_trips_at_ten_iterations() {
        let turns: Vec<MockTurn> = (0..12)
            .map(|_| MockTurn::ToolCalls(vec![tool_call("get_current_datetime", &[])]))
            .collect();
        let llm = MockLlmClient::new(turns);
        let exec = exec_loop(llm);

        let session = exec.run("s6", "alice", "loop forever", snapshot(false)).await;

        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.model_response_count(), 10);
        assert!(session.result.unwrap().error.unwrap().contains("max iterations"));
    }

    #[tokio::test]
    async fn agent_mode_raises_ceiling_to_thirty() {
        let turns: Vec<MockTurn> = (0..32)
            .map(|_| MockTurn::ToolCalls(vec![tool_call("get_current_datetime", &[])]))
            .collect();
        let llm = MockLlmClient::new(turns);
        let exec = exec_loop(llm);

        let session = exec.run("s6b", "alice", "loop forever", snapshot(true)).await;

        assert_eq!(session.model_response_count(), 30);
    }

    // ── Invariant 7: update_self is never dispatched to a handler ───────

    #[tokio::test]
    async fn update_self_never_reaches_tool_registry() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("update_self", &[("temperature", "5.0")])]),
            MockTurn::Text("updated".to_string()),
        ]);
        let exec = exec_loop(llm);
        let mut snap = snapshot(false);
        snap.temperature = 0.7;
        let session = exec.run("s7", "alice", "be more creative", snap).await;

        assert_eq!(session.status, SessionStatus::Completed);
        let updated = session.steps.iter().any(|s| matches!(
            s,
            ExecutionStep::ToolResult { tool_name, output, success: true, .. }
                if tool_name == "update_self" && output.contains("temperature")
        ));
        assert!(updated);
    }

    // ── Invariant 6: risk monotonicity surfaces through to the step log ──

    #[tokio::test]
    async fn tool_call_step_records_risk_at_or_above_intrinsic() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("execute_command", &[("command", "rm file.txt")])]),
            MockTurn::Text("ok".to_string()),
        ]);
        let exec = exec_loop(llm).with_approval_timeout_secs(0);
        let mut snap = snapshot(false);
        snap.security_policy = SecurityPolicy { require_approval: true, ..SecurityPolicy::default() };
        let session = exec.run("s8", "alice", "remove the file", snap).await;

        let recorded_risk = session.steps.iter().find_map(|s| match s {
            ExecutionStep::ToolCall { risk, .. } => Some(*risk),
            _ => None,
        });
        assert!(recorded_risk.unwrap() >= RiskLevel::High, "shell execute_command is intrinsically High risk");
    }

    #[test]
    fn command_text_prefers_named_command_bearing_arguments() {
        let call = tool_call("execute_command", &[("command", "ls -la")]);
        assert_eq!(command_text_for(&call), "ls -la");
    }

    #[test]
    fn command_text_is_not_tool_name_prefixed_so_policy_prefix_checks_still_work() {
        // A regression check for the bug where `command_text_for` returned
        // "execute_command sudo rm foo", which defeated every
        // prefix-anchored check (privilege tokens, allowlist entries) in
        // the policy engine.
        let call = tool_call("execute_command", &[("command", "sudo rm foo")]);
        let text = command_text_for(&call);
        assert_eq!(text, "sudo rm foo");
        assert!(is_privileged_command(&text));

        let policy = SecurityPolicy { allow_privileged_shell: false, ..SecurityPolicy::default() };
        let decision = policy.evaluate_command(&text, RiskLevel::High, None);
        assert!(matches!(decision, Decision::Block { .. }), "expected privileged shell to be blocked, got {decision:?}");
    }

    #[test]
    fn args_to_json_parses_numeric_and_boolean_looking_strings() {
        let args = HashMap::from([("x".to_string(), "42".to_string()), ("flag".to_string(), "true".to_string())]);
        let value = args_to_json(&args);
        assert_eq!(value["x"], serde_json::json!(42));
        assert_eq!(value["flag"], serde_json::json!(true));
    }

    // ── S3 audit trail: approval_granted precedes the file_modified entry ──

    #[tokio::test]
    async fn s3_approval_flow_logs_approval_granted_then_file_modified() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("write_file", &[("path", "/tmp/agentcore-test3.txt"), ("content", "hi")])]),
            MockTurn::Text("wrote it".to_string()),
        ]);
        let audit = Arc::new(AuditJournal::open_in_memory().unwrap());
        let exec = Arc::new(ExecutionLoop::new(
            Arc::new(llm),
            registry(),
            Arc::new(ApprovalQueue::new()),
            audit.clone(),
        ));

        let exec2 = Arc::clone(&exec);
        let approver = tokio::spawn(async move {
            for _ in 0..50 {
                if let Some(req) = exec2.approvals().current().await {
                    exec2.approvals().approve(&req.id, Some("looks fine".to_string()), None).await.unwrap();
                    return;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        });

        let mut snap = snapshot(false);
        snap.security_policy = SecurityPolicy { require_approval: true, ..SecurityPolicy::default() };
        let session = exec.run("s3b", "alice", "write the file", snap).await;
        approver.await.unwrap();
        let _ = std::fs::remove_file("/tmp/agentcore-test3.txt");

        assert_eq!(session.status, SessionStatus::Completed);

        let entries = audit.query(&crate::audit::AuditFilter::new()).unwrap();
        let granted_index = entries.iter().position(|e| e.event_type == "approval_granted");
        let modified_index = entries.iter().position(|e| e.event_type == "file_modified");
        assert!(granted_index.is_some(), "expected an approval_granted entry, got: {entries:?}");
        assert!(modified_index.is_some(), "expected a file_modified entry, got: {entries:?}");
        assert!(granted_index.unwrap() < modified_index.unwrap());
        assert_eq!(entries[granted_index.unwrap()].result, AuditResult::Success);
    }

    #[tokio::test]
    async fn s4_expiry_is_audited_as_blocked_not_failure() {
        let llm = MockLlmClient::new(vec![
            MockTurn::ToolCalls(vec![tool_call("write_file", &[("path", "/tmp/agentcore-test4.txt"), ("content", "hi")])]),
            MockTurn::Text("done".to_string()),
        ]);
        let audit = Arc::new(AuditJournal::open_in_memory().unwrap());
        let exec = ExecutionLoop::new(
            Arc::new(llm),
            registry(),
            Arc::new(ApprovalQueue::new()),
            audit.clone(),
        )
        .with_approval_timeout_secs(0);

        let _ = exec.run("s4b", "alice", "write the file", snapshot(false)).await;

        let entries = audit.query(&crate::audit::AuditFilter::new()).unwrap();
        let expired = entries.iter().find(|e| e.event_type == "approval_expired");
        assert!(expired.is_some(), "expected an approval_expired entry, got: {entries:?}");
        assert_eq!(expired.unwrap().result, AuditResult::Blocked);
    }
}
