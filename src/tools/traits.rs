use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::RiskLevel;

/// The result of executing a [`Tool`].
///
/// Handlers never propagate a Rust-level error for expected failures (bad
/// argument, I/O failure, nonzero exit, timeout) — those resolve to
/// `ToolResult::err` with an `Error: `-prefixed message, per the contract
/// that the model always receives text it can react to. The `Result` wrapper
/// on [`Tool::execute`] is reserved for truly exceptional conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Human-readable output (stdout, file contents, directory listing, etc.).
    pub output: String,
    /// Whether the tool considered the execution successful.
    pub success: bool,
    /// Optional structured metadata for machine consumption.
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            metadata: None,
        }
    }

    /// Build a failure result, prefixing `reason` with `Error: ` if it
    /// doesn't already carry one of the spec's recognized prefixes.
    pub fn err(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let output = if reason.starts_with("Error:")
            || reason.starts_with("Blocked:")
            || reason.starts_with("Denied")
            || reason.starts_with("Tool not found:")
        {
            reason
        } else {
            format!("Error: {reason}")
        };
        Self {
            output,
            success: false,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A capability that the execution loop can invoke.
///
/// Implementations must be `Send + Sync` so they can be held in a shared
/// `Arc<dyn Tool>` registry. Tools never see the [`crate::policy`] layer
/// directly — policy evaluation and approval happen in the execution loop
/// before dispatch; a handler only ever does the work.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable machine identifier (snake_case), e.g. `"execute_command"`.
    fn name(&self) -> &str;

    /// Human-readable description used in LLM tool-use payloads.
    fn description(&self) -> &str;

    /// Category tag from the built-in tool table (e.g. `"file_ops"`, `"shell"`).
    fn category(&self) -> &str;

    /// Lower bound on this tool's risk; the policy engine may escalate it
    /// based on arguments but never de-escalate it.
    fn intrinsic_risk(&self) -> RiskLevel;

    /// JSON Schema object describing the tool's accepted parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<ToolResult, String>;
}

/// Summary of a registered tool, suitable for inclusion in LLM API requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub risk_level: RiskLevel,
    pub schema: Value,
}
