//! `execute_command` (`spec.md` §4.B "Shell" row).
//!
//! Grounded on the teacher's `tools/shell.rs` `ShellTool` (spawn via
//! `/bin/sh -c` in a blocking thread, merge stdout/stderr), generalized to
//! the spec's policy-driven risk/approval path: this handler no longer
//! consults a `SecurityPolicy` itself — the execution loop evaluates risk
//! and routes through the approval queue *before* dispatching here. The
//! handler's only job is to run the command and report what happened.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

pub struct ExecuteCommandTool;

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its stdout/stderr output."
    }

    fn category(&self) -> &str {
        "shell"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute."
                },
                "working_dir": {
                    "type": "string",
                    "description": "Optional working directory for the command."
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let command = match args.get("command").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'command'")),
        };
        let working_dir = args.get("working_dir").and_then(Value::as_str).map(str::to_string);

        let result = tokio::task::spawn_blocking(move || {
            let mut cmd = std::process::Command::new("sh");
            cmd.arg("-c").arg(&command);
            if let Some(dir) = &working_dir {
                cmd.current_dir(dir);
            }
            cmd.output()
        })
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(ToolResult::err(format!("failed to spawn process: {e}"))),
            Err(e) => return Ok(ToolResult::err(format!("blocking task panicked: {e}"))),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let success = output.status.success();

        let text = if stderr.is_empty() {
            stdout
        } else if stdout.is_empty() {
            format!("STDERR: {stderr}")
        } else {
            format!("{stdout}\nSTDERR: {stderr}")
        };

        let meta = json!({ "exit_code": output.status.code() });
        if success {
            Ok(ToolResult::ok(text).with_metadata(meta))
        } else {
            Ok(ToolResult::err(text).with_metadata(meta))
        }
    }
}
