//! Code execution tools (`spec.md` §4.B "Code exec" row).
//!
//! Grounded on the teacher's `tools/shell.rs` subprocess pattern, fixed to
//! a specific interpreter binary per tool rather than an arbitrary command
//! line, with the code passed on stdin so no temp file is required.

use std::io::Write;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

async fn run_interpreter(interpreter: &'static str, extra_args: &'static [&'static str], code: String) -> Result<ToolResult, String> {
    let result = tokio::task::spawn_blocking(move || {
        let mut child = std::process::Command::new(interpreter)
            .args(extra_args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(code.as_bytes())?;
        }
        child.wait_with_output()
    })
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Ok(ToolResult::err(format!("failed to spawn {interpreter}: {e}"))),
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

// ─── run_python ──────────────────────────────────────────────────────────────

pub struct RunPythonTool;

#[async_trait]
impl Tool for RunPythonTool {
    fn name(&self) -> &str {
        "run_python"
    }
    fn description(&self) -> &str {
        "Execute a Python script via the system `python3` interpreter and return its output."
    }
    fn category(&self) -> &str {
        "code_exec"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::High
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "code": { "type": "string" } }, "required": ["code"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let code = match args.get("code").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'code'")),
        };
        run_interpreter("python3", &[], code).await
    }
}

// ─── run_node ────────────────────────────────────────────────────────────────

pub struct RunNodeTool;

#[async_trait]
impl Tool for RunNodeTool {
    fn name(&self) -> &str {
        "run_node"
    }
    fn description(&self) -> &str {
        "Execute a JavaScript script via the system `node` interpreter and return its output."
    }
    fn category(&self) -> &str {
        "code_exec"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::High
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "code": { "type": "string" } }, "required": ["code"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let code = match args.get("code").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'code'")),
        };
        run_interpreter("node", &["--input-type=module"], code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_python_missing_code_is_tool_error() {
        let r = RunPythonTool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn run_node_missing_code_is_tool_error() {
        let r = RunNodeTool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[test]
    fn risk_levels_match_spec_table() {
        assert_eq!(RunPythonTool.intrinsic_risk(), RiskLevel::High);
        assert_eq!(RunNodeTool.intrinsic_risk(), RiskLevel::High);
    }
}
