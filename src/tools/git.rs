//! Git tools (`spec.md` §4.B "Git" row).
//!
//! Grounded on the teacher's `tools/shell.rs` subprocess pattern (spawn in a
//! blocking thread, merge stdout/stderr), narrowed to the fixed set of git
//! subcommands the spec names rather than an arbitrary shell command.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

async fn run_git(args: Vec<String>, working_dir: Option<String>) -> Result<ToolResult, String> {
    let result = tokio::task::spawn_blocking(move || {
        let mut cmd = std::process::Command::new("git");
        cmd.args(&args);
        if let Some(dir) = &working_dir {
            cmd.current_dir(dir);
        }
        cmd.output()
    })
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Ok(ToolResult::err(format!("failed to spawn git: {e}"))),
        Err(e) => return Ok(ToolResult::err(format!("blocking task panicked: {e}"))),
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let success = output.status.success();

    let text = if stderr.is_empty() {
        stdout
    } else if stdout.is_empty() {
        stderr
    } else {
        format!("{stdout}\n{stderr}")
    };

    let meta = json!({ "exit_code": output.status.code() });
    if success {
        Ok(ToolResult::ok(text).with_metadata(meta))
    } else {
        Ok(ToolResult::err(text).with_metadata(meta))
    }
}

fn working_dir(args: &Value) -> Option<String> {
    args.get("working_dir").and_then(Value::as_str).map(str::to_string)
}

fn repo_dir_schema_field() -> Value {
    json!({ "type": "string", "description": "Repository directory. Defaults to the current directory." })
}

// ─── git_status ──────────────────────────────────────────────────────────────

pub struct GitStatusTool;

#[async_trait]
impl Tool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }
    fn description(&self) -> &str {
        "Show the working tree status of a git repository."
    }
    fn category(&self) -> &str {
        "git"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "working_dir": repo_dir_schema_field() } })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        run_git(vec!["status".to_string(), "--short".to_string(), "--branch".to_string()], working_dir(&args)).await
    }
}

// ─── git_log ─────────────────────────────────────────────────────────────────

pub struct GitLogTool;

#[async_trait]
impl Tool for GitLogTool {
    fn name(&self) -> &str {
        "git_log"
    }
    fn description(&self) -> &str {
        "Show recent commit history of a git repository."
    }
    fn category(&self) -> &str {
        "git"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "working_dir": repo_dir_schema_field(),
                "max_count": { "type": "integer", "minimum": 1, "maximum": 200, "default": 20 }
            }
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let max_count = args.get("max_count").and_then(Value::as_u64).unwrap_or(20).min(200);
        run_git(
            vec![
                "log".to_string(),
                format!("-{max_count}"),
                "--pretty=format:%h %ad %an %s".to_string(),
                "--date=short".to_string(),
            ],
            working_dir(&args),
        )
        .await
    }
}

// ─── git_diff ────────────────────────────────────────────────────────────────

pub struct GitDiffTool;

#[async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "git_diff"
    }
    fn description(&self) -> &str {
        "Show uncommitted changes in a git repository, optionally scoped to a path."
    }
    fn category(&self) -> &str {
        "git"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "working_dir": repo_dir_schema_field(),
                "path": { "type": "string", "description": "Optional path to limit the diff to." },
                "staged": { "type": "boolean", "description": "Show staged changes instead of the working tree." }
            }
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let mut cmd_args = vec!["diff".to_string()];
        if args.get("staged").and_then(Value::as_bool).unwrap_or(false) {
            cmd_args.push("--staged".to_string());
        }
        if let Some(path) = args.get("path").and_then(Value::as_str) {
            cmd_args.push("--".to_string());
            cmd_args.push(path.to_string());
        }
        run_git(cmd_args, working_dir(&args)).await
    }
}

// ─── git_branch ──────────────────────────────────────────────────────────────

pub struct GitBranchTool;

#[async_trait]
impl Tool for GitBranchTool {
    fn name(&self) -> &str {
        "git_branch"
    }
    fn description(&self) -> &str {
        "List branches, or create a new branch when `create` is given."
    }
    fn category(&self) -> &str {
        "git"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "working_dir": repo_dir_schema_field(),
                "create": { "type": "string", "description": "Name of a new branch to create." }
            }
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let cmd_args = match args.get("create").and_then(Value::as_str) {
            Some(name) => vec!["branch".to_string(), name.to_string()],
            None => vec!["branch".to_string(), "--list".to_string()],
        };
        run_git(cmd_args, working_dir(&args)).await
    }
}

// ─── git_clone ───────────────────────────────────────────────────────────────

pub struct GitCloneTool;

#[async_trait]
impl Tool for GitCloneTool {
    fn name(&self) -> &str {
        "git_clone"
    }
    fn description(&self) -> &str {
        "Clone a remote git repository to a local directory."
    }
    fn category(&self) -> &str {
        "git"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Remote repository URL." },
                "destination": { "type": "string", "description": "Local directory to clone into." }
            },
            "required": ["url"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let url = match args.get("url").and_then(Value::as_str) {
            Some(u) => u.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'url'")),
        };
        let mut cmd_args = vec!["clone".to_string(), url];
        if let Some(dest) = args.get("destination").and_then(Value::as_str) {
            cmd_args.push(dest.to_string());
        }
        run_git(cmd_args, None).await
    }
}

// ─── git_commit ──────────────────────────────────────────────────────────────

pub struct GitCommitTool;

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }
    fn description(&self) -> &str {
        "Commit currently staged changes with the given message."
    }
    fn category(&self) -> &str {
        "git"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::High
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "working_dir": repo_dir_schema_field(),
                "message": { "type": "string", "description": "Commit message." }
            },
            "required": ["message"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let message = match args.get("message").and_then(Value::as_str) {
            Some(m) => m.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'message'")),
        };
        run_git(vec!["commit".to_string(), "-m".to_string(), message], working_dir(&args)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn git_status_on_non_repo_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = GitStatusTool
            .execute(json!({"working_dir": dir.path().display().to_string()}))
            .await
            .unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn git_commit_missing_message_is_tool_error() {
        let r = GitCommitTool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn git_clone_missing_url_is_tool_error() {
        let r = GitCloneTool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[test]
    fn risk_levels_match_spec_table() {
        assert_eq!(GitStatusTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(GitLogTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(GitDiffTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(GitBranchTool.intrinsic_risk(), RiskLevel::Medium);
        assert_eq!(GitCloneTool.intrinsic_risk(), RiskLevel::Medium);
        assert_eq!(GitCommitTool.intrinsic_risk(), RiskLevel::High);
    }
}
