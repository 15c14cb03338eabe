//! File operation tools (`spec.md` §4.B "File ops" row).
//!
//! Grounded on the teacher's `tools/file_ops.rs` `FileReadTool`/`FileWriteTool`
//! pattern, generalized to the full built-in file-op set and stripped of the
//! teacher's inline policy gate — policy evaluation now happens once, in the
//! execution loop, before any tool is dispatched.

use std::{fs, path::PathBuf};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

fn required_path(args: &Value, key: &str) -> Result<PathBuf, String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .ok_or_else(|| format!("missing required argument '{key}'"))
}

fn collect_entries(dir: &std::path::Path, recursive: bool) -> std::io::Result<Vec<String>> {
    let mut result = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        result.push(path.display().to_string());
        if recursive && path.is_dir() {
            result.extend(collect_entries(&path, true)?);
        }
    }
    result.sort();
    Ok(result)
}

// ─── read_file ────────────────────────────────────────────────────────────

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Use max_lines to limit output for large files."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to the file." },
                "max_lines": {
                    "type": "integer",
                    "description": "Maximum number of lines to return (default: all).",
                    "minimum": 1
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let max_lines = args.get("max_lines").and_then(Value::as_u64).map(|n| n as usize);

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let output = match max_lines {
                    Some(n) => contents.lines().take(n).collect::<Vec<_>>().join("\n"),
                    None => contents,
                };
                Ok(ToolResult::ok(output).with_metadata(json!({ "path": path.display().to_string() })))
            }
            Err(e) => Ok(ToolResult::err(format!("failed to read '{}': {e}", path.display()))),
        }
    }
}

// ─── list_directory ───────────────────────────────────────────────────────

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the contents of a directory, optionally recursively."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path." },
                "recursive": { "type": "boolean", "description": "List recursively (default: false)." }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let recursive = args.get("recursive").and_then(Value::as_bool).unwrap_or(false);

        match collect_entries(&path, recursive) {
            Ok(entries) => Ok(ToolResult::ok(entries.join("\n")).with_metadata(json!({ "count": entries.len() }))),
            Err(e) => Ok(ToolResult::err(format!("failed to list '{}': {e}", path.display()))),
        }
    }
}

// ─── get_file_info ─────────────────────────────────────────────────────────

pub struct GetFileInfoTool;

#[async_trait]
impl Tool for GetFileInfoTool {
    fn name(&self) -> &str {
        "get_file_info"
    }

    fn description(&self) -> &str {
        "Get metadata about a file or directory: size, type, and modification time."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "Path to inspect." } },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };

        match fs::metadata(&path) {
            Ok(meta) => {
                let kind = if meta.is_dir() {
                    "directory"
                } else if meta.is_file() {
                    "file"
                } else {
                    "other"
                };
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs());
                let output = format!(
                    "path: {}\ntype: {kind}\nsize: {} bytes\nmodified: {}",
                    path.display(),
                    meta.len(),
                    modified.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string())
                );
                Ok(ToolResult::ok(output).with_metadata(json!({
                    "type": kind, "size": meta.len(), "modified_unix": modified
                })))
            }
            Err(e) => Ok(ToolResult::err(format!("failed to stat '{}': {e}", path.display()))),
        }
    }
}

// ─── search_files ──────────────────────────────────────────────────────────

pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search a directory tree for files whose name contains a substring."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to search." },
                "pattern": { "type": "string", "description": "Substring to match in file names." }
            },
            "required": ["path", "pattern"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let pattern = match args.get("pattern").and_then(Value::as_str) {
            Some(p) => p,
            None => return Ok(ToolResult::err("missing required argument 'pattern'")),
        };

        match collect_entries(&path, true) {
            Ok(entries) => {
                let matches: Vec<String> = entries.into_iter().filter(|e| e.contains(pattern)).collect();
                Ok(ToolResult::ok(matches.join("\n")).with_metadata(json!({ "count": matches.len() })))
            }
            Err(e) => Ok(ToolResult::err(format!("failed to search '{}': {e}", path.display()))),
        }
    }
}

// ─── count_lines ───────────────────────────────────────────────────────────

pub struct CountLinesTool;

#[async_trait]
impl Tool for CountLinesTool {
    fn name(&self) -> &str {
        "count_lines"
    }

    fn description(&self) -> &str {
        "Count the number of lines in a file."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "Path to the file." } },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };

        match fs::read_to_string(&path) {
            Ok(contents) => {
                let n = contents.lines().count();
                Ok(ToolResult::ok(n.to_string()).with_metadata(json!({ "lines": n })))
            }
            Err(e) => Ok(ToolResult::err(format!("failed to read '{}': {e}", path.display()))),
        }
    }
}

// ─── write_file ────────────────────────────────────────────────────────────

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it if it does not exist and overwriting it if it does."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path":    { "type": "string", "description": "Path to write." },
                "content": { "type": "string", "description": "Content to write." }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let content = match args.get("content").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'content'")),
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return Ok(ToolResult::err(format!("failed to create parent dirs: {e}")));
            }
        }

        let bytes = content.len();
        match fs::write(&path, &content) {
            Ok(()) => Ok(ToolResult::ok(format!("wrote {bytes} bytes to '{}'", path.display()))
                .with_metadata(json!({ "path": path.display().to_string(), "bytes": bytes }))),
            Err(e) => Ok(ToolResult::err(format!("failed to write '{}': {e}", path.display()))),
        }
    }
}

// ─── append_to_file ────────────────────────────────────────────────────────

pub struct AppendToFileTool;

#[async_trait]
impl Tool for AppendToFileTool {
    fn name(&self) -> &str {
        "append_to_file"
    }

    fn description(&self) -> &str {
        "Append content to the end of a file, creating it if it does not exist."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path":    { "type": "string", "description": "Path to append to." },
                "content": { "type": "string", "description": "Content to append." }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        use std::io::Write;

        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let content = match args.get("content").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'content'")),
        };

        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(content.as_bytes()));

        match result {
            Ok(()) => Ok(ToolResult::ok(format!("appended {} bytes to '{}'", content.len(), path.display()))),
            Err(e) => Ok(ToolResult::err(format!("failed to append to '{}': {e}", path.display()))),
        }
    }
}

// ─── move_file ─────────────────────────────────────────────────────────────

pub struct MoveFileTool;

#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &str {
        "move_file"
    }

    fn description(&self) -> &str {
        "Move or rename a file or directory."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source":      { "type": "string", "description": "Existing path." },
                "destination": { "type": "string", "description": "New path." }
            },
            "required": ["source", "destination"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let source = match required_path(&args, "source") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let destination = match required_path(&args, "destination") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };

        match fs::rename(&source, &destination) {
            Ok(()) => Ok(ToolResult::ok(format!(
                "moved '{}' to '{}'",
                source.display(),
                destination.display()
            ))),
            Err(e) => Ok(ToolResult::err(format!("failed to move file: {e}"))),
        }
    }
}

// ─── copy_file ──────────────────────────────────────────────────────────────

pub struct CopyFileTool;

#[async_trait]
impl Tool for CopyFileTool {
    fn name(&self) -> &str {
        "copy_file"
    }

    fn description(&self) -> &str {
        "Copy a file to a new location."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source":      { "type": "string", "description": "Existing file." },
                "destination": { "type": "string", "description": "Destination path." }
            },
            "required": ["source", "destination"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let source = match required_path(&args, "source") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let destination = match required_path(&args, "destination") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };

        match fs::copy(&source, &destination) {
            Ok(bytes) => Ok(ToolResult::ok(format!(
                "copied {bytes} bytes from '{}' to '{}'",
                source.display(),
                destination.display()
            ))),
            Err(e) => Ok(ToolResult::err(format!("failed to copy file: {e}"))),
        }
    }
}

// ─── create_directory ──────────────────────────────────────────────────────

pub struct CreateDirectoryTool;

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "create_directory"
    }

    fn description(&self) -> &str {
        "Create a directory, including any missing parent directories."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "Directory to create." } },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };

        match fs::create_dir_all(&path) {
            Ok(()) => Ok(ToolResult::ok(format!("created directory '{}'", path.display()))),
            Err(e) => Ok(ToolResult::err(format!("failed to create directory: {e}"))),
        }
    }
}

// ─── delete_file ────────────────────────────────────────────────────────────

pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Permanently delete a file or (recursively) a directory. This cannot be undone."
    }

    fn category(&self) -> &str {
        "file_ops"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string", "description": "Path to delete." } },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match required_path(&args, "path") {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };

        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };

        match result {
            Ok(()) => Ok(ToolResult::ok(format!("deleted '{}'", path.display()))),
            Err(e) => Ok(ToolResult::err(format!("failed to delete '{}': {e}", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn read_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("hello.txt");
        fs::write(&file, "hello world").unwrap();

        let r = ReadFileTool.execute(json!({"path": file.display().to_string()})).await.unwrap();
        assert!(r.success);
        assert_eq!(r.output.trim(), "hello world");
    }

    #[tokio::test]
    async fn read_respects_max_lines() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("lines.txt");
        fs::write(&file, "a\nb\nc\nd\ne").unwrap();

        let r = ReadFileTool
            .execute(json!({"path": file.display().to_string(), "max_lines": 3}))
            .await
            .unwrap();
        assert_eq!(r.output.lines().count(), 3);
    }

    #[tokio::test]
    async fn read_missing_file_is_tool_error_not_rust_err() {
        let r = ReadFileTool.execute(json!({"path": "/tmp/__nonexistent_file_xyz__"})).await.unwrap();
        assert!(!r.success);
        assert!(r.output.starts_with("Error:"));
    }

    #[tokio::test]
    async fn read_missing_path_arg_is_tool_error() {
        let r = ReadFileTool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn write_creates_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("output.txt");

        let r = WriteFileTool
            .execute(json!({"path": file.display().to_string(), "content": "written"}))
            .await
            .unwrap();
        assert!(r.success);
        assert_eq!(fs::read_to_string(&file).unwrap(), "written");
    }

    #[tokio::test]
    async fn append_adds_to_existing_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("log.txt");
        fs::write(&file, "first\n").unwrap();

        AppendToFileTool
            .execute(json!({"path": file.display().to_string(), "content": "second\n"}))
            .await
            .unwrap();

        let contents = fs::read_to_string(&file).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn list_directory_contents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();

        let r = ListDirectoryTool
            .execute(json!({"path": dir.path().display().to_string()}))
            .await
            .unwrap();
        assert!(r.output.contains("a.txt"));
        assert!(r.output.contains("b.txt"));
    }

    #[tokio::test]
    async fn move_file_renames() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, "x").unwrap();

        let r = MoveFileTool
            .execute(json!({"source": src.display().to_string(), "destination": dst.display().to_string()}))
            .await
            .unwrap();
        assert!(r.success);
        assert!(!src.exists());
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn copy_file_duplicates() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, "x").unwrap();

        CopyFileTool
            .execute(json!({"source": src.display().to_string(), "destination": dst.display().to_string()}))
            .await
            .unwrap();
        assert!(src.exists());
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn create_directory_makes_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        let r = CreateDirectoryTool.execute(json!({"path": nested.display().to_string()})).await.unwrap();
        assert!(r.success);
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn delete_file_removes_it() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let r = DeleteFileTool.execute(json!({"path": file.display().to_string()})).await.unwrap();
        assert!(r.success);
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn delete_directory_removes_recursively() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("f.txt"), "x").unwrap();

        let r = DeleteFileTool.execute(json!({"path": sub.display().to_string()})).await.unwrap();
        assert!(r.success);
        assert!(!sub.exists());
    }

    #[tokio::test]
    async fn get_file_info_reports_size() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "hello").unwrap();

        let r = GetFileInfoTool.execute(json!({"path": file.display().to_string()})).await.unwrap();
        assert!(r.output.contains("file"));
        assert!(r.output.contains('5'));
    }

    #[tokio::test]
    async fn search_files_matches_substring() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("needle.txt"), "").unwrap();
        fs::write(dir.path().join("other.txt"), "").unwrap();

        let r = SearchFilesTool
            .execute(json!({"path": dir.path().display().to_string(), "pattern": "needle"}))
            .await
            .unwrap();
        assert!(r.output.contains("needle.txt"));
        assert!(!r.output.contains("other.txt"));
    }

    #[tokio::test]
    async fn count_lines_counts_correctly() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "one\ntwo\nthree").unwrap();

        let r = CountLinesTool.execute(json!({"path": file.display().to_string()})).await.unwrap();
        assert_eq!(r.output, "3");
    }

    #[test]
    fn intrinsic_risk_matches_spec_table() {
        assert_eq!(ReadFileTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(WriteFileTool.intrinsic_risk(), RiskLevel::Medium);
        assert_eq!(DeleteFileTool.intrinsic_risk(), RiskLevel::High);
    }
}
