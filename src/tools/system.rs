//! System introspection tools (`spec.md` §4.B "System" row).
//!
//! Grounded on the teacher's `tools/process.rs` process-listing pattern,
//! enriched with `sysinfo`-based process/host inspection in place of the
//! teacher's own ad hoc `/proc` parsing.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use sysinfo::System;

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

// ─── get_current_datetime ───────────────────────────────────────────────────

pub struct GetCurrentDatetimeTool;

#[async_trait]
impl Tool for GetCurrentDatetimeTool {
    fn name(&self) -> &str {
        "get_current_datetime"
    }

    fn description(&self) -> &str {
        "Return the current UTC date and time in RFC 3339 format."
    }

    fn category(&self) -> &str {
        "system"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult, String> {
        Ok(ToolResult::ok(Utc::now().to_rfc3339()))
    }
}

// ─── get_system_info ─────────────────────────────────────────────────────────

pub struct GetSystemInfoTool;

#[async_trait]
impl Tool for GetSystemInfoTool {
    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Return host OS, kernel version, CPU count, and total/available memory."
    }

    fn category(&self) -> &str {
        "system"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult, String> {
        let mut sys = System::new();
        sys.refresh_memory();

        let os = System::long_os_version().unwrap_or_else(|| "unknown".to_string());
        let kernel = System::kernel_version().unwrap_or_else(|| "unknown".to_string());
        let cpus = sys.cpus().len();
        let total_mem_mb = sys.total_memory() / 1024 / 1024;
        let used_mem_mb = sys.used_memory() / 1024 / 1024;

        let output = format!(
            "os: {os}\nkernel: {kernel}\ncpus: {cpus}\nmemory: {used_mem_mb} MiB used / {total_mem_mb} MiB total"
        );

        Ok(ToolResult::ok(output).with_metadata(json!({
            "os": os, "kernel": kernel, "cpus": cpus,
            "total_memory_mb": total_mem_mb, "used_memory_mb": used_mem_mb
        })))
    }
}

// ─── list_processes ──────────────────────────────────────────────────────────

pub struct ListProcessesTool;

#[async_trait]
impl Tool for ListProcessesTool {
    fn name(&self) -> &str {
        "list_processes"
    }

    fn description(&self) -> &str {
        "List running processes, optionally filtered by a substring match on their name."
    }

    fn category(&self) -> &str {
        "system"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filter": { "type": "string", "description": "Optional substring filter on process name." }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let filter = args.get("filter").and_then(Value::as_str).map(str::to_lowercase);

        let mut sys = System::new();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

        let mut lines: Vec<String> = sys
            .processes()
            .values()
            .filter(|p| {
                filter.as_deref().is_none_or(|f| p.name().to_string_lossy().to_lowercase().contains(f))
            })
            .map(|p| format!("{}\t{}", p.pid(), p.name().to_string_lossy()))
            .collect();
        lines.sort();

        Ok(ToolResult::ok(lines.join("\n")).with_metadata(json!({ "count": lines.len() })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_current_datetime_is_rfc3339() {
        let r = GetCurrentDatetimeTool.execute(json!({})).await.unwrap();
        assert!(r.success);
        assert!(chrono::DateTime::parse_from_rfc3339(&r.output).is_ok());
    }

    #[tokio::test]
    async fn get_system_info_reports_cpu_and_memory() {
        let r = GetSystemInfoTool.execute(json!({})).await.unwrap();
        assert!(r.success);
        assert!(r.output.contains("cpus"));
        assert!(r.output.contains("memory"));
    }

    #[tokio::test]
    async fn list_processes_returns_at_least_one_entry() {
        let r = ListProcessesTool.execute(json!({})).await.unwrap();
        assert!(r.success);
        assert!(!r.output.is_empty());
    }

    #[test]
    fn all_system_tools_are_low_risk() {
        assert_eq!(GetCurrentDatetimeTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(GetSystemInfoTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(ListProcessesTool.intrinsic_risk(), RiskLevel::Low);
    }
}
