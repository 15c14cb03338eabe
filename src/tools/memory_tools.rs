//! Memory tools (`spec.md` §4.B "Memory" row).
//!
//! Thin adapters over [`crate::memory::MemoryStore`], grounded on the
//! teacher's pattern of exposing a shared subsystem to tool handlers via an
//! injected `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::memory::MemoryStore;
use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

pub struct MemorySaveTool {
    pub store: Arc<dyn MemoryStore>,
}

#[async_trait]
impl Tool for MemorySaveTool {
    fn name(&self) -> &str {
        "memory_save"
    }
    fn description(&self) -> &str {
        "Save a key/value pair to persistent memory, overwriting any existing value for the key."
    }
    fn category(&self) -> &str {
        "memory"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "key": { "type": "string" }, "value": { "type": "string" } },
            "required": ["key", "value"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let key = match args.get("key").and_then(Value::as_str) {
            Some(k) => k,
            None => return Ok(ToolResult::err("missing required argument 'key'")),
        };
        let value = match args.get("value").and_then(Value::as_str) {
            Some(v) => v,
            None => return Ok(ToolResult::err("missing required argument 'value'")),
        };
        match self.store.save(key, value).await {
            Ok(()) => Ok(ToolResult::ok(format!("saved '{key}'"))),
            Err(e) => Ok(ToolResult::err(format!("failed to save memory: {e}"))),
        }
    }
}

pub struct MemoryReadTool {
    pub store: Arc<dyn MemoryStore>,
}

#[async_trait]
impl Tool for MemoryReadTool {
    fn name(&self) -> &str {
        "memory_read"
    }
    fn description(&self) -> &str {
        "Read the value saved under a memory key, if any."
    }
    fn category(&self) -> &str {
        "memory"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "key": { "type": "string" } }, "required": ["key"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let key = match args.get("key").and_then(Value::as_str) {
            Some(k) => k,
            None => return Ok(ToolResult::err("missing required argument 'key'")),
        };
        match self.store.read(key).await {
            Ok(Some(value)) => Ok(ToolResult::ok(value)),
            Ok(None) => Ok(ToolResult::err(format!("no value saved for key '{key}'"))),
            Err(e) => Ok(ToolResult::err(format!("failed to read memory: {e}"))),
        }
    }
}

pub struct MemoryListTool {
    pub store: Arc<dyn MemoryStore>,
}

#[async_trait]
impl Tool for MemoryListTool {
    fn name(&self) -> &str {
        "memory_list"
    }
    fn description(&self) -> &str {
        "List all keys currently saved in persistent memory."
    }
    fn category(&self) -> &str {
        "memory"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: Value) -> Result<ToolResult, String> {
        match self.store.list().await {
            Ok(keys) if keys.is_empty() => Ok(ToolResult::ok("no keys saved")),
            Ok(keys) => Ok(ToolResult::ok(keys.join("\n")).with_metadata(json!({ "count": keys.len() }))),
            Err(e) => Ok(ToolResult::err(format!("failed to list memory: {e}"))),
        }
    }
}

pub struct MemoryDeleteTool {
    pub store: Arc<dyn MemoryStore>,
}

#[async_trait]
impl Tool for MemoryDeleteTool {
    fn name(&self) -> &str {
        "memory_delete"
    }
    fn description(&self) -> &str {
        "Delete the value saved under a memory key."
    }
    fn category(&self) -> &str {
        "memory"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "key": { "type": "string" } }, "required": ["key"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let key = match args.get("key").and_then(Value::as_str) {
            Some(k) => k,
            None => return Ok(ToolResult::err("missing required argument 'key'")),
        };
        match self.store.delete(key).await {
            Ok(true) => Ok(ToolResult::ok(format!("deleted '{key}'"))),
            Ok(false) => Ok(ToolResult::err(format!("no value saved for key '{key}'"))),
            Err(e) => Ok(ToolResult::err(format!("failed to delete memory: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FileMemoryStore;
    use tempfile::tempdir;

    fn store() -> Arc<dyn MemoryStore> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::mem::forget(dir);
        Arc::new(FileMemoryStore::open(path).expect("open store"))
    }

    #[tokio::test]
    async fn save_read_list_delete_round_trip() {
        let store = store();
        let save = MemorySaveTool { store: store.clone() };
        let read = MemoryReadTool { store: store.clone() };
        let list = MemoryListTool { store: store.clone() };
        let delete = MemoryDeleteTool { store: store.clone() };

        let r = save.execute(json!({"key": "name", "value": "core"})).await.unwrap();
        assert!(r.success);

        let r = read.execute(json!({"key": "name"})).await.unwrap();
        assert!(r.success);
        assert_eq!(r.output, "core");

        let r = list.execute(json!({})).await.unwrap();
        assert!(r.success);
        assert!(r.output.contains("name"));

        let r = delete.execute(json!({"key": "name"})).await.unwrap();
        assert!(r.success);

        let r = read.execute(json!({"key": "name"})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn read_missing_key_is_tool_error() {
        let store = store();
        let r = MemoryReadTool { store }.execute(json!({"key": "missing"})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn delete_missing_key_is_tool_error() {
        let store = store();
        let r = MemoryDeleteTool { store }.execute(json!({"key": "missing"})).await.unwrap();
        assert!(!r.success);
    }

    #[test]
    fn risk_levels_match_spec_table() {
        let store = store();
        assert_eq!(MemorySaveTool { store: store.clone() }.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(MemoryReadTool { store: store.clone() }.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(MemoryListTool { store: store.clone() }.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(MemoryDeleteTool { store }.intrinsic_risk(), RiskLevel::Low);
    }
}
