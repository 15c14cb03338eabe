//! Clipboard tools (`spec.md` §4.B "Clipboard" row).
//!
//! No teacher equivalent exists; grounded on the teacher's degrade-gracefully
//! posture for optional platform features (the `screen` Cargo feature is a
//! placeholder until a real backend crate is wired in, per the workspace's
//! feature table) rather than failing outright when no OS clipboard is
//! reachable. `InProcessClipboard` is the default backend: a single shared
//! buffer that works identically in headless test and CI environments.

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

/// Pluggable clipboard access. A real desktop build would implement this
/// against the OS clipboard; headless/CI builds use `InProcessClipboard`.
#[async_trait]
pub trait ClipboardBackend: Send + Sync {
    async fn read(&self) -> Result<String, String>;
    async fn write(&self, text: &str) -> Result<(), String>;
}

#[derive(Default)]
pub struct InProcessClipboard {
    buffer: Mutex<String>,
}

#[async_trait]
impl ClipboardBackend for InProcessClipboard {
    async fn read(&self) -> Result<String, String> {
        Ok(self.buffer.lock().await.clone())
    }

    async fn write(&self, text: &str) -> Result<(), String> {
        *self.buffer.lock().await = text.to_string();
        Ok(())
    }
}

pub struct ReadClipboardTool {
    pub backend: std::sync::Arc<dyn ClipboardBackend>,
}

#[async_trait]
impl Tool for ReadClipboardTool {
    fn name(&self) -> &str {
        "read_clipboard"
    }
    fn description(&self) -> &str {
        "Read the current contents of the system clipboard."
    }
    fn category(&self) -> &str {
        "clipboard"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: Value) -> Result<ToolResult, String> {
        match self.backend.read().await {
            Ok(text) => Ok(ToolResult::ok(text)),
            Err(e) => Ok(ToolResult::err(format!("failed to read clipboard: {e}"))),
        }
    }
}

pub struct WriteClipboardTool {
    pub backend: std::sync::Arc<dyn ClipboardBackend>,
}

#[async_trait]
impl Tool for WriteClipboardTool {
    fn name(&self) -> &str {
        "write_clipboard"
    }
    fn description(&self) -> &str {
        "Write text to the system clipboard."
    }
    fn category(&self) -> &str {
        "clipboard"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "text": { "type": "string" } }, "required": ["text"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let text = match args.get("text").and_then(Value::as_str) {
            Some(t) => t,
            None => return Ok(ToolResult::err("missing required argument 'text'")),
        };
        match self.backend.write(text).await {
            Ok(()) => Ok(ToolResult::ok("clipboard updated")),
            Err(e) => Ok(ToolResult::err(format!("failed to write clipboard: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let backend: Arc<dyn ClipboardBackend> = Arc::new(InProcessClipboard::default());
        let write_tool = WriteClipboardTool { backend: backend.clone() };
        let read_tool = ReadClipboardTool { backend };

        let w = write_tool.execute(json!({"text": "hello clipboard"})).await.unwrap();
        assert!(w.success);

        let r = read_tool.execute(json!({})).await.unwrap();
        assert!(r.success);
        assert_eq!(r.output, "hello clipboard");
    }

    #[tokio::test]
    async fn write_missing_text_is_tool_error() {
        let backend: Arc<dyn ClipboardBackend> = Arc::new(InProcessClipboard::default());
        let tool = WriteClipboardTool { backend };
        let r = tool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[test]
    fn risk_levels_match_spec_table() {
        let backend: Arc<dyn ClipboardBackend> = Arc::new(InProcessClipboard::default());
        assert_eq!(ReadClipboardTool { backend: backend.clone() }.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(WriteClipboardTool { backend }.intrinsic_risk(), RiskLevel::Low);
    }
}
