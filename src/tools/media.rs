//! Media tools (`spec.md` §4.B "Media" row).
//!
//! Same pluggable-backend, degrade-gracefully shape as `clipboard.rs`: a
//! headless default backend reports that no capture device is available
//! rather than failing the whole agent process.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

/// Pluggable screen-capture access. The headless default always reports
/// unavailability; a desktop build would implement this against a real
/// capture API.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Capture the screen and return the path of the saved image, or an
    /// error string describing why capture is unavailable.
    async fn capture(&self, destination: &str) -> Result<String, String>;
}

#[derive(Default)]
pub struct HeadlessScreenCapture;

#[async_trait]
impl ScreenCapture for HeadlessScreenCapture {
    async fn capture(&self, _destination: &str) -> Result<String, String> {
        Err("no screen capture device is available in this environment".to_string())
    }
}

pub struct TakeScreenshotTool {
    pub backend: std::sync::Arc<dyn ScreenCapture>,
}

#[async_trait]
impl Tool for TakeScreenshotTool {
    fn name(&self) -> &str {
        "take_screenshot"
    }
    fn description(&self) -> &str {
        "Capture a screenshot of the current display and save it to a file."
    }
    fn category(&self) -> &str {
        "media"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "destination": { "type": "string", "description": "Path to save the screenshot to." }
            },
            "required": ["destination"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let destination = match args.get("destination").and_then(Value::as_str) {
            Some(d) => d,
            None => return Ok(ToolResult::err("missing required argument 'destination'")),
        };
        match self.backend.capture(destination).await {
            Ok(path) => Ok(ToolResult::ok(format!("screenshot saved to {path}"))),
            Err(e) => Ok(ToolResult::err(format!("failed to capture screenshot: {e}"))),
        }
    }
}
