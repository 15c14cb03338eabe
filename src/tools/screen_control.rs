//! Screen control tools (`spec.md` §4.B "Screen control" row).
//!
//! Same pluggable-backend, degrade-gracefully shape as `clipboard.rs` and
//! `media.rs`. All seven operations are High risk per the spec's built-in
//! tool table since they can drive arbitrary UI interaction.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

/// Pluggable screen/input control. The headless default always reports
/// unavailability; a desktop build would implement this against a real
/// input-automation API.
#[async_trait]
pub trait ScreenController: Send + Sync {
    async fn screen_info(&self) -> Result<String, String>;
    async fn move_mouse(&self, x: i64, y: i64) -> Result<(), String>;
    async fn click_mouse(&self, button: &str) -> Result<(), String>;
    async fn scroll_mouse(&self, dx: i64, dy: i64) -> Result<(), String>;
    async fn type_text(&self, text: &str) -> Result<(), String>;
    async fn press_key(&self, key: &str) -> Result<(), String>;
    async fn run_script(&self, script: &str) -> Result<String, String>;
}

#[derive(Default)]
pub struct HeadlessScreenController;

const UNAVAILABLE: &str = "no display/input backend is available in this environment";

#[async_trait]
impl ScreenController for HeadlessScreenController {
    async fn screen_info(&self) -> Result<String, String> {
        Err(UNAVAILABLE.to_string())
    }
    async fn move_mouse(&self, _x: i64, _y: i64) -> Result<(), String> {
        Err(UNAVAILABLE.to_string())
    }
    async fn click_mouse(&self, _button: &str) -> Result<(), String> {
        Err(UNAVAILABLE.to_string())
    }
    async fn scroll_mouse(&self, _dx: i64, _dy: i64) -> Result<(), String> {
        Err(UNAVAILABLE.to_string())
    }
    async fn type_text(&self, _text: &str) -> Result<(), String> {
        Err(UNAVAILABLE.to_string())
    }
    async fn press_key(&self, _key: &str) -> Result<(), String> {
        Err(UNAVAILABLE.to_string())
    }
    async fn run_script(&self, _script: &str) -> Result<String, String> {
        Err(UNAVAILABLE.to_string())
    }
}

macro_rules! controlled_tool {
    ($ty:ident, $name:literal, $desc:literal, $schema:expr, |$self_:ident, $args:ident| $body:expr) => {
        pub struct $ty {
            pub backend: std::sync::Arc<dyn ScreenController>,
        }

        #[async_trait]
        impl Tool for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn description(&self) -> &str {
                $desc
            }
            fn category(&self) -> &str {
                "screen_control"
            }
            fn intrinsic_risk(&self) -> RiskLevel {
                RiskLevel::High
            }
            fn parameters_schema(&self) -> Value {
                $schema
            }
            async fn execute(&$self_, $args: Value) -> Result<ToolResult, String> {
                $body
            }
        }
    };
}

controlled_tool!(
    GetScreenInfoTool,
    "get_screen_info",
    "Report the current display resolution and layout.",
    json!({ "type": "object", "properties": {} }),
    |self_, _args| match self_.backend.screen_info().await {
        Ok(info) => Ok(ToolResult::ok(info)),
        Err(e) => Ok(ToolResult::err(format!("failed to get screen info: {e}"))),
    }
);

controlled_tool!(
    MoveMouseTool,
    "move_mouse",
    "Move the mouse cursor to an absolute screen position.",
    json!({
        "type": "object",
        "properties": { "x": { "type": "integer" }, "y": { "type": "integer" } },
        "required": ["x", "y"]
    }),
    |self_, args| {
        let x = args.get("x").and_then(Value::as_i64);
        let y = args.get("y").and_then(Value::as_i64);
        let (x, y) = match (x, y) {
            (Some(x), Some(y)) => (x, y),
            _ => return Ok(ToolResult::err("missing required arguments 'x' and/or 'y'")),
        };
        match self_.backend.move_mouse(x, y).await {
            Ok(()) => Ok(ToolResult::ok(format!("moved mouse to ({x}, {y})"))),
            Err(e) => Ok(ToolResult::err(format!("failed to move mouse: {e}"))),
        }
    }
);

controlled_tool!(
    ClickMouseTool,
    "click_mouse",
    "Click a mouse button at the current cursor position.",
    json!({
        "type": "object",
        "properties": { "button": { "type": "string", "enum": ["left", "right", "middle"], "default": "left" } }
    }),
    |self_, args| {
        let button = args.get("button").and_then(Value::as_str).unwrap_or("left");
        match self_.backend.click_mouse(button).await {
            Ok(()) => Ok(ToolResult::ok(format!("clicked {button} mouse button"))),
            Err(e) => Ok(ToolResult::err(format!("failed to click mouse: {e}"))),
        }
    }
);

controlled_tool!(
    ScrollMouseTool,
    "scroll_mouse",
    "Scroll the mouse wheel by a relative horizontal/vertical amount.",
    json!({
        "type": "object",
        "properties": { "dx": { "type": "integer" }, "dy": { "type": "integer" } },
        "required": ["dy"]
    }),
    |self_, args| {
        let dx = args.get("dx").and_then(Value::as_i64).unwrap_or(0);
        let dy = match args.get("dy").and_then(Value::as_i64) {
            Some(dy) => dy,
            None => return Ok(ToolResult::err("missing required argument 'dy'")),
        };
        match self_.backend.scroll_mouse(dx, dy).await {
            Ok(()) => Ok(ToolResult::ok(format!("scrolled by ({dx}, {dy})"))),
            Err(e) => Ok(ToolResult::err(format!("failed to scroll mouse: {e}"))),
        }
    }
);

controlled_tool!(
    TypeTextTool,
    "type_text",
    "Type a string of text as if entered on the keyboard.",
    json!({ "type": "object", "properties": { "text": { "type": "string" } }, "required": ["text"] }),
    |self_, args| {
        let text = match args.get("text").and_then(Value::as_str) {
            Some(t) => t,
            None => return Ok(ToolResult::err("missing required argument 'text'")),
        };
        match self_.backend.type_text(text).await {
            Ok(()) => Ok(ToolResult::ok("text typed")),
            Err(e) => Ok(ToolResult::err(format!("failed to type text: {e}"))),
        }
    }
);

controlled_tool!(
    PressKeyTool,
    "press_key",
    "Press a single named key or key combination (e.g. 'Enter', 'Cmd+C').",
    json!({ "type": "object", "properties": { "key": { "type": "string" } }, "required": ["key"] }),
    |self_, args| {
        let key = match args.get("key").and_then(Value::as_str) {
            Some(k) => k,
            None => return Ok(ToolResult::err("missing required argument 'key'")),
        };
        match self_.backend.press_key(key).await {
            Ok(()) => Ok(ToolResult::ok(format!("pressed key: {key}"))),
            Err(e) => Ok(ToolResult::err(format!("failed to press key: {e}"))),
        }
    }
);

controlled_tool!(
    RunPlatformScriptTool,
    "run_applescript_or_platform_script",
    "Run a platform automation script (e.g. AppleScript on macOS) and return its output.",
    json!({ "type": "object", "properties": { "script": { "type": "string" } }, "required": ["script"] }),
    |self_, args| {
        let script = match args.get("script").and_then(Value::as_str) {
            Some(s) => s,
            None => return Ok(ToolResult::err("missing required argument 'script'")),
        };
        match self_.backend.run_script(script).await {
            Ok(output) => Ok(ToolResult::ok(output)),
            Err(e) => Ok(ToolResult::err(format!("failed to run platform script: {e}"))),
        }
    }
);
