//! Built-in tools and the registry that exposes them to the execution loop.
//!
//! Every handler in this module is a plain side-effecting function: none of
//! them consult policy or write audit entries themselves. Risk evaluation,
//! approval routing, and audit logging all happen once, centrally, in
//! `agent::ExecutionLoop` before a handler is ever dispatched. `update_self`
//! is deliberately not a `Tool` impl — it is intercepted inside the
//! execution loop itself.

pub mod clipboard;
pub mod code_exec;
pub mod file_ops;
pub mod git;
pub mod media;
pub mod memory_tools;
pub mod network;
pub mod registry;
pub mod schema;
pub mod screen_control;
pub mod shell;
pub mod system;
pub mod text_data;
pub mod traits;

use std::sync::Arc;

pub use registry::ToolRegistry;
pub use schema::{generate_tool_schema_text, generate_tool_summary};
pub use traits::{Tool, ToolInfo, ToolResult};

use crate::memory::MemoryStore;
use clipboard::{ClipboardBackend, InProcessClipboard, ReadClipboardTool, WriteClipboardTool};
use code_exec::{RunNodeTool, RunPythonTool};
use file_ops::{
    AppendToFileTool, CopyFileTool, CountLinesTool, CreateDirectoryTool, DeleteFileTool,
    GetFileInfoTool, ListDirectoryTool, MoveFileTool, ReadFileTool, SearchFilesTool, WriteFileTool,
};
use git::{GitBranchTool, GitCloneTool, GitCommitTool, GitDiffTool, GitLogTool, GitStatusTool};
use media::{HeadlessScreenCapture, ScreenCapture, TakeScreenshotTool};
use memory_tools::{MemoryDeleteTool, MemoryListTool, MemoryReadTool, MemorySaveTool};
use network::{FetchUrlTool, HttpRequestTool, WebSearchTool};
use screen_control::{
    ClickMouseTool, GetScreenInfoTool, HeadlessScreenController, MoveMouseTool, PressKeyTool,
    RunPlatformScriptTool, ScreenController, ScrollMouseTool, TypeTextTool,
};
use shell::ExecuteCommandTool;
use system::{GetCurrentDatetimeTool, GetSystemInfoTool, ListProcessesTool};
use text_data::{
    CalculateTool, DecodeBase64Tool, EncodeBase64Tool, ParseJsonTool, ReplaceInFileTool,
    SearchInFileTool,
};

/// Shared dependencies needed to build the built-in tool set.
///
/// Clipboard, screenshot, and screen-control backends are pluggable so a
/// headless build (tests, CI, server deployments) degrades gracefully
/// instead of failing to start.
pub struct ToolContext {
    pub memory_store: Arc<dyn MemoryStore>,
    pub clipboard: Arc<dyn ClipboardBackend>,
    pub screen_capture: Arc<dyn ScreenCapture>,
    pub screen_controller: Arc<dyn ScreenController>,
}

impl ToolContext {
    /// Build a context using headless/in-process defaults for every
    /// pluggable backend.
    pub fn headless(memory_store: Arc<dyn MemoryStore>) -> Self {
        Self {
            memory_store,
            clipboard: Arc::new(InProcessClipboard::default()),
            screen_capture: Arc::new(HeadlessScreenCapture),
            screen_controller: Arc::new(HeadlessScreenController),
        }
    }
}

/// Register every built-in tool into `registry`.
pub fn register_builtin_tools(registry: &mut ToolRegistry, ctx: ToolContext) {
    // File ops
    registry.register(Arc::new(ReadFileTool));
    registry.register(Arc::new(ListDirectoryTool));
    registry.register(Arc::new(GetFileInfoTool));
    registry.register(Arc::new(SearchFilesTool));
    registry.register(Arc::new(CountLinesTool));
    registry.register(Arc::new(WriteFileTool));
    registry.register(Arc::new(AppendToFileTool));
    registry.register(Arc::new(MoveFileTool));
    registry.register(Arc::new(CopyFileTool));
    registry.register(Arc::new(CreateDirectoryTool));
    registry.register(Arc::new(DeleteFileTool));

    // Shell
    registry.register(Arc::new(ExecuteCommandTool));

    // System
    registry.register(Arc::new(GetCurrentDatetimeTool));
    registry.register(Arc::new(GetSystemInfoTool));
    registry.register(Arc::new(ListProcessesTool));

    // Network
    registry.register(Arc::new(FetchUrlTool));
    registry.register(Arc::new(WebSearchTool));
    registry.register(Arc::new(HttpRequestTool));

    // Git
    registry.register(Arc::new(GitStatusTool));
    registry.register(Arc::new(GitLogTool));
    registry.register(Arc::new(GitDiffTool));
    registry.register(Arc::new(GitBranchTool));
    registry.register(Arc::new(GitCloneTool));
    registry.register(Arc::new(GitCommitTool));

    // Text/data
    registry.register(Arc::new(SearchInFileTool));
    registry.register(Arc::new(ReplaceInFileTool));
    registry.register(Arc::new(CalculateTool));
    registry.register(Arc::new(ParseJsonTool));
    registry.register(Arc::new(EncodeBase64Tool));
    registry.register(Arc::new(DecodeBase64Tool));

    // Clipboard
    registry.register(Arc::new(ReadClipboardTool { backend: ctx.clipboard.clone() }));
    registry.register(Arc::new(WriteClipboardTool { backend: ctx.clipboard }));

    // Media
    registry.register(Arc::new(TakeScreenshotTool { backend: ctx.screen_capture }));

    // Code exec
    registry.register(Arc::new(RunPythonTool));
    registry.register(Arc::new(RunNodeTool));

    // Screen control
    registry.register(Arc::new(GetScreenInfoTool { backend: ctx.screen_controller.clone() }));
    registry.register(Arc::new(MoveMouseTool { backend: ctx.screen_controller.clone() }));
    registry.register(Arc::new(ClickMouseTool { backend: ctx.screen_controller.clone() }));
    registry.register(Arc::new(ScrollMouseTool { backend: ctx.screen_controller.clone() }));
    registry.register(Arc::new(TypeTextTool { backend: ctx.screen_controller.clone() }));
    registry.register(Arc::new(PressKeyTool { backend: ctx.screen_controller.clone() }));
    registry.register(Arc::new(RunPlatformScriptTool { backend: ctx.screen_controller }));

    // Memory
    registry.register(Arc::new(MemorySaveTool { store: ctx.memory_store.clone() }));
    registry.register(Arc::new(MemoryReadTool { store: ctx.memory_store.clone() }));
    registry.register(Arc::new(MemoryListTool { store: ctx.memory_store.clone() }));
    registry.register(Arc::new(MemoryDeleteTool { store: ctx.memory_store }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FileMemoryStore;

    #[test]
    fn register_builtin_tools_populates_every_category() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn MemoryStore> =
            Arc::new(FileMemoryStore::open(dir.path().join("memory.json")).unwrap());
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, ToolContext::headless(store));

        assert!(registry.get("read_file").is_some());
        assert!(registry.get("execute_command").is_some());
        assert!(registry.get("get_system_info").is_some());
        assert!(registry.get("fetch_url").is_some());
        assert!(registry.get("git_status").is_some());
        assert!(registry.get("calculate").is_some());
        assert!(registry.get("read_clipboard").is_some());
        assert!(registry.get("take_screenshot").is_some());
        assert!(registry.get("run_python").is_some());
        assert!(registry.get("move_mouse").is_some());
        assert!(registry.get("memory_save").is_some());
        assert!(registry.get("update_self").is_none());
    }
}
