//! Secure execution core for an agentic platform.
//!
//! This crate is the part of an agent platform that actually runs an agent's
//! turn: it holds the tool registry, the risk/policy engine that decides
//! whether a tool call proceeds automatically, the human approval queue for
//! calls that don't, the audit journal that records what happened, and the
//! execution loop (`agent::ExecutionLoop`) that ties all four together.
//!
//! It deliberately knows nothing about channels, schedulers, or UI shells —
//! see `bin/cli.rs` for a minimal host that wires this core up to stdin/stdout.

pub mod agent;
pub mod approval;
pub mod audit;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod policy;
pub mod secrets;
pub mod tools;

/// Convenience re-exports for the most commonly used traits and types.
///
/// ```rust
/// use agentcore::prelude::*;
/// ```
pub mod prelude {
    // Execution loop and session model
    pub use crate::agent::{
        AgentSnapshot, ExecutionLoop, ExecutionResult, ExecutionSession, ExecutionStep,
        SessionStatus,
    };

    // Tool system
    pub use crate::tools::{Tool, ToolContext, ToolInfo, ToolRegistry, ToolResult};

    // Policy / risk engine
    pub use crate::policy::{Decision, RiskLevel, SecurityPolicy};

    // Human approval queue
    pub use crate::approval::{ApprovalError, ApprovalQueue, ApprovalRequest, ApprovalStatus};

    // Audit journal
    pub use crate::audit::{AuditEntry, AuditFilter, AuditJournal, AuditResult, Severity};

    // LLM client contract
    pub use crate::llm::{
        CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, MockLlmClient,
    };

    // Memory subsystem
    pub use crate::memory::{FileMemoryStore, MemoryStore};

    // Event bus
    pub use crate::event_bus::{AppEvent, EventBus, TokioBroadcastBus};

    // Configuration
    pub use crate::config::{AppConfig, load_default_config};

    // Errors
    pub use crate::error::{AgentCoreError, Result};
}
