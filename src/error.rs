//! Crate-wide error types.
//!
//! Tool-level failures never surface as a Rust `Err` across the tool-call
//! boundary (see `spec.md` §7) — handlers always resolve to a `ToolResult`
//! whose `output` carries an `Error: ...`-prefixed string. `AgentCoreError`
//! is reserved for infrastructure failures: storage unavailable, malformed
//! configuration, serialization failures, and the like.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentCoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already terminal: {0}")]
    AlreadyTerminal(String),
}

pub type Result<T> = std::result::Result<T, AgentCoreError>;
