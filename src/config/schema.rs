//! TOML configuration schema for the agent execution core.
//!
//! All fields have `#[serde(default)]` so a partially-filled `config.toml`
//! works correctly. Missing sections fall back to their `Default` impl.
//!
//! Example `~/.agentcore/config.toml`:
//! ```toml
//! [llm]
//! default_provider = "anthropic"
//! default_ollama_url = "http://localhost:11434"
//!
//! [security]
//! auto_approve_ceiling = "low"
//! require_approval = true
//! allow_privileged_shell = false
//!
//! [audit]
//! db_path = "/home/user/.agentcore/audit.db"
//!
//! [approval]
//! default_timeout_secs = 60
//! sweep_interval_secs = 5
//! ```

use serde::{Deserialize, Serialize};

// ─── LlmConfig ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// ID of the default LLM provider (e.g. `"openai"`, `"anthropic"`, `"ollama"`).
    pub default_provider: String,
    /// Base URL for a local Ollama server.
    pub default_ollama_url: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum retry attempts on transient errors.
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: "openai".to_owned(),
            default_ollama_url: "http://localhost:11434".to_owned(),
            request_timeout_secs: 60,
            max_retries: 3,
        }
    }
}

// ─── SecurityConfig ───────────────────────────────────────────────────────────

/// Default values for a per-agent Security Policy (`crate::policy::SecurityPolicy`).
///
/// Individual agents may override any of these; this section supplies the
/// process-wide fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    pub allow_privileged_shell: bool,
    pub require_approval: bool,
    pub command_allowlist: Vec<String>,
    pub command_denylist: Vec<String>,
    pub restricted_paths: Vec<String>,
    pub max_execution_time_seconds: u64,
    /// `"low" | "medium" | "high" | "critical"`.
    pub auto_approve_ceiling: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_privileged_shell: false,
            require_approval: true,
            command_allowlist: Vec::new(),
            command_denylist: Vec::new(),
            restricted_paths: default_restricted_paths(),
            max_execution_time_seconds: 30,
            auto_approve_ceiling: "low".to_owned(),
        }
    }
}

fn default_restricted_paths() -> Vec<String> {
    vec![
        "/etc".to_owned(),
        "/proc".to_owned(),
        "/sys".to_owned(),
        "/root".to_owned(),
    ]
}

// ─── AuditConfig ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Path to the sqlite database backing the journal.
    pub db_path: Option<String>,
    /// Directory `export()` writes CSV files into (default: process temp dir).
    pub export_dir: Option<String>,
}

// ─── ApprovalConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Default approval timeout, in seconds, when an agent's policy does not
    /// specify one.
    pub default_timeout_secs: u64,
    /// Cadence of the expiry sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 60,
            sweep_interval_secs: 5,
        }
    }
}

// ─── AppConfig ────────────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// Loaded from `~/.agentcore/config.toml`, falling back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub security: SecurityConfig,
    pub audit: AuditConfig,
    pub approval: ApprovalConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = AppConfig::default();
        let text = toml::to_string(&cfg).expect("serialize");
        let parsed: AppConfig = toml::from_str(&text).expect("parse");
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let text = r#"
            [security]
            require_approval = false
        "#;
        let cfg: AppConfig = toml::from_str(text).expect("parse");
        assert!(!cfg.security.require_approval);
        assert_eq!(cfg.llm.default_provider, "openai");
        assert_eq!(cfg.approval.default_timeout_secs, 60);
    }
}
