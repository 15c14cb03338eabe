//! TOML configuration loading, env-var overrides, and atomic saves.
//!
//! # Loading order
//! 1. Parse `~/.agentcore/config.toml` (or the path in `AGENTCORE_CONFIG`)
//! 2. Apply `AGENTCORE_*` environment variable overrides
//! 3. Fall back to [`AppConfig::default()`] if the file is missing
//!
//! # Atomic save
//! Writes to `<path>.tmp` → backup existing file as `<path>.bak` → rename to
//! `<path>`, so a crash mid-write never corrupts the config file.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use super::schema::AppConfig;

// ─── default_config_path ─────────────────────────────────────────────────────

/// Return the default config file path: `~/.agentcore/config.toml`.
pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::home_dir()
        .map(|h| h.join(".agentcore").join("config.toml"))
        .ok_or_else(|| "could not determine home directory".to_string())
}

// ─── load_config ─────────────────────────────────────────────────────────────

/// Load [`AppConfig`] from the given path, falling back to defaults if the
/// file does not exist, then applying environment variable overrides.
pub fn load_config(path: &Path) -> Result<AppConfig, String> {
    let mut config = match fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)
            .map_err(|e| format!("failed to parse config at {path:?}: {e}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => return Err(format!("failed to read config at {path:?}: {e}")),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load config from the default path, or `AGENTCORE_CONFIG` if set.
pub fn load_default_config() -> AppConfig {
    let path = env::var("AGENTCORE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            default_config_path().unwrap_or_else(|_| PathBuf::from("config.toml"))
        });

    load_config(&path).unwrap_or_default()
}

// ─── apply_env_overrides ─────────────────────────────────────────────────────

/// Apply `AGENTCORE_*` environment variable overrides to `config`.
///
/// Supported overrides:
/// - `AGENTCORE_LLM_PROVIDER`        → `llm.default_provider`
/// - `AGENTCORE_OLLAMA_URL`          → `llm.default_ollama_url`
/// - `AGENTCORE_AUTO_APPROVE_CEILING`→ `security.auto_approve_ceiling`
/// - `AGENTCORE_REQUIRE_APPROVAL`    → `security.require_approval` (1/0)
/// - `AGENTCORE_ALLOW_PRIVILEGED_SHELL` → `security.allow_privileged_shell` (1/0)
/// - `AGENTCORE_AUDIT_DB_PATH`       → `audit.db_path`
/// - `AGENTCORE_APPROVAL_TIMEOUT_SECS` → `approval.default_timeout_secs`
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(v) = env::var("AGENTCORE_LLM_PROVIDER") {
        config.llm.default_provider = v;
    }
    if let Ok(v) = env::var("AGENTCORE_OLLAMA_URL") {
        config.llm.default_ollama_url = v;
    }
    if let Ok(v) = env::var("AGENTCORE_AUTO_APPROVE_CEILING") {
        config.security.auto_approve_ceiling = v;
    }
    if let Ok(v) = env::var("AGENTCORE_REQUIRE_APPROVAL") {
        config.security.require_approval = v == "1" || v.eq_ignore_ascii_case("true");
    }
    if let Ok(v) = env::var("AGENTCORE_ALLOW_PRIVILEGED_SHELL") {
        config.security.allow_privileged_shell = v == "1" || v.eq_ignore_ascii_case("true");
    }
    if let Ok(v) = env::var("AGENTCORE_AUDIT_DB_PATH") {
        config.audit.db_path = Some(v);
    }
    if let Ok(v) = env::var("AGENTCORE_APPROVAL_TIMEOUT_SECS") {
        if let Ok(secs) = v.parse::<u64>() {
            config.approval.default_timeout_secs = secs;
        }
    }
}

// ─── save_config ─────────────────────────────────────────────────────────────

/// Atomically save `config` to `path`.
///
/// Writes to `<path>.tmp`, backs up the existing file as `<path>.bak`, then
/// renames the temp file to `<path>`.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| format!("failed to serialise config: {e}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create config dir: {e}"))?;
    }

    let tmp_path = path.with_extension("toml.tmp");

    fs::write(&tmp_path, &content)
        .map_err(|e| format!("failed to write temp config: {e}"))?;

    if path.exists() {
        let bak_path = path.with_extension("toml.bak");
        fs::copy(path, &bak_path)
            .map_err(|e| format!("failed to backup config: {e}"))?;
    }

    fs::rename(&tmp_path, path)
        .map_err(|e| format!("failed to replace config file: {e}"))?;

    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
