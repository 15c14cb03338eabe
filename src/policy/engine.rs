//! Policy & Risk Engine.
//!
//! Turns a tool call plus an agent's `SecurityPolicy` into one of
//! `{allow, ask, block}` via a deterministic, ordered algorithm. Grounded
//! on the teacher's `SecurityPolicy` (`AutonomyLevel`, `RiskLevel`,
//! `ValidationResult`, `detect_injection`, `default_blocked_dirs`,
//! `classify_executable_risk`), generalized from the teacher's fixed
//! `AutonomyLevel` enum to the spec's richer per-agent policy struct.

use serde::{Deserialize, Serialize};

// ─── RiskLevel ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Decision ─────────────────────────────────────────────────────────────

/// The outcome of evaluating a tool call against a `SecurityPolicy`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The operation may proceed immediately.
    Allow,
    /// The operation requires explicit human approval before proceeding.
    Ask {
        risk: RiskLevel,
        reasoning: String,
        impact: String,
    },
    /// The operation is prohibited.
    Block {
        risk: RiskLevel,
        reasoning: String,
    },
}

impl Decision {
    pub fn risk(&self) -> RiskLevel {
        match self {
            Decision::Allow => RiskLevel::Low,
            Decision::Ask { risk, .. } => *risk,
            Decision::Block { risk, .. } => *risk,
        }
    }
}

// ─── SecurityPolicy ───────────────────────────────────────────────────────

/// Per-agent authorization policy (`spec.md` §3).
///
/// Invariant: a denylist match always overrides an allowlist match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub allow_privileged_shell: bool,
    pub require_approval: bool,
    /// Ordered sequence of prefixes; empty means "any".
    pub command_allowlist: Vec<String>,
    /// Substrings that always block a command.
    pub command_denylist: Vec<String>,
    /// Path prefixes that are always denied.
    pub restricted_paths: Vec<String>,
    pub max_execution_time_seconds: u64,
    pub auto_approve_ceiling: RiskLevel,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allow_privileged_shell: false,
            require_approval: true,
            command_allowlist: Vec::new(),
            command_denylist: Vec::new(),
            restricted_paths: default_restricted_paths(),
            max_execution_time_seconds: 30,
            auto_approve_ceiling: RiskLevel::Low,
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

/// Catastrophic shell patterns that always block regardless of policy.
const CATASTROPHIC_PATTERNS: &[&str] = &[
    "rm -rf /",
    "dd if=/dev/zero",
    ":(){ :|:& };:",
    "chmod -R 777",
    "chown -R",
    "mkfs",
    "format",
    "> /dev/sda",
    "mv /* /dev/null",
];

const PRIVILEGE_TOKENS: &[&str] = &["sudo ", "su -", "su root"];

const DELETION_OR_PERMISSION_VERBS: &[&str] = &[
    "rm ", "rmdir", "delete", "chmod", "chown", "unlink", "del ",
];

impl SecurityPolicy {
    /// Evaluate a shell command against this policy (spec.md §4.C steps 1-5).
    ///
    /// `intrinsic_risk` is the tool descriptor's declared risk level;
    /// `path` is an optional path argument also subject to `restricted_paths`.
    pub fn evaluate_command(
        &self,
        command: &str,
        intrinsic_risk: RiskLevel,
        path: Option<&str>,
    ) -> Decision {
        // 1. Denylist scan.
        if let Some(reason) = self.denylist_hit(command, path) {
            return Decision::Block {
                risk: RiskLevel::Critical,
                reasoning: reason,
            };
        }

        // 2. Privilege check.
        let is_privileged = PRIVILEGE_TOKENS.iter().any(|tok| command.trim_start().starts_with(tok));
        if is_privileged && !self.allow_privileged_shell {
            return Decision::Block {
                risk: RiskLevel::High,
                reasoning: "privileged shell execution is not permitted".to_string(),
            };
        }

        // 3. Allowlist gate.
        if !self.command_allowlist.is_empty()
            && !self.command_allowlist.iter().any(|prefix| command.starts_with(prefix.as_str()))
        {
            return Decision::Block {
                risk: RiskLevel::High,
                reasoning: "command does not match the agent's allowlist".to_string(),
            };
        }

        // 4. Risk classification.
        let effective_risk = self.effective_risk(command, intrinsic_risk, path, is_privileged);

        // 5. Auto-approve decision.
        let reasoning = self.reasoning_for(effective_risk, is_privileged, path);
        let impact = self.impact_for(command, path);

        if !self.require_approval && effective_risk <= self.auto_approve_ceiling {
            Decision::Allow
        } else {
            Decision::Ask {
                risk: effective_risk,
                reasoning,
                impact,
            }
        }
    }

    fn denylist_hit(&self, command: &str, path: Option<&str>) -> Option<String> {
        for pattern in CATASTROPHIC_PATTERNS {
            if command.contains(pattern) {
                return Some(format!("matches critical pattern: {pattern}"));
            }
        }
        for substring in &self.command_denylist {
            if command.contains(substring.as_str()) {
                return Some(format!("command matches denylist entry '{substring}'"));
            }
            if let Some(p) = path {
                if p.contains(substring.as_str()) {
                    return Some(format!("path matches denylist entry '{substring}'"));
                }
            }
        }
        None
    }

    fn effective_risk(
        &self,
        command: &str,
        intrinsic_risk: RiskLevel,
        path: Option<&str>,
        is_privileged: bool,
    ) -> RiskLevel {
        let mut risk = intrinsic_risk;

        if let Some(p) = path {
            if self.restricted_paths.iter().any(|prefix| p.starts_with(prefix.as_str())) {
                risk = risk.max(RiskLevel::High);
            }
        }

        if DELETION_OR_PERMISSION_VERBS.iter().any(|verb| command.contains(verb)) {
            risk = risk.max(RiskLevel::Medium);
        }

        if is_privileged {
            risk = risk.max(RiskLevel::High);
        }

        risk
    }

    fn reasoning_for(&self, risk: RiskLevel, is_privileged: bool, path: Option<&str>) -> String {
        if is_privileged {
            return "privileged shell execution requires human review".to_string();
        }
        if let Some(p) = path {
            if self.restricted_paths.iter().any(|prefix| p.starts_with(prefix.as_str())) {
                return format!("target path '{p}' falls under a restricted prefix");
            }
        }
        format!("classified as {risk} risk")
    }

    fn impact_for(&self, command: &str, path: Option<&str>) -> String {
        if DELETION_OR_PERMISSION_VERBS.iter().any(|verb| command.contains(verb)) {
            return "files will be permanently deleted".to_string();
        }
        if PRIVILEGE_TOKENS.iter().any(|tok| command.trim_start().starts_with(tok)) {
            return "system-wide changes may occur".to_string();
        }
        match path {
            Some(p) => format!("Target: {p}"),
            None => format!("Target: {command}"),
        }
    }

    /// Validate a filesystem path against `restricted_paths`.
    pub fn validate_path(&self, path: &str) -> Decision {
        if path.contains('\0') {
            return Decision::Block {
                risk: RiskLevel::Critical,
                reasoning: "path contains null byte".to_string(),
            };
        }
        if path.contains("..") {
            return Decision::Block {
                risk: RiskLevel::High,
                reasoning: "path traversal ('..') is not allowed".to_string(),
            };
        }
        if self.restricted_paths.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Decision::Block {
                risk: RiskLevel::High,
                reasoning: format!("access to '{path}' is restricted"),
            };
        }
        Decision::Allow
    }
}
