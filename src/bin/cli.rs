//! Headless CLI host for the agent execution core.
//!
//! Wires a single agent's tools, security policy, approval queue, and audit
//! journal together and runs one `ExecutionLoop::run` against a user-supplied
//! message. Approvals that need a human are surfaced on stdin/stdout; there
//! is no real LLM backend wired in (that integration is out of scope for
//! this core, see `llm::LlmClient`), so by default this drives a
//! `MockLlmClient` seeded from `--script`.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;

use agentcore::agent::{AgentSnapshot, ExecutionLoop};
use agentcore::approval::ApprovalQueue;
use agentcore::audit::AuditJournal;
use agentcore::config::{AppConfig, load_default_config};
use agentcore::event_bus::TokioBroadcastBus;
use agentcore::llm::{MockLlmClient, MockTurn};
use agentcore::memory::{FileMemoryStore, default_memory_path};
use agentcore::policy::{RiskLevel, SecurityPolicy};
use agentcore::tools::{ToolContext, ToolRegistry, register_builtin_tools};

#[derive(Parser, Debug)]
#[command(name = "agentcore", about = "Run one agent execution session")]
struct Args {
    /// The user message that starts the session.
    message: String,

    /// Model identifier recorded on the session snapshot.
    #[arg(long, default_value = "gpt-4")]
    model: String,

    /// System prompt for the agent.
    #[arg(long, default_value = "You are a careful, methodical assistant.")]
    system_prompt: String,

    /// Run with the wider agent-mode tool set and iteration ceiling.
    #[arg(long)]
    agent_mode: bool,

    /// Canned assistant reply text, used in place of a real LLM backend.
    /// Pass multiple times to script a multi-turn conversation.
    #[arg(long = "script")]
    script: Vec<String>,
}

#[tokio::main]
async fn main() {
    agentcore::logging::init();
    let args = Args::parse();

    let config = load_default_config();
    let policy = security_policy_from_config(&config);

    let memory_store: Arc<dyn agentcore::memory::MemoryStore> = Arc::new(
        default_memory_path()
            .and_then(FileMemoryStore::open)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to in-process memory store");
                FileMemoryStore::open(std::env::temp_dir().join("agentcore-memory.json"))
                    .expect("temp memory store")
            }),
    );

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, ToolContext::headless(memory_store));
    let registry = Arc::new(registry);

    let bus = Arc::new(TokioBroadcastBus::new());
    let audit = Arc::new(AuditJournal::open_in_memory().expect("open audit journal"));

    let approvals = Arc::new(ApprovalQueue::with_event_bus(bus.clone()));
    approvals.spawn_sweeper(config.approval.sweep_interval_secs);

    let script = if args.script.is_empty() {
        vec!["Done.".to_string()]
    } else {
        args.script.clone()
    };
    let llm = Arc::new(MockLlmClient::new(
        script.into_iter().map(MockTurn::Text).collect(),
    ));

    let loop_ = Arc::new(
        ExecutionLoop::new(llm, registry, approvals.clone(), audit)
            .with_event_bus(bus)
            .with_approval_timeout_secs(config.approval.default_timeout_secs),
    );

    let prompter = tokio::spawn(prompt_pending_approvals(approvals));

    let snapshot = AgentSnapshot::new(uuid::Uuid::new_v4().to_string(), args.model, args.system_prompt)
        .with_agent_mode(args.agent_mode)
        .with_security_policy(policy);

    let session = loop_
        .run(uuid::Uuid::new_v4().to_string(), "cli-user", args.message, snapshot)
        .await;

    prompter.abort();

    println!("--- session {} ({:?}) ---", session.id, session.status);
    for step in &session.steps {
        println!("{step:?}");
    }
    if let Some(result) = &session.result {
        println!("--- result ---");
        println!("success: {}", result.success);
        println!("output: {}", result.output);
        if let Some(err) = &result.error {
            println!("error: {err}");
        }
    }
}

fn security_policy_from_config(config: &AppConfig) -> SecurityPolicy {
    let ceiling = match config.security.auto_approve_ceiling.as_str() {
        "medium" => RiskLevel::Medium,
        "high" => RiskLevel::High,
        "critical" => RiskLevel::Critical,
        _ => RiskLevel::Low,
    };
    SecurityPolicy {
        allow_privileged_shell: config.security.allow_privileged_shell,
        require_approval: config.security.require_approval,
        command_allowlist: config.security.command_allowlist.clone(),
        command_denylist: config.security.command_denylist.clone(),
        restricted_paths: config.security.restricted_paths.clone(),
        max_execution_time_seconds: config.security.max_execution_time_seconds,
        auto_approve_ceiling: ceiling,
    }
}

/// Poll the approval queue and prompt on stdin whenever a request surfaces.
/// Runs for the lifetime of the session; aborted once the loop returns.
async fn prompt_pending_approvals(approvals: Arc<ApprovalQueue>) {
    let mut handled = std::collections::HashSet::new();
    loop {
        if let Some(req) = approvals.current().await {
            if handled.insert(req.id.clone()) {
                println!(
                    "\n[approval needed] tool={} risk={:?}\n  command: {}\n  reasoning: {}\n  impact: {}",
                    req.tool_name, req.risk, req.command, req.reasoning, req.impact
                );
                print!("approve? [y/N] ");
                let _ = std::io::stdout().flush();

                let mut line = String::new();
                if std::io::stdin().read_line(&mut line).is_ok() && line.trim().eq_ignore_ascii_case("y") {
                    let _ = approvals.approve(&req.id, None, None).await;
                } else {
                    let _ = approvals.deny(&req.id, Some("denied via CLI".to_string())).await;
                }
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}
