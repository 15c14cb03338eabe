//! Tool schema generation for LLM context.
//!
//! Provides functions to generate text descriptions of tools that can be
//! injected into the system prompt so the LLM knows what tools are available
//! and how to invoke them.

use std::collections::HashSet;

use super::registry::ToolRegistry;

/// Generate a text description of tools for LLM context, optionally
/// filtered to `enabled_names`.
///
/// Passing `None` describes every registered tool.
pub fn generate_tool_schema_text(
    registry: &ToolRegistry,
    enabled_names: Option<&HashSet<String>>,
) -> String {
    let mut output = String::from("# Available Tools\n\n");
    output += "You have access to the following tools. To use a tool, output a JSON block:\n";
    output += "```json\n{\"tool\": \"tool_name\", \"arguments\": {...}}\n```\n\n";
    output += "---\n\n";

    let tools = match enabled_names {
        Some(names) => registry.list_filtered(names),
        None => registry.list(),
    };

    if tools.is_empty() {
        output += "*No tools available for this agent.*\n";
        return output;
    }

    for tool in tools {
        output += &format!("## {} ({})\n\n", tool.name, tool.category);
        output += &format!("{}\n\n", tool.description);
        output += "**Parameters:**\n```json\n";
        output += &serde_json::to_string_pretty(&tool.schema).unwrap_or_else(|e| {
            tracing::warn!(tool = %tool.name, error = %e, "failed to serialize tool schema");
            format!("{{\"error\": \"{e}\"}}")
        });
        output += "\n```\n\n---\n\n";
    }

    output
}

/// Generate a compact one-line description of available tools.
///
/// Useful for contexts where token usage is critical.
pub fn generate_tool_summary(registry: &ToolRegistry, enabled_names: Option<&HashSet<String>>) -> String {
    let tools = match enabled_names {
        Some(names) => registry.list_filtered(names),
        None => registry.list(),
    };
    if tools.is_empty() {
        return "No tools available.".to_string();
    }

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    format!("Available tools: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RiskLevel;
    use crate::tools::traits::{Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct TestTool {
        name: &'static str,
        desc: &'static str,
        schema: Value,
    }

    #[async_trait]
    impl Tool for TestTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            self.desc
        }
        fn category(&self) -> &str {
            "test"
        }
        fn intrinsic_risk(&self) -> RiskLevel {
            RiskLevel::Low
        }
        fn parameters_schema(&self) -> Value {
            self.schema.clone()
        }
        async fn execute(&self, _args: Value) -> Result<ToolResult, String> {
            Ok(ToolResult::ok("done"))
        }
    }

    #[test]
    fn generates_schema_for_allowed_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool {
            name: "web_search",
            desc: "Search the web",
            schema: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        }));
        registry.register(Arc::new(TestTool {
            name: "execute_command",
            desc: "Execute shell commands",
            schema: json!({"type": "object", "properties": {"command": {"type": "string"}}}),
        }));

        let enabled: HashSet<String> = ["web_search".to_string()].into_iter().collect();
        let output = generate_tool_schema_text(&registry, Some(&enabled));

        assert!(output.contains("# Available Tools"));
        assert!(output.contains("web_search"));
        assert!(output.contains("Search the web"));
        assert!(!output.contains("execute_command"));
    }

    #[test]
    fn generates_empty_output_for_no_tools() {
        let registry = ToolRegistry::new();
        let output = generate_tool_schema_text(&registry, None);

        assert!(output.contains("No tools available"));
    }

    #[test]
    fn summary_lists_tool_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool {
            name: "web_search",
            desc: "Search",
            schema: json!({}),
        }));
        registry.register(Arc::new(TestTool {
            name: "fetch_url",
            desc: "Fetch",
            schema: json!({}),
        }));

        let summary = generate_tool_summary(&registry, None);
        assert!(summary.contains("web_search"));
        assert!(summary.contains("fetch_url"));
    }
}
