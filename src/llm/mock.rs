//! Test double for `LlmClient`.
//!
//! Grounded on the teacher's `agent/loop_.rs::MockProvider` test helper
//! (an `AtomicUsize`-indexed queue of canned responses), extended to return
//! structured `ToolCallRequest`s directly rather than text the loop has to
//! scrape for `<tool_call>` tags — this core's execution loop consumes
//! `CompletionResponse::tool_calls` as-is.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::provider::{LlmClient, LlmError, Result, StreamResponse};
use super::types::{CompletionRequest, CompletionResponse, ToolCallRequest};

/// One canned response in a `MockLlmClient`'s script.
#[derive(Debug, Clone)]
pub enum MockTurn {
    Text(String),
    ToolCalls(Vec<ToolCallRequest>),
}

pub struct MockLlmClient {
    turns: Vec<MockTurn>,
    index: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            turns,
            index: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor for a client that only ever returns text.
    pub fn text_only(responses: Vec<&str>) -> Self {
        Self::new(responses.into_iter().map(|s| MockTurn::Text(s.to_string())).collect())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn send_message(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        match self.turns.get(i) {
            Some(MockTurn::Text(text)) => Ok(CompletionResponse {
                content: Some(text.clone()),
                tool_calls: Vec::new(),
                model: "mock".to_string(),
                usage: None,
                finish_reason: "stop".to_string(),
            }),
            Some(MockTurn::ToolCalls(calls)) => Ok(CompletionResponse {
                content: None,
                tool_calls: calls.clone(),
                model: "mock".to_string(),
                usage: None,
                finish_reason: "tool_calls".to_string(),
            }),
            None => Ok(CompletionResponse {
                content: Some("No more responses".to_string()),
                tool_calls: Vec::new(),
                model: "mock".to_string(),
                usage: None,
                finish_reason: "stop".to_string(),
            }),
        }
    }

    async fn send_message_stream(&self, _request: CompletionRequest) -> Result<StreamResponse> {
        Err(LlmError::Transport("streaming not supported by MockLlmClient".to_string()))
    }

    fn context_limit(&self) -> u32 {
        128_000
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Message;

    #[tokio::test]
    async fn returns_canned_text_in_order() {
        let client = MockLlmClient::text_only(vec!["first", "second"]);
        let req = CompletionRequest::new("mock", vec![Message::user("hi")]);

        let r1 = client.send_message(req.clone()).await.unwrap();
        assert_eq!(r1.content.as_deref(), Some("first"));

        let r2 = client.send_message(req).await.unwrap();
        assert_eq!(r2.content.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn exhausted_script_returns_fallback_text() {
        let client = MockLlmClient::text_only(vec!["only"]);
        let req = CompletionRequest::new("mock", vec![Message::user("hi")]);

        client.send_message(req.clone()).await.unwrap();
        let r2 = client.send_message(req).await.unwrap();
        assert_eq!(r2.content.as_deref(), Some("No more responses"));
    }

    #[tokio::test]
    async fn tool_calls_turn_returns_structured_calls() {
        let call = ToolCallRequest {
            id: "call-1".to_string(),
            name: "echo".to_string(),
            arguments: std::collections::HashMap::from([("message".to_string(), "ping".to_string())]),
        };
        let client = MockLlmClient::new(vec![MockTurn::ToolCalls(vec![call])]);
        let req = CompletionRequest::new("mock", vec![Message::user("hi")]);

        let response = client.send_message(req).await.unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "echo");
        assert!(response.content.is_none());
    }
}
