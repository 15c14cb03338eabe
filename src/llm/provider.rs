//! External LLM client contract (`spec.md` §6).
//!
//! Grounded on the teacher's `ai/provider.rs::LLMProvider` trait
//! (`async_trait`, `complete`/`stream`/`context_limit`/`supports_tools`/
//! `provider_name`), renamed to `LlmClient` and its two operations renamed
//! to `send_message`/`send_message_stream` per the spec's external
//! interface naming. The multi-provider implementation itself (OpenAI,
//! Anthropic, Gemini, Ollama) is an external collaborator per §1 Out-of-scope;
//! this crate only depends on the trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::types::{CompletionRequest, CompletionResponse, StreamChunk};

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider does not support tool calling")]
    ToolsUnsupported,

    #[error("request rejected by provider: {0}")]
    Rejected(String),
}

pub type StreamResponse = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Contract every LLM backend must satisfy.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Non-streaming completion.
    async fn send_message(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Streaming completion, used when tools are absent.
    async fn send_message_stream(&self, request: CompletionRequest) -> Result<StreamResponse>;

    /// Maximum context window size in tokens.
    fn context_limit(&self) -> u32;

    /// Whether this provider supports structured tool calling.
    fn supports_tools(&self) -> bool;

    /// Human-readable provider identifier (e.g. `"openai"`, `"anthropic"`).
    fn provider_name(&self) -> &str;

    /// Optional warmup/health-check hook; default no-op.
    async fn warmup(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    #[async_trait]
    impl LlmClient for Stub {
        async fn send_message(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            Err(LlmError::Transport("not implemented".to_string()))
        }

        async fn send_message_stream(&self, _request: CompletionRequest) -> Result<StreamResponse> {
            Err(LlmError::Transport("not implemented".to_string()))
        }

        fn context_limit(&self) -> u32 {
            8192
        }

        fn supports_tools(&self) -> bool {
            false
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn warmup_default_impl_is_ok() {
        let stub = Stub;
        assert!(stub.warmup().await.is_ok());
    }
}
