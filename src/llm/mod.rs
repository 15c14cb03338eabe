pub mod mock;
pub mod provider;
pub mod types;

pub use mock::{MockLlmClient, MockTurn};
pub use provider::{LlmClient, LlmError, Result, StreamResponse};
pub use types::{
    CompletionRequest, CompletionResponse, ImageBlock, Message, MessageRole, StreamChunk,
    TokenUsage, ToolCallRequest, ToolParameterSchema, ToolSchema,
};
