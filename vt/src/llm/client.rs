//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless extraction-service client - each call is independent
///
/// Passed into the flow as `Arc<dyn LlmClient>` so tests can substitute a
/// scripted double. Implementations make exactly one attempt per call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
