//! Chat-completion trait

use crate::chat::{Completion, CompletionRequest};
use crate::error::Degraded;
use async_trait::async_trait;

/// LLM chat-completion service
///
/// The request carries its own timeout; implementations must honor it and
/// report an elapsed deadline as `DegradeKind::Timeout`.
#[async_trait]
pub trait ChatCompletion: Send + Sync + 'static {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, Degraded>;

    /// Whether the backend is configured and reachable
    async fn is_available(&self) -> bool {
        true
    }
}
