use crate::error::Result;
use async_trait::async_trait;

/// Port to the external language-completion service. Callers treat any
/// schema violation in the response as a failure, never a partial success;
/// every call site has a deterministic local fallback.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    /// Submit a system + user prompt and get back a parsed JSON object.
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<serde_json::Value>;
}
