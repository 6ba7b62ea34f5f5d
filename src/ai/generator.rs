//! Text generation contract shared by the CLI and chat session.

use async_trait::async_trait;

use crate::error::RequestError;

/// Produces generated text for a prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the provider call fails.
    async fn generate(&self, prompt: &str) -> Result<String, RequestError>;
}
