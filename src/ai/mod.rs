//! Generative-text request dispatch.
//!
//! [`GeminiDispatcher`] turns a prompt into one queued HTTP call and maps the
//! response into plain text or a [`crate::RequestError`]. Consumers depend on
//! the [`TextGenerator`] trait rather than the concrete dispatcher.

mod gemini;
mod generator;
mod payload;

pub use gemini::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GeminiConfig, GeminiDispatcher,
};
#[cfg(test)]
pub use generator::MockTextGenerator;
pub use generator::TextGenerator;
pub use payload::NO_RESPONSE_PLACEHOLDER;
