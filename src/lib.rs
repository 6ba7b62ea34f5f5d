//! Prpulse library crate: a rate-limited request queue and the dispatcher
//! that feeds it with generative-text calls.
//!
//! The [`queue`] module serialises outbound work through one worker that
//! honours a per-window request quota and requeues rate-limited tasks at the
//! tail. The [`ai`] module submits each generation call to that queue, and
//! [`chat`] keeps a transcript on top of any [`TextGenerator`].

pub mod ai;
pub mod chat;
pub mod config;
pub mod error;
pub mod queue;
pub mod telemetry;

pub use ai::{GeminiConfig, GeminiDispatcher, TextGenerator};
pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use config::PrpulseConfig;
pub use error::RequestError;
pub use queue::{QueueConfig, RequestQueue, TaskHandle};
pub use telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
