//! Application configuration loaded from CLI, environment, and files.
//!
//! [`PrpulseConfig`] merges values from command-line arguments, environment
//! variables, and configuration files using ortho-config's layered approach,
//! then derives the component configurations for the request queue and the
//! dispatcher.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prpulse.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRPULSE_AI_API_KEY`, `PRPULSE_AI_MODEL`,
//!    and so on, plus the legacy `GOOGLE_AI_KEY`
//! 4. **Command-line arguments** – `--ai-api-key`/`-k`, `--prompt`/`-p`, ...
//!
//! # Configuration File
//!
//! ```toml
//! ai_api_key = "example-key"
//! ai_model = "gemini-pro"
//! max_requests_per_window = 20
//! rate_window_seconds = 60
//! max_retries = 3
//! retry_delay_seconds = 60
//! telemetry = true
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::ai::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GeminiConfig};
use crate::error::RequestError;
use crate::queue::QueueConfig;

/// Legacy environment variable consulted when no API key is configured.
pub const LEGACY_API_KEY_ENV: &str = "GOOGLE_AI_KEY";

const DEFAULT_MAX_REQUESTS_PER_WINDOW: u32 = 20;
const DEFAULT_RATE_WINDOW_SECONDS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_SECONDS: u64 = 60;

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use prpulse::PrpulseConfig;
///
/// let config = PrpulseConfig::load().expect("failed to load configuration");
/// config.validate().expect("configuration should be consistent");
/// let queue_config = config.queue_config();
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRPULSE",
    discovery(
        dotfile_name = ".prpulse.toml",
        config_file_name = "prpulse.toml",
        app_name = "prpulse"
    )
)]
pub struct PrpulseConfig {
    /// API key for the generative-text endpoint.
    ///
    /// Can be provided via:
    /// - CLI: `--ai-api-key <KEY>` or `-k <KEY>`
    /// - Environment: `PRPULSE_AI_API_KEY` or `GOOGLE_AI_KEY` (legacy)
    /// - Config file: `ai_api_key = "..."`
    #[ortho_config(cli_short = 'k')]
    pub ai_api_key: Option<String>,

    /// Base URL of the generative-text API.
    #[ortho_config(cli_short = 'b')]
    pub ai_base_url: String,

    /// Model identifier used in the request path.
    #[ortho_config(cli_short = 'm')]
    pub ai_model: String,

    /// HTTP timeout for one attempt, in seconds.
    #[ortho_config(cli_short = 'T')]
    pub ai_timeout_seconds: u64,

    /// Successful dispatches allowed per rate window.
    #[ortho_config(cli_short = 'n')]
    pub max_requests_per_window: u32,

    /// Rate window length, in seconds.
    #[ortho_config(cli_short = 'w')]
    pub rate_window_seconds: u64,

    /// Retries granted to a rate-limited task before it is rejected.
    #[ortho_config(cli_short = 'r')]
    pub max_retries: u32,

    /// Back-off after a rate-limited attempt, in seconds.
    #[ortho_config(cli_short = 'd')]
    pub retry_delay_seconds: u64,

    /// Single prompt to answer before exiting.
    ///
    /// Without a prompt the CLI reads prompts line by line from stdin.
    #[ortho_config(cli_short = 'p')]
    pub prompt: Option<String>,

    /// Emits queue telemetry as JSON lines on stderr.
    ///
    /// Environment variables do not carry boolean values through
    /// `ortho_config`; use `--telemetry`/`-t` or `telemetry = true`.
    #[ortho_config(cli_short = 't')]
    pub telemetry: bool,
}

impl Default for PrpulseConfig {
    fn default() -> Self {
        Self {
            ai_api_key: None,
            ai_base_url: DEFAULT_BASE_URL.to_owned(),
            ai_model: DEFAULT_MODEL.to_owned(),
            ai_timeout_seconds: DEFAULT_TIMEOUT_SECS,
            max_requests_per_window: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            rate_window_seconds: DEFAULT_RATE_WINDOW_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
            prompt: None,
            telemetry: false,
        }
    }
}

impl PrpulseConfig {
    /// Resolves the API key from configuration or the legacy
    /// `GOOGLE_AI_KEY` environment variable.
    ///
    /// Blank values count as absent.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.ai_api_key
            .clone()
            .or_else(|| env::var(LEGACY_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Derives the request queue configuration.
    #[must_use]
    pub const fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_requests_per_window: self.max_requests_per_window,
            window: Duration::from_secs(self.rate_window_seconds),
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_seconds),
        }
    }

    /// Derives the dispatcher configuration, resolving the API key.
    #[must_use]
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig::new(
            self.ai_base_url.as_str(),
            self.ai_model.as_str(),
            self.resolve_api_key(),
            Duration::from_secs(self.ai_timeout_seconds),
        )
    }

    /// Validates that the queue settings can make progress.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Configuration`] when the rate window length
    /// or the per-window maximum is zero, or the model or base URL is blank.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.rate_window_seconds == 0 {
            return Err(configuration("rate_window_seconds must be greater than zero"));
        }
        if self.max_requests_per_window == 0 {
            return Err(configuration(
                "max_requests_per_window must be greater than zero",
            ));
        }
        if self.ai_model.trim().is_empty() {
            return Err(configuration("ai_model must not be empty"));
        }
        if self.ai_base_url.trim().is_empty() {
            return Err(configuration("ai_base_url must not be empty"));
        }
        Ok(())
    }
}

fn configuration(message: &str) -> RequestError {
    RequestError::Configuration {
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests;
