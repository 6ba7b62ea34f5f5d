//! Prpulse CLI entrypoint: answers one prompt or runs a line-based chat.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use prpulse::{
    ChatSession, GeminiDispatcher, NoopTelemetrySink, PrpulseConfig, RequestError, RequestQueue,
    StderrJsonlTelemetrySink, TelemetrySink,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const CLEAR_COMMAND: &str = "/clear";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<(), RequestError> {
    let config = load_config()?;
    config.validate()?;

    let telemetry: Arc<dyn TelemetrySink> = if config.telemetry {
        Arc::new(StderrJsonlTelemetrySink)
    } else {
        Arc::new(NoopTelemetrySink)
    };
    let queue = RequestQueue::spawn_with_telemetry(config.queue_config(), telemetry);
    let dispatcher = GeminiDispatcher::new(config.gemini_config(), queue)?;

    match config.prompt.as_deref() {
        Some(prompt) => answer_once(&dispatcher, prompt).await,
        None => chat_loop(&dispatcher).await,
    }
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`RequestError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PrpulseConfig, RequestError> {
    PrpulseConfig::load().map_err(|error| RequestError::Configuration {
        message: error.to_string(),
    })
}

async fn answer_once(dispatcher: &GeminiDispatcher, prompt: &str) -> Result<(), RequestError> {
    let reply = dispatcher.request(prompt).await?;
    write_line(&reply)
}

async fn chat_loop(dispatcher: &GeminiDispatcher) -> Result<(), RequestError> {
    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.map_err(|error| io_error(&error))? {
        if line.trim() == CLEAR_COMMAND {
            session.clear();
            continue;
        }
        if let Some(message) = session.submit(dispatcher, &line).await {
            write_line(&message.content)?;
        }
    }
    Ok(())
}

fn write_line(text: &str) -> Result<(), RequestError> {
    writeln!(io::stdout().lock(), "{text}").map_err(|error| io_error(&error))
}

fn io_error(error: &io::Error) -> RequestError {
    RequestError::Io {
        message: error.to_string(),
    }
}
