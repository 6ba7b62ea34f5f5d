//! Tests for configuration layer precedence.

use rstest::rstest;
use serde_json::json;

use super::helpers::{Layer, compose};
use crate::PrpulseConfig;

fn model(config: &PrpulseConfig) -> Option<&str> {
    Some(config.ai_model.as_str())
}

fn api_key(config: &PrpulseConfig) -> Option<&str> {
    config.ai_api_key.as_deref()
}

fn prompt(config: &PrpulseConfig) -> Option<&str> {
    config.prompt.as_deref()
}

#[rstest]
#[case::file_over_defaults(
    [Layer::Defaults(json!({"ai_model": "default-model"})), Layer::File(json!({"ai_model": "file-model"}))],
    model,
    "file-model"
)]
#[case::environment_over_file(
    [Layer::File(json!({"ai_api_key": "file-key"})), Layer::Environment(json!({"ai_api_key": "env-key"}))],
    api_key,
    "env-key"
)]
#[case::cli_over_environment(
    [Layer::Environment(json!({"prompt": "env prompt"})), Layer::Cli(json!({"prompt": "cli prompt"}))],
    prompt,
    "cli prompt"
)]
fn later_layer_wins(
    #[case] layers: [Layer; 2],
    #[case] read: fn(&PrpulseConfig) -> Option<&str>,
    #[case] expected: &str,
) {
    let config = compose(layers);

    assert_eq!(read(&config), Some(expected));
}

#[rstest]
fn unset_fields_keep_built_in_defaults() {
    let config = compose([Layer::File(json!({"ai_api_key": "file-key"}))]);

    assert_eq!(config.ai_base_url, "https://generativelanguage.googleapis.com/v1");
    assert_eq!(config.ai_model, "gemini-pro");
    assert_eq!(config.ai_timeout_seconds, 30);
    assert_eq!(config.max_requests_per_window, 20);
    assert_eq!(config.rate_window_seconds, 60);
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.retry_delay_seconds, 60);
    assert!(config.prompt.is_none(), "prompt should default to None");
    assert!(!config.telemetry, "telemetry should default to false");
}

#[rstest]
fn numeric_queue_settings_merge_across_layers() {
    let config = compose([
        Layer::File(json!({"max_requests_per_window": 5, "max_retries": 1})),
        Layer::Cli(json!({"max_retries": 0, "telemetry": true})),
    ]);

    assert_eq!(config.max_requests_per_window, 5, "file value should survive");
    assert_eq!(config.max_retries, 0, "CLI should win for max_retries");
    assert!(config.telemetry, "CLI should enable telemetry");
}
