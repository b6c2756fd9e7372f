use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::AssistantConfig;

/// Read an environment variable, treating empty values as unset.
pub(super) fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, reporting the key on failure.
pub(super) fn parse_var<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: {e}").into()),
        None => Ok(None),
    }
}

/// Build a configuration from environment variables over the defaults.
///
/// `.env` is loaded by `main` before this runs, so it acts as a lower
/// priority source for the same keys.
pub(super) fn load() -> Result<AssistantConfig, Box<dyn std::error::Error>> {
    let mut config = AssistantConfig::default();

    if let Some(endpoint) = var("REALTIME_ENDPOINT") {
        config.realtime_endpoint = endpoint;
    }
    config.api_key = var("GEMINI_API_KEY").or_else(|| var("API_KEY"));
    if let Some(model) = var("REALTIME_MODEL") {
        config.realtime_model = model;
    }
    if let Some(voice) = var("REALTIME_VOICE") {
        config.voice = voice;
    }
    if let Some(secs) = parse_var("REALTIME_SETUP_TIMEOUT_SECONDS")? {
        config.setup_timeout_seconds = secs;
    }

    if let Some(name) = var("AGENT_NAME") {
        config.agent_name = name;
    }
    if let Some(language) = var("AGENT_LANGUAGE") {
        config.language = language;
    }

    if let Some(threshold) = parse_var("BARGE_IN_THRESHOLD")? {
        config.barge_in_threshold = threshold;
    }
    if let Some(threshold) = parse_var("ACTIVITY_THRESHOLD")? {
        config.activity_threshold = threshold;
    }
    if let Some(secs) = parse_var("SILENCE_TIMEOUT_SECONDS")? {
        config.silence_timeout_seconds = secs;
    }
    if let Some(ms) = parse_var("WATCHDOG_INTERVAL_MS")? {
        config.watchdog_interval_ms = ms;
    }
    if let Some(ms) = parse_var("CLOSE_GRACE_MS")? {
        config.close_grace_ms = ms;
    }

    if let Some(size) = parse_var("CAPTURE_BUFFER_SIZE")? {
        config.capture_buffer_size = size;
    }
    if let Some(rate) = parse_var("OUTPUT_SAMPLE_RATE")? {
        config.output_sample_rate = rate;
    }

    config.webhook_url = var("WEBHOOK_URL");
    if let Some(secs) = parse_var("WEBHOOK_TIMEOUT_SECONDS")? {
        config.webhook_timeout_seconds = secs;
    }

    config.catalog_path = var("CATALOG_PATH").map(PathBuf::from);
    if let Some(path) = var("CALL_LOG_PATH") {
        config.call_log_path = PathBuf::from(path);
    }
    if let Some(path) = var("ORDER_PATH") {
        config.order_path = PathBuf::from(path);
    }

    Ok(config)
}
