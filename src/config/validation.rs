use url::Url;

use crate::core::realtime::GEMINI_LIVE_URL;

/// The endpoint must be a WebSocket URL. The default endpoint also needs a key;
/// a relay holds its own.
pub(super) fn validate_realtime(
    endpoint: &str,
    api_key: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(endpoint).map_err(|e| format!("Invalid realtime endpoint '{endpoint}': {e}"))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(format!(
            "Realtime endpoint must use ws:// or wss://, got '{}'",
            url.scheme()
        )
        .into());
    }
    if endpoint == GEMINI_LIVE_URL && api_key.is_none() {
        return Err("GEMINI_API_KEY is required when connecting to Gemini Live directly".into());
    }
    Ok(())
}

pub(super) fn validate_thresholds(
    barge_in: f32,
    activity: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(barge_in > 0.0 && barge_in <= 1.0) {
        return Err(format!("barge_in_threshold must be in (0, 1], got {barge_in}").into());
    }
    if !(0.0..=barge_in).contains(&activity) {
        return Err(format!(
            "activity_threshold must be between 0 and barge_in_threshold ({barge_in}), got {activity}"
        )
        .into());
    }
    Ok(())
}

pub(super) fn validate_durations(
    silence_timeout_seconds: u64,
    watchdog_interval_ms: u64,
    webhook_timeout_seconds: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if silence_timeout_seconds == 0 {
        return Err("silence_timeout_seconds must be greater than zero".into());
    }
    if watchdog_interval_ms == 0 {
        return Err("watchdog_interval_ms must be greater than zero".into());
    }
    if watchdog_interval_ms > silence_timeout_seconds * 1000 {
        return Err("watchdog_interval_ms must not exceed the silence timeout".into());
    }
    if webhook_timeout_seconds == 0 {
        return Err("webhook_timeout_seconds must be greater than zero".into());
    }
    Ok(())
}

pub(super) fn validate_webhook(url: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = url {
        let parsed = Url::parse(url).map_err(|e| format!("Invalid webhook URL '{url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("Webhook URL must use http or https, got '{}'", parsed.scheme()).into());
        }
    }
    Ok(())
}
