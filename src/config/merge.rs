use std::path::PathBuf;

use super::AssistantConfig;
use super::env;
use super::yaml::YamlConfig;

/// Environment (over defaults) as the base, YAML values on top.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<AssistantConfig, Box<dyn std::error::Error>> {
    let mut config = env::load()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(realtime) = yaml.realtime {
        if let Some(endpoint) = realtime.endpoint {
            config.realtime_endpoint = endpoint;
        }
        if let Some(api_key) = realtime.api_key {
            config.api_key = Some(api_key);
        }
        if let Some(model) = realtime.model {
            config.realtime_model = model;
        }
        if let Some(voice) = realtime.voice {
            config.voice = voice;
        }
        if let Some(secs) = realtime.setup_timeout_seconds {
            config.setup_timeout_seconds = secs;
        }
    }

    if let Some(agent) = yaml.agent {
        if let Some(name) = agent.name {
            config.agent_name = name;
        }
        if let Some(language) = agent.language {
            config.language = language;
        }
    }

    if let Some(session) = yaml.session {
        if let Some(threshold) = session.barge_in_threshold {
            config.barge_in_threshold = threshold;
        }
        if let Some(threshold) = session.activity_threshold {
            config.activity_threshold = threshold;
        }
        if let Some(secs) = session.silence_timeout_seconds {
            config.silence_timeout_seconds = secs;
        }
        if let Some(ms) = session.watchdog_interval_ms {
            config.watchdog_interval_ms = ms;
        }
        if let Some(ms) = session.close_grace_ms {
            config.close_grace_ms = ms;
        }
    }

    if let Some(audio) = yaml.audio {
        if let Some(size) = audio.capture_buffer_size {
            config.capture_buffer_size = size;
        }
        if let Some(rate) = audio.output_sample_rate {
            config.output_sample_rate = rate;
        }
    }

    if let Some(webhook) = yaml.webhook {
        if let Some(url) = webhook.url {
            config.webhook_url = Some(url);
        }
        if let Some(secs) = webhook.timeout_seconds {
            config.webhook_timeout_seconds = secs;
        }
    }

    if let Some(storage) = yaml.storage {
        if let Some(path) = storage.catalog_path {
            config.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(path) = storage.call_log_path {
            config.call_log_path = PathBuf::from(path);
        }
        if let Some(path) = storage.order_path {
            config.order_path = PathBuf::from(path);
        }
    }

    Ok(config)
}
