use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// realtime:
///   endpoint: "ws://localhost:8080/api/gemini-relay"
///   api_key: "your-gemini-key"
///   model: "gemini-2.5-flash-native-audio-preview-09-2025"
///   voice: "Zephyr"
///   setup_timeout_seconds: 15
///
/// agent:
///   name: "Ema"
///   language: "mk"
///
/// session:
///   barge_in_threshold: 0.1
///   activity_threshold: 0.01
///   silence_timeout_seconds: 45
///   watchdog_interval_ms: 1000
///   close_grace_ms: 1000
///
/// audio:
///   capture_buffer_size: 4096
///   output_sample_rate: 24000
///
/// webhook:
///   url: "https://hooks.example.com/report"
///   timeout_seconds: 5
///
/// storage:
///   catalog_path: "assets/catalog.yaml"
///   call_log_path: "data/call_logs.jsonl"
///   order_path: "data/orders.jsonl"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub realtime: Option<RealtimeYaml>,
    pub agent: Option<AgentYaml>,
    pub session: Option<SessionYaml>,
    pub audio: Option<AudioYaml>,
    pub webhook: Option<WebhookYaml>,
    pub storage: Option<StorageYaml>,
}

/// Realtime transport settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    /// Provider URL or relay URL
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub setup_timeout_seconds: Option<u64>,
}

/// Agent persona from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AgentYaml {
    pub name: Option<String>,
    pub language: Option<String>,
}

/// Session tuning from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub barge_in_threshold: Option<f32>,
    pub activity_threshold: Option<f32>,
    pub silence_timeout_seconds: Option<u64>,
    pub watchdog_interval_ms: Option<u64>,
    pub close_grace_ms: Option<u64>,
}

/// Audio device settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub capture_buffer_size: Option<usize>,
    pub output_sample_rate: Option<u32>,
}

/// Report webhook from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WebhookYaml {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// File locations from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageYaml {
    pub catalog_path: Option<String>,
    pub call_log_path: Option<String>,
    pub order_path: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
