//! Configuration module for the storefront voice assistant
//!
//! Configuration comes from .env files, YAML files and environment variables.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use storefront_voice::config::AssistantConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = AssistantConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = AssistantConfig::from_file(&PathBuf::from("config.yaml"))?;
//! println!("Connecting to {}", config.realtime_endpoint);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::audio::input::DEFAULT_CAPTURE_BUFFER_SIZE;
use crate::core::audio::codec::SERVER_SAMPLE_RATE;
use crate::core::prompt::DEFAULT_AGENT_NAME;
use crate::core::realtime::gemini::{GeminiLiveModel, GeminiVoice, SETUP_TIMEOUT_SECS};
use crate::core::realtime::{GEMINI_LIVE_URL, RealtimeConfig};
use crate::core::session::{DEFAULT_ACTIVITY_THRESHOLD, SessionConfig};
use crate::core::tools::dispatcher::DEFAULT_LANGUAGE;
use crate::core::tools::{Catalog, CatalogError, WebhookClient, tool_declarations};
use crate::core::vad::DEFAULT_BARGE_IN_THRESHOLD;

/// Assistant configuration
///
/// Everything needed to run a storefront call:
/// - Realtime transport (endpoint or relay, credentials, model, voice)
/// - Agent persona
/// - Session tuning (barge-in, silence watchdog, close grace)
/// - Audio device settings
/// - Report webhook
/// - Catalog and record file locations
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    // Realtime transport
    /// Gemini Live URL or a relay that holds the key
    pub realtime_endpoint: String,
    pub api_key: Option<String>,
    pub realtime_model: String,
    pub voice: String,
    pub setup_timeout_seconds: u64,

    // Agent persona
    pub agent_name: String,
    /// Language recorded on orders
    pub language: String,

    // Session tuning
    /// RMS above which user input interrupts playback
    /// Default: 0.1
    pub barge_in_threshold: f32,
    /// RMS above which user input counts as activity
    /// Default: 0.01
    pub activity_threshold: f32,
    /// Default: 45
    pub silence_timeout_seconds: u64,
    /// Default: 1000
    pub watchdog_interval_ms: u64,
    /// Delay between `close_call` and disconnect
    /// Default: 1000
    pub close_grace_ms: u64,

    // Audio
    pub capture_buffer_size: usize,
    /// Playback device rate
    /// Default: 24000
    pub output_sample_rate: u32,

    // Webhook
    pub webhook_url: Option<String>,
    pub webhook_timeout_seconds: u64,

    // Storage
    /// If None, the embedded catalog is used
    pub catalog_path: Option<PathBuf>,
    pub call_log_path: PathBuf,
    pub order_path: PathBuf,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            realtime_endpoint: GEMINI_LIVE_URL.to_string(),
            api_key: None,
            realtime_model: GeminiLiveModel::default().as_str().to_string(),
            voice: GeminiVoice::default().as_str().to_string(),
            setup_timeout_seconds: SETUP_TIMEOUT_SECS,
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            barge_in_threshold: DEFAULT_BARGE_IN_THRESHOLD,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            silence_timeout_seconds: 45,
            watchdog_interval_ms: 1000,
            close_grace_ms: 1000,
            capture_buffer_size: DEFAULT_CAPTURE_BUFFER_SIZE,
            output_sample_rate: SERVER_SAMPLE_RATE,
            webhook_url: None,
            webhook_timeout_seconds: 5,
            catalog_path: None,
            call_log_path: PathBuf::from("call_logs.jsonl"),
            order_path: PathBuf::from("orders.jsonl"),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // Note: .env file is loaded in main.rs at application startup
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_realtime(&self.realtime_endpoint, &self.api_key)?;
        validation::validate_thresholds(self.barge_in_threshold, self.activity_threshold)?;
        validation::validate_durations(
            self.silence_timeout_seconds,
            self.watchdog_interval_ms,
            self.webhook_timeout_seconds,
        )?;
        validation::validate_webhook(&self.webhook_url)?;
        if self.capture_buffer_size == 0 {
            return Err("capture_buffer_size must be greater than zero".into());
        }
        if self.output_sample_rate == 0 {
            return Err("output_sample_rate must be greater than zero".into());
        }
        Ok(())
    }

    /// Whether the transport points at a relay rather than Gemini directly.
    pub fn uses_relay(&self) -> bool {
        self.realtime_endpoint != GEMINI_LIVE_URL
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            barge_in_threshold: self.barge_in_threshold,
            activity_threshold: self.activity_threshold,
            silence_timeout: Duration::from_secs(self.silence_timeout_seconds),
            watchdog_interval: Duration::from_millis(self.watchdog_interval_ms),
            close_grace: Duration::from_millis(self.close_grace_ms),
            language: self.language.clone(),
            ..SessionConfig::default()
        }
    }

    /// Transport parameters with the given system instruction and every
    /// dispatcher tool declared.
    pub fn realtime_config(&self, instructions: String) -> RealtimeConfig {
        RealtimeConfig {
            endpoint: self.realtime_endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.realtime_model.clone(),
            voice: Some(self.voice.clone()),
            instructions: Some(instructions),
            tools: Some(tool_declarations()),
            input_transcription: true,
            output_transcription: true,
        }
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_seconds)
    }

    /// Webhook client, if a URL is configured.
    pub fn webhook_client(&self) -> Option<WebhookClient> {
        self.webhook_url.as_ref().map(|url| {
            WebhookClient::new(url.clone())
                .with_timeout(Duration::from_secs(self.webhook_timeout_seconds))
        })
    }

    /// The configured catalog file, or the embedded catalog.
    pub fn load_catalog(&self) -> Result<Arc<Catalog>, CatalogError> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::embedded()?,
        };
        Ok(Arc::new(catalog))
    }
}
