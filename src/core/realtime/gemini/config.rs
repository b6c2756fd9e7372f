//! Gemini Live API configuration types.
//!
//! Model selection (with the setup fallback sequence), prebuilt voices and
//! the default endpoint.

use serde::{Deserialize, Serialize};

/// Gemini Live bidirectional streaming endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Sample rate of audio produced by Gemini Live.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// How long to wait for `setupComplete` before giving up on a model.
pub const SETUP_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// Models
// =============================================================================

/// Native-audio models, in the order they are tried during setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiLiveModel {
    /// Dated native audio preview (primary)
    #[default]
    #[serde(rename = "gemini-2.5-flash-native-audio-preview-09-2025")]
    NativeAudioPreview092025,
    /// Undated native audio preview (fallback)
    #[serde(rename = "gemini-2.5-flash-native-audio-preview")]
    NativeAudioPreview,
    /// Experimental flash model (safe)
    #[serde(rename = "gemini-2.0-flash-exp")]
    Flash20Exp,
}

impl GeminiLiveModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeAudioPreview092025 => "gemini-2.5-flash-native-audio-preview-09-2025",
            Self::NativeAudioPreview => "gemini-2.5-flash-native-audio-preview",
            Self::Flash20Exp => "gemini-2.0-flash-exp",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().trim_start_matches("models/").to_lowercase().as_str() {
            "gemini-2.5-flash-native-audio-preview-09-2025" => Self::NativeAudioPreview092025,
            "gemini-2.5-flash-native-audio-preview" => Self::NativeAudioPreview,
            "gemini-2.0-flash-exp" => Self::Flash20Exp,
            _ => Self::default(),
        }
    }

    /// Primary → fallback → safe.
    pub fn fallback_sequence() -> &'static [GeminiLiveModel] {
        &[
            Self::NativeAudioPreview092025,
            Self::NativeAudioPreview,
            Self::Flash20Exp,
        ]
    }
}

impl std::fmt::Display for GeminiLiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Models to try for a configured model name.
///
/// The configured model goes first; the rest of the known sequence follows,
/// without duplicates. Unknown names are tried as-is before the sequence.
pub fn model_attempts(configured: &str) -> Vec<String> {
    let configured = configured.trim();
    let mut attempts: Vec<String> = Vec::new();
    if !configured.is_empty() {
        attempts.push(configured.trim_start_matches("models/").to_string());
    }
    for model in GeminiLiveModel::fallback_sequence() {
        let name = model.as_str().to_string();
        if !attempts.contains(&name) {
            attempts.push(name);
        }
    }
    attempts
}

// =============================================================================
// Voices
// =============================================================================

/// Prebuilt voices for Gemini Live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiVoice {
    #[default]
    Zephyr,
    Puck,
    Charon,
    Kore,
    Fenrir,
    Aoede,
    Leda,
    Orus,
}

impl GeminiVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zephyr => "Zephyr",
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Kore => "Kore",
            Self::Fenrir => "Fenrir",
            Self::Aoede => "Aoede",
            Self::Leda => "Leda",
            Self::Orus => "Orus",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "zephyr" => Self::Zephyr,
            "puck" => Self::Puck,
            "charon" => Self::Charon,
            "kore" => Self::Kore,
            "fenrir" => Self::Fenrir,
            "aoede" => Self::Aoede,
            "leda" => Self::Leda,
            "orus" => Self::Orus,
            _ => Self::default(),
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [GeminiVoice] {
        &[
            Self::Zephyr,
            Self::Puck,
            Self::Charon,
            Self::Kore,
            Self::Fenrir,
            Self::Aoede,
            Self::Leda,
            Self::Orus,
        ]
    }
}

impl std::fmt::Display for GeminiVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the connection URL, appending the API key when one is configured.
pub fn connection_url(endpoint: &str, api_key: Option<&str>) -> Result<url::Url, url::ParseError> {
    let mut url = url::Url::parse(endpoint)?;
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        url.query_pairs_mut().append_pair("key", key);
    }
    Ok(url)
}
