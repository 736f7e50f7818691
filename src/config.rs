use crate::defaults;
use crate::error::{EchoError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub coach: CoachConfig,
    pub speech: SpeechConfig,
    pub voice: VoiceConfig,
    pub dialogue: DialogueConfig,
}

/// Generative-AI collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoachConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Speech output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP-47 tag of the spoken conversation language
    pub language: String,
    pub output_enabled: bool,
    pub synthesizer_command: String,
}

/// Voice capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    pub send_guard_ms: u64,
    /// argv of an external recognizer emitting JSON-lines events on stdout
    pub recognizer_command: Option<Vec<String>>,
}

/// Dialogue orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DialogueConfig {
    pub extra_termination_phrases: Vec<String>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            output_enabled: true,
            synthesizer_command: defaults::DEFAULT_SYNTHESIZER.to_string(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            send_guard_ms: defaults::SEND_GUARD_MS,
            recognizer_command: None,
        }
    }
}

impl VoiceConfig {
    pub fn send_guard(&self) -> Duration {
        Duration::from_millis(self.send_guard_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EchoError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                EchoError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(EchoError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Reject values that would make the dialogue loop misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.coach.timeout_secs == 0 {
            return Err(EchoError::ConfigInvalidValue {
                key: "coach.timeout_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.speech.language.trim().is_empty() {
            return Err(EchoError::ConfigInvalidValue {
                key: "speech.language".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if let Some(argv) = &self.voice.recognizer_command
            && argv.is_empty()
        {
            return Err(EchoError::ConfigInvalidValue {
                key: "voice.recognizer_command".to_string(),
                message: "must name a program".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - ECHOCOACH_API_KEY (then API_KEY, GEMINI_API_KEY) → coach.api_key
    /// - ECHOCOACH_MODEL → coach.model
    /// - ECHOCOACH_LANGUAGE → speech.language
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = ["ECHOCOACH_API_KEY", "API_KEY", "GEMINI_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.is_empty())
        {
            self.coach.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("ECHOCOACH_MODEL")
            && !model.is_empty()
        {
            self.coach.model = model;
        }

        if let Ok(language) = std::env::var("ECHOCOACH_LANGUAGE")
            && !language.is_empty()
        {
            self.speech.language = language;
        }

        self
    }

    /// Copy of the config with the API key masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.coach.api_key.is_some() {
            copy.coach.api_key = Some("********".to_string());
        }
        copy
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/echocoach/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("echocoach")
            .join("config.toml")
    }
}
