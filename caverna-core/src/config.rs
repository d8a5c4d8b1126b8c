//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/caverna/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/caverna/` (~/.config/caverna/)
//! - Data: `$XDG_DATA_HOME/caverna/` (~/.local/share/caverna/)
//! - State/Logs: `$XDG_STATE_HOME/caverna/` (~/.local/state/caverna/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Completion provider configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Speech-synthesis provider configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// On-device narration configuration
    #[serde(default)]
    pub narrator: NarratorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chat-completion provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    /// API endpoint (scheme + host, path is appended)
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    /// Model to use
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Token cap for the generated report
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            model: default_completion_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_completion_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_completion_model() -> String {
    "gpt-4".to_string()
}

fn default_max_tokens() -> u32 {
    800
}

fn default_temperature() -> f64 {
    0.7
}

fn default_completion_timeout() -> u64 {
    60
}

/// Speech-synthesis provider configuration
///
/// The API key here is deployment-owned. Unlike the completion credential it
/// cannot be changed through the analysis client.
#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Enable/disable remote synthesis (fallback narration is used when off)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API endpoint (scheme + host, path is appended)
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// API key (can also use FISH_AUDIO_API_KEY)
    pub api_key: Option<String>,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_speech_speed")]
    pub speed: f64,

    #[serde(default = "default_speech_pitch")]
    pub pitch: f64,

    /// Audio container requested from the provider
    #[serde(default = "default_audio_format")]
    pub format: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_speech_endpoint(),
            api_key: None,
            voice: default_voice(),
            speed: default_speech_speed(),
            pitch: default_speech_pitch(),
            format: default_audio_format(),
            timeout_secs: default_speech_timeout(),
        }
    }
}

impl SpeechConfig {
    /// Resolve the speech credential from config, then environment.
    ///
    /// Empty values count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_api_key(
            self.api_key.as_deref(),
            std::env::var(SPEECH_KEY_ENV_VAR).ok(),
        )
    }
}

/// Environment variable consulted when `speech.api_key` is unset.
pub const SPEECH_KEY_ENV_VAR: &str = "FISH_AUDIO_API_KEY";

fn resolve_api_key(configured: Option<&str>, from_env: Option<String>) -> Option<String> {
    configured
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| from_env.filter(|k| !k.is_empty()))
}

fn default_true() -> bool {
    true
}

fn default_speech_endpoint() -> String {
    "https://api.fish.audio".to_string()
}

fn default_voice() -> String {
    "masculine_wise".to_string()
}

fn default_speech_speed() -> f64 {
    0.9
}

fn default_speech_pitch() -> f64 {
    0.8
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_speech_timeout() -> u64 {
    60
}

/// On-device narration configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NarratorConfig {
    /// Speech rate relative to normal (1.0)
    #[serde(default = "default_narrator_rate")]
    pub rate: f64,

    /// Voice pitch relative to normal (1.0)
    #[serde(default = "default_narrator_pitch")]
    pub pitch: f64,

    /// Command used to play audio files; the file path is appended
    #[serde(default = "default_player")]
    pub player: Vec<String>,

    /// Speech synthesizer command; rate/pitch/text are appended
    #[serde(default = "default_speech_command")]
    pub speech_command: String,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            rate: default_narrator_rate(),
            pitch: default_narrator_pitch(),
            player: default_player(),
            speech_command: default_speech_command(),
        }
    }
}

fn default_narrator_rate() -> f64 {
    0.9
}

fn default_narrator_pitch() -> f64 {
    0.8
}

fn default_player() -> Vec<String> {
    vec![
        "ffplay".to_string(),
        "-nodisp".to_string(),
        "-autoexit".to_string(),
        "-loglevel".to_string(),
        "quiet".to_string(),
    ]
}

fn default_speech_command() -> String {
    "espeak".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.completion.max_tokens == 0 {
            return Err(Error::Config(
                "completion.max_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::Config(
                "completion.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.speech.speed <= 0.0 || self.speech.pitch <= 0.0 {
            return Err(Error::Config(
                "speech.speed and speech.pitch must be positive".to_string(),
            ));
        }
        if self.narrator.rate <= 0.0 || self.narrator.pitch <= 0.0 {
            return Err(Error::Config(
                "narrator.rate and narrator.pitch must be positive".to_string(),
            ));
        }
        if self.narrator.player.is_empty() {
            return Err(Error::Config("narrator.player must name a command".to_string()));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/caverna/config.toml` (~/.config/caverna/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("caverna").join("config.toml")
    }

    /// Returns the data directory path (for the credential store)
    ///
    /// `$XDG_DATA_HOME/caverna/` (~/.local/share/caverna/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("caverna")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/caverna/` (~/.local/state/caverna/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("caverna")
    }

    /// Returns the key/value database path
    ///
    /// `$XDG_DATA_HOME/caverna/caverna.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("caverna.db")
    }
}
