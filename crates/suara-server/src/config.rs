//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use suara_voice::{PhonemizerConfig, ReplyConfig, SttConfig, TtsConfig, WorkspaceConfig};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Speech-to-text engine.
    #[serde(default)]
    pub stt: SttConfig,

    /// Text-to-speech engine.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Grapheme-to-phoneme collaborator.
    #[serde(default)]
    pub phonemizer: PhonemizerConfig,

    /// Reply generation endpoint.
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Per-request scratch directories.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "suara_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_env_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides looked up through `var`.
///
/// - `SUARA_HOST` / `SUARA_PORT` override `server.host` / `server.port`
/// - `SUARA_LOG_LEVEL` / `SUARA_LOG_JSON` override `logging.level` / `logging.json`
/// - `SUARA_WHISPER_BINARY` / `SUARA_WHISPER_MODEL` override the `stt` paths
/// - `SUARA_TTS_BINARY` / `SUARA_TTS_MODEL` / `SUARA_TTS_CONFIG` /
///   `SUARA_TTS_SPEAKER` override the `tts` section
/// - `SUARA_G2P_BINARY` switches `phonemizer` to a command with that binary
/// - `SUARA_REPLY_URL` / `SUARA_REPLY_MODEL` / `SUARA_REPLY_API_KEY`
///   override the `reply` section
/// - `SUARA_WORKSPACE_DIR` overrides `workspace.root`
///
/// Unparseable host or port values are ignored.
pub fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("SUARA_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("SUARA_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = var("SUARA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("SUARA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    if let Some(path) = var("SUARA_WHISPER_BINARY") {
        config.stt.binary_path = PathBuf::from(path);
    }
    if let Some(path) = var("SUARA_WHISPER_MODEL") {
        config.stt.model_path = PathBuf::from(path);
    }

    if let Some(path) = var("SUARA_TTS_BINARY") {
        config.tts.binary_path = PathBuf::from(path);
    }
    if let Some(path) = var("SUARA_TTS_MODEL") {
        config.tts.model_path = PathBuf::from(path);
    }
    if let Some(path) = var("SUARA_TTS_CONFIG") {
        config.tts.config_path = PathBuf::from(path);
    }
    if let Some(speaker) = var("SUARA_TTS_SPEAKER") {
        config.tts.speaker = speaker;
    }

    if let Some(path) = var("SUARA_G2P_BINARY") {
        match &mut config.phonemizer {
            PhonemizerConfig::Command { binary_path, .. } => *binary_path = PathBuf::from(path),
            PhonemizerConfig::Passthrough => {
                config.phonemizer = PhonemizerConfig::Command {
                    binary_path: PathBuf::from(path),
                    args: Vec::new(),
                    timeout_secs: 10,
                };
            }
        }
    }

    if let Some(url) = var("SUARA_REPLY_URL") {
        config.reply.base_url = url;
    }
    if let Some(model) = var("SUARA_REPLY_MODEL") {
        config.reply.model = model;
    }
    if let Some(key) = var("SUARA_REPLY_API_KEY") {
        config.reply.api_key = Some(key);
    }

    if let Some(dir) = var("SUARA_WORKSPACE_DIR") {
        config.workspace.root = PathBuf::from(dir);
    }
}
