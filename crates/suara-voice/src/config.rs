//! Engine configuration for each pipeline stage.
//!
//! Paths are relative to the server's working directory unless absolute.
//! Nothing here is checked at load time; each stage verifies its own
//! artifacts when a request reaches it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

fn default_stt_binary() -> PathBuf {
    PathBuf::from("whisper.cpp/build/bin/whisper-cli")
}

fn default_stt_model() -> PathBuf {
    PathBuf::from("whisper.cpp/models/ggml-large-v3-turbo.bin")
}

fn default_stt_timeout_secs() -> u64 {
    120
}

fn default_stt_max_input_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_tts_binary() -> PathBuf {
    PathBuf::from("tts")
}

fn default_tts_model() -> PathBuf {
    PathBuf::from("coqui_utils/checkpoint_1260000-inference.pth")
}

fn default_tts_config() -> PathBuf {
    PathBuf::from("coqui_utils/config.json")
}

fn default_tts_speaker() -> String {
    "wibowo".to_string()
}

fn default_tts_timeout_secs() -> u64 {
    60
}

fn default_tts_max_text_bytes() -> usize {
    64 * 1024
}

fn default_g2p_binary() -> PathBuf {
    PathBuf::from("g2p-id")
}

fn default_g2p_timeout_secs() -> u64 {
    10
}

fn default_reply_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_reply_model() -> String {
    "llama3.1".to_string()
}

fn default_reply_system_prompt() -> String {
    "Kamu adalah asisten suara. Jawab dengan singkat dalam bahasa Indonesia.".to_string()
}

fn default_reply_timeout_secs() -> u64 {
    60
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir()
}

/// Speech-to-text engine (whisper.cpp command-line convention).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default = "default_stt_binary")]
    pub binary_path: PathBuf,
    #[serde(default = "default_stt_model")]
    pub model_path: PathBuf,
    #[serde(default = "default_stt_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on accepted audio payloads.
    #[serde(default = "default_stt_max_input_bytes")]
    pub max_input_bytes: usize,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            binary_path: default_stt_binary(),
            model_path: default_stt_model(),
            timeout_secs: default_stt_timeout_secs(),
            max_input_bytes: default_stt_max_input_bytes(),
        }
    }
}

impl SttConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text-to-speech engine (Coqui `tts` command-line convention).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_binary")]
    pub binary_path: PathBuf,
    #[serde(default = "default_tts_model")]
    pub model_path: PathBuf,
    #[serde(default = "default_tts_config")]
    pub config_path: PathBuf,
    /// Speaker name passed to `--speaker_idx`. The engine validates it.
    #[serde(default = "default_tts_speaker")]
    pub speaker: String,
    #[serde(default = "default_tts_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_tts_max_text_bytes")]
    pub max_text_bytes: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            binary_path: default_tts_binary(),
            model_path: default_tts_model(),
            config_path: default_tts_config(),
            speaker: default_tts_speaker(),
            timeout_secs: default_tts_timeout_secs(),
            max_text_bytes: default_tts_max_text_bytes(),
        }
    }
}

impl TtsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Grapheme-to-phoneme collaborator used before synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhonemizerConfig {
    /// An external program that takes the text as its last argument and
    /// prints phonemes on stdout.
    Command {
        #[serde(default = "default_g2p_binary")]
        binary_path: PathBuf,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_g2p_timeout_secs")]
        timeout_secs: u64,
    },
    /// Hands the reply text to the synthesis engine unchanged, apart from
    /// the ASCII filter.
    Passthrough,
}

impl Default for PhonemizerConfig {
    fn default() -> Self {
        Self::Command {
            binary_path: default_g2p_binary(),
            args: Vec::new(),
            timeout_secs: default_g2p_timeout_secs(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint used to generate replies.
#[derive(Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_reply_base_url")]
    pub base_url: String,
    #[serde(default = "default_reply_model")]
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_reply_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_reply_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            base_url: default_reply_base_url(),
            model: default_reply_model(),
            api_key: None,
            system_prompt: default_reply_system_prompt(),
            timeout_secs: default_reply_timeout_secs(),
            max_tokens: None,
        }
    }
}

impl fmt::Debug for ReplyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("system_prompt", &self.system_prompt)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Location of per-request scratch directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}
