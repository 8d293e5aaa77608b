//! Phoneme conversion and filtering ahead of synthesis.
//!
//! Reply text goes through a grapheme-to-phoneme [`Phonemizer`], then
//! [`filter_phonemes`] maps the result onto the ASCII symbol set the
//! synthesis model was trained on.

use crate::config::PhonemizerConfig;
use crate::error::VoiceError;
use crate::invoker::{resolve_executable, Invocation, ProcessInvoker};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use suara_types::PhonemeText;
use tracing::{debug, info};

/// Primary and secondary stress marks.
pub const STRESS_MARKS: [char; 2] = ['\u{02C8}', '\u{02CC}'];

/// IPA symbols and their ASCII approximations. Source symbols are disjoint.
pub const PHONEME_SUBSTITUTIONS: [(char, &str); 9] = [
    ('ɔ', "o"),
    ('ə', "e"),
    ('ɛ', "e"),
    ('ɪ', "i"),
    ('ʃ', "sh"),
    ('ʧ', "ch"),
    ('ʤ', "j"),
    ('ʔ', ""),
    ('_', " "),
];

/// Grapheme-to-phoneme collaborator.
///
/// Built once at startup and shared by every request.
#[async_trait]
pub trait Phonemizer: Send + Sync + std::fmt::Debug {
    async fn phonemize(&self, text: &str) -> Result<String, VoiceError>;
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPhonemizer;

#[async_trait]
impl Phonemizer for PassthroughPhonemizer {
    async fn phonemize(&self, text: &str) -> Result<String, VoiceError> {
        Ok(text.to_string())
    }
}

/// Runs an external G2P program with the text as its last argument and
/// reads phonemes from its stdout.
#[derive(Debug, Clone)]
pub struct CommandPhonemizer {
    executable: PathBuf,
    args: Vec<String>,
    invoker: ProcessInvoker,
}

impl CommandPhonemizer {
    /// Resolves the G2P executable.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::ToolMissing`] when the executable cannot be
    /// found. The server treats this as fatal at startup.
    pub fn new(
        binary_path: impl Into<PathBuf>,
        args: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        let binary_path = binary_path.into();
        let executable =
            resolve_executable(&binary_path).ok_or_else(|| VoiceError::ToolMissing {
                tool: "g2p".to_string(),
                path: binary_path.clone(),
            })?;
        info!(executable = ?executable, "initialized G2P command");
        Ok(Self {
            executable,
            args,
            invoker: ProcessInvoker::new(timeout),
        })
    }
}

#[async_trait]
impl Phonemizer for CommandPhonemizer {
    async fn phonemize(&self, text: &str) -> Result<String, VoiceError> {
        let invocation = Invocation::new("g2p", &self.executable)
            .args(&self.args)
            .arg(text);
        let output = self
            .invoker
            .invoke(&invocation)
            .await
            .map_err(|e| VoiceError::PhonemeConversion(e.to_string()))?;
        Ok(output.stdout)
    }
}

/// Builds the configured phonemizer.
pub fn build_phonemizer(config: &PhonemizerConfig) -> Result<Arc<dyn Phonemizer>, VoiceError> {
    match config {
        PhonemizerConfig::Command {
            binary_path,
            args,
            timeout_secs,
        } => Ok(Arc::new(CommandPhonemizer::new(
            binary_path.clone(),
            args.clone(),
            Duration::from_secs(*timeout_secs),
        )?)),
        PhonemizerConfig::Passthrough => Ok(Arc::new(PassthroughPhonemizer)),
    }
}

/// Maps raw G2P output onto the synthesis-safe ASCII set.
///
/// Stress marks are stripped and table symbols substituted, then whitespace
/// runs collapse to one space and the ends are trimmed, then any remaining
/// non-ASCII code point is dropped.
///
/// # Errors
///
/// Returns [`VoiceError::EmptyPhonemes`] when nothing is left.
pub fn filter_phonemes(raw: &str) -> Result<PhonemeText, VoiceError> {
    let mut substituted = String::with_capacity(raw.len());
    for ch in raw.chars().filter(|ch| !STRESS_MARKS.contains(ch)) {
        match PHONEME_SUBSTITUTIONS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => substituted.push_str(to),
            None => substituted.push(ch),
        }
    }

    let collapsed = substituted.split_whitespace().collect::<Vec<_>>().join(" ");
    let ascii: String = collapsed.chars().filter(char::is_ascii).collect();

    PhonemeText::from_filtered(ascii).ok_or(VoiceError::EmptyPhonemes)
}

/// Reply text to phoneme text: G2P conversion followed by filtering.
#[derive(Debug, Clone)]
pub struct PhonemeNormalizer {
    phonemizer: Arc<dyn Phonemizer>,
}

impl PhonemeNormalizer {
    pub fn new(phonemizer: Arc<dyn Phonemizer>) -> Self {
        Self { phonemizer }
    }

    pub async fn normalize(&self, text: &str) -> Result<PhonemeText, VoiceError> {
        let raw = self.phonemizer.phonemize(text).await?;
        debug!(raw = %raw.trim_end(), "phonemes before filtering");
        let filtered = filter_phonemes(&raw)?;
        debug!(phonemes = %filtered, "phonemes after filtering");
        Ok(filtered)
    }
}
