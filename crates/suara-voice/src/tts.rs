use crate::config::TtsConfig;
use crate::error::VoiceError;
use crate::invoker::{Artifact, Invocation, ProcessInvoker};
use crate::phoneme::PhonemeNormalizer;
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::time::Duration;
use suara_types::{AudioContainer, AudioFormat, ReplyText, SynthesizedAudio};
use tracing::{info, warn};

/// Service for generating speech from reply text with the Coqui `tts` CLI.
#[derive(Debug, Clone)]
pub struct TtsService {
    binary_path: PathBuf,
    model_path: PathBuf,
    config_path: PathBuf,
    speaker: String,
    normalizer: PhonemeNormalizer,
    invoker: ProcessInvoker,
    max_text_bytes: usize,
}

impl TtsService {
    pub fn new(config: &TtsConfig, normalizer: PhonemeNormalizer) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
            model_path: config.model_path.clone(),
            config_path: config.config_path.clone(),
            speaker: config.speaker.clone(),
            normalizer,
            invoker: ProcessInvoker::new(config.timeout()),
            max_text_bytes: config.max_text_bytes,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.invoker = ProcessInvoker::new(timeout);
        self
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    /// Synthesizes `reply` into a WAV file inside `workspace` and returns
    /// its contents.
    ///
    /// The model and config files are checked before any text processing.
    /// The speaker name is passed through as configured; the engine rejects
    /// unknown speakers itself.
    pub async fn synthesize(
        &self,
        reply: &ReplyText,
        workspace: &Workspace,
    ) -> Result<SynthesizedAudio, VoiceError> {
        if !self.model_path.exists() {
            warn!(path = ?self.model_path, "TTS model file not found");
            return Err(VoiceError::ModelMissing {
                tool: "tts".to_string(),
                path: self.model_path.clone(),
            });
        }
        if !self.config_path.exists() {
            warn!(path = ?self.config_path, "TTS configuration file not found");
            return Err(VoiceError::ConfigMissing {
                tool: "tts".to_string(),
                path: self.config_path.clone(),
            });
        }

        if reply.as_str().len() > self.max_text_bytes {
            return Err(VoiceError::Validation(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                reply.as_str().len(),
                self.max_text_bytes
            )));
        }

        let phonemes = self.normalizer.normalize(reply.as_str()).await?;
        let output_path = workspace.unique_file("tts", AudioContainer::Wav.extension());

        let invocation = Invocation::new("tts", &self.binary_path)
            .require(Artifact::Model, &self.model_path)
            .require(Artifact::Config, &self.config_path)
            .arg("--text")
            .arg(phonemes.as_str())
            .arg("--model_path")
            .arg(&self.model_path)
            .arg("--config_path")
            .arg(&self.config_path)
            .arg("--speaker_idx")
            .arg(&self.speaker)
            .arg("--out_path")
            .arg(&output_path);

        self.invoker.invoke(&invocation).await?;

        let bytes = match tokio::fs::read(&output_path).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return Err(VoiceError::SynthesisOutputMissing(output_path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VoiceError::SynthesisOutputMissing(output_path));
            }
            Err(e) => return Err(VoiceError::Workspace(e)),
        };

        let format = AudioFormat::from_wav_bytes(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, "synthesized audio has no readable WAV header");
            AudioFormat::of_container(AudioContainer::Wav)
        });
        info!(
            bytes = bytes.len(),
            sample_rate = ?format.sample_rate,
            duration_ms = ?format.duration_ms,
            "synthesis finished"
        );

        Ok(SynthesizedAudio { bytes, format })
    }
}
