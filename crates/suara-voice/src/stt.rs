use crate::config::SttConfig;
use crate::error::VoiceError;
use crate::invoker::{Artifact, Invocation, ProcessInvoker};
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::time::Duration;
use suara_types::{AudioBuffer, Transcript};
use tracing::{debug, info};
use uuid::Uuid;

/// Maximum audio input size for STT (10 MiB). Prevents OOM from oversized payloads.
const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Timeout for STT process execution.
const STT_TIMEOUT: Duration = Duration::from_secs(120);

/// Output file stem handed to the engine's `-of` flag.
const TRANSCRIPT_STEM: &str = "transcription";

/// Speech-to-text through the whisper.cpp command-line tool.
#[derive(Debug, Clone)]
pub struct SttService {
    model_path: PathBuf,
    binary_path: PathBuf,
    invoker: ProcessInvoker,
    max_input_bytes: usize,
}

impl SttService {
    pub fn new(model_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            binary_path: binary_path.into(),
            invoker: ProcessInvoker::new(STT_TIMEOUT),
            max_input_bytes: MAX_STT_INPUT_BYTES,
        }
    }

    pub fn from_config(config: &SttConfig) -> Self {
        Self::new(&config.model_path, &config.binary_path)
            .with_timeout(config.timeout())
            .with_max_input_bytes(config.max_input_bytes)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.invoker = ProcessInvoker::new(timeout);
        self
    }

    pub fn with_max_input_bytes(mut self, max_input_bytes: usize) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    /// Transcribes `audio`, using `workspace` for the engine's input and
    /// output files.
    ///
    /// The engine is run as
    /// `<binary> -m <model> -f <input> -otxt -of <workspace>/transcription`
    /// and the text it writes to `transcription.txt` is returned unmodified.
    /// An empty transcript (silence) is a success.
    pub async fn transcribe(
        &self,
        audio: &AudioBuffer,
        workspace: &Workspace,
    ) -> Result<Transcript, VoiceError> {
        if audio.len() > self.max_input_bytes {
            return Err(VoiceError::Validation(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                self.max_input_bytes
            )));
        }

        let input_path = workspace.file(&format!(
            "{}.{}",
            Uuid::new_v4(),
            audio.container().extension()
        ));
        let output_stem = workspace.file(TRANSCRIPT_STEM);
        let output_path = output_stem.with_extension("txt");

        tokio::fs::write(&input_path, audio.bytes()).await?;
        debug!(path = ?input_path, bytes = audio.len(), "wrote audio to workspace");

        let invocation = Invocation::new("whisper", &self.binary_path)
            .require(Artifact::Model, &self.model_path)
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(&input_path)
            .arg("-otxt")
            .arg("-of")
            .arg(&output_stem);

        self.invoker.invoke(&invocation).await?;

        let bytes = match tokio::fs::read(&output_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VoiceError::TranscriptionOutputMissing(output_path));
            }
            Err(e) => return Err(VoiceError::Workspace(e)),
        };

        let text = String::from_utf8_lossy(&bytes).into_owned();
        info!(chars = text.chars().count(), "transcription finished");
        Ok(Transcript(text))
    }
}
