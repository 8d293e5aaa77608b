use std::path::PathBuf;
use std::time::Duration;
use suara_types::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{tool} executable not found: {path:?}")]
    ToolMissing { tool: String, path: PathBuf },

    #[error("{tool} model not found: {path:?}")]
    ModelMissing { tool: String, path: PathBuf },

    #[error("{tool} configuration not found: {path:?}")]
    ConfigMissing { tool: String, path: PathBuf },

    #[error("{tool} failed with exit code {}: {stderr}", describe_exit(.exit_code))]
    ToolFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {} seconds", .timeout.as_secs_f32())]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("transcription file not found: {0:?}")]
    TranscriptionOutputMissing(PathBuf),

    #[error("synthesized audio not found: {0:?}")]
    SynthesisOutputMissing(PathBuf),

    #[error("phoneme conversion failed: {0}")]
    PhonemeConversion(String),

    #[error("phoneme text is empty after filtering")]
    EmptyPhonemes,

    #[error("reply engine error: {0}")]
    Upstream(String),

    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VoiceError {
    /// Classifies this error for the pipeline boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::ToolMissing { .. } | Self::ModelMissing { .. } => ErrorKind::ExternalToolMissing,
            Self::ConfigMissing { .. } | Self::Config(_) => ErrorKind::ConfigMissing,
            Self::ToolFailure { .. } => ErrorKind::ExternalToolFailure,
            Self::ToolTimeout { .. } => ErrorKind::ExternalToolTimeout,
            Self::TranscriptionOutputMissing(_) => ErrorKind::TranscriptionOutputMissing,
            Self::SynthesisOutputMissing(_) => ErrorKind::SynthesisOutputMissing,
            Self::PhonemeConversion(_) => ErrorKind::PhonemeConversionError,
            Self::EmptyPhonemes => ErrorKind::EmptyPhonemeError,
            Self::Upstream(_) => ErrorKind::UpstreamError,
            Self::Workspace(_) => ErrorKind::WorkspaceError,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}
