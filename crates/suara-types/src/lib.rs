//! Shared value types for the suara voice pipeline.
//!
//! Every crate in the workspace exchanges data through the types defined
//! here: the inbound [`AudioBuffer`], the intermediate text values produced
//! by each stage, the outbound [`SynthesizedAudio`], and the [`ErrorKind`]
//! classification that crosses the HTTP boundary.

pub mod audio;

pub use audio::{AudioBuffer, AudioContainer, AudioFormat, AudioFormatError, SynthesizedAudio};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pipeline stage, as reported in failures and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Request validation before any engine runs.
    Ingress,
    /// Speech-to-text.
    Transcribing,
    /// Reply generation.
    Generating,
    /// Text-to-speech.
    Synthesizing,
}

impl PipelineStage {
    /// Returns the lowercase label used in logs and error details.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Transcribing => "transcribing",
            Self::Generating => "generating",
            Self::Synthesizing => "synthesizing",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of every failure the pipeline can report.
///
/// The classification is stable and user-actionable; the accompanying
/// message carries the details (paths, exit codes, stderr).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Empty or malformed input.
    ValidationError,
    /// An engine executable or one of its model files is absent.
    ExternalToolMissing,
    /// An engine configuration file is absent.
    ConfigMissing,
    /// An engine exited with a non-zero status.
    ExternalToolFailure,
    /// An engine exceeded its wall-clock bound and was killed.
    ExternalToolTimeout,
    /// The recognition engine reported success but wrote no transcript.
    TranscriptionOutputMissing,
    /// The synthesis engine reported success but wrote no audio.
    SynthesisOutputMissing,
    /// The grapheme-to-phoneme collaborator failed.
    PhonemeConversionError,
    /// Phoneme text was empty after filtering.
    EmptyPhonemeError,
    /// The reply collaborator failed; passed through unchanged.
    UpstreamError,
    /// The per-request scratch directory could not be created or written.
    WorkspaceError,
}

impl ErrorKind {
    /// Returns the variant name, matching the `Debug` form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "ValidationError",
            Self::ExternalToolMissing => "ExternalToolMissing",
            Self::ConfigMissing => "ConfigMissing",
            Self::ExternalToolFailure => "ExternalToolFailure",
            Self::ExternalToolTimeout => "ExternalToolTimeout",
            Self::TranscriptionOutputMissing => "TranscriptionOutputMissing",
            Self::SynthesisOutputMissing => "SynthesisOutputMissing",
            Self::PhonemeConversionError => "PhonemeConversionError",
            Self::EmptyPhonemeError => "EmptyPhonemeError",
            Self::UpstreamError => "UpstreamError",
            Self::WorkspaceError => "WorkspaceError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text produced by the recognition engine.
///
/// May be empty when the input was silence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript(pub String);

impl Transcript {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Text produced by the reply engine, consumed only by synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyText(pub String);

impl ReplyText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ASCII-only phoneme transliteration handed to the synthesis engine.
///
/// Only the phoneme normalizer constructs values of this type, so a
/// `PhonemeText` is always non-empty and ASCII.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonemeText(String);

impl PhonemeText {
    /// Wraps already-filtered text. Returns `None` when the text is empty or
    /// contains non-ASCII characters.
    pub fn from_filtered(text: String) -> Option<Self> {
        if text.is_empty() || !text.is_ascii() {
            return None;
        }
        Some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhonemeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
