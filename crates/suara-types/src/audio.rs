//! Audio payloads entering and leaving the pipeline.

use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Audio container formats accepted at ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioContainer {
    #[default]
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioContainer {
    /// Maps a declared MIME type to a container.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/flac" | "audio/x-flac" => Some(Self::Flac),
            "audio/ogg" | "application/ogg" => Some(Self::Ogg),
            _ => None,
        }
    }

    /// Maps a file name extension to a container.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "ogg" | "oga" => Some(Self::Ogg),
            _ => None,
        }
    }

    /// Detects the container from the first bytes of a payload.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            Some(Self::Wav)
        } else if data.len() >= 4 && &data[..4] == b"fLaC" {
            Some(Self::Flac)
        } else if data.len() >= 4 && &data[..4] == b"OggS" {
            Some(Self::Ogg)
        } else if (data.len() >= 3 && &data[..3] == b"ID3")
            || (data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xE0) == 0xE0)
        {
            Some(Self::Mp3)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
        }
    }
}

/// Declared or probed format of an audio payload.
///
/// Stream parameters are only known for containers whose header was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioFormat {
    pub container: AudioContainer,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub bits_per_sample: Option<u16>,
    /// Duration in milliseconds, when the header allows computing it.
    pub duration_ms: Option<u64>,
}

impl AudioFormat {
    /// A format with only the container known.
    pub fn of_container(container: AudioContainer) -> Self {
        Self {
            container,
            ..Self::default()
        }
    }

    /// Parses a RIFF/WAVE header.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, AudioFormatError> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| {
            AudioFormatError::Malformed {
                container: AudioContainer::Wav,
                reason: e.to_string(),
            }
        })?;
        let spec = reader.spec();
        let duration_ms = if spec.sample_rate > 0 {
            Some(u64::from(reader.duration()) * 1000 / u64::from(spec.sample_rate))
        } else {
            None
        };

        Ok(Self {
            container: AudioContainer::Wav,
            sample_rate: Some(spec.sample_rate),
            channels: Some(spec.channels),
            bits_per_sample: Some(spec.bits_per_sample),
            duration_ms,
        })
    }
}

/// Errors raised while validating an inbound payload.
#[derive(Debug, Error)]
pub enum AudioFormatError {
    #[error("audio payload is empty")]
    Empty,

    #[error("malformed {container:?} payload: {reason}")]
    Malformed {
        container: AudioContainer,
        reason: String,
    },
}

/// Encoded audio bytes received at ingress, plus their declared container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
    container: AudioContainer,
}

impl AudioBuffer {
    pub fn new(bytes: impl Into<Vec<u8>>, container: AudioContainer) -> Self {
        Self {
            bytes: bytes.into(),
            container,
        }
    }

    /// Builds a buffer from an upload, preferring magic-byte detection over
    /// the declared MIME type, then the file name, then WAV.
    pub fn from_upload(
        bytes: impl Into<Vec<u8>>,
        content_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Self {
        let bytes = bytes.into();
        let container = AudioContainer::detect(&bytes)
            .or_else(|| content_type.and_then(AudioContainer::from_content_type))
            .or_else(|| file_name.and_then(AudioContainer::from_file_name))
            .unwrap_or_default();
        Self { bytes, container }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn container(&self) -> AudioContainer {
        self.container
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Validates the payload and returns its format.
    ///
    /// Empty payloads are always rejected. WAV payloads must carry a
    /// parseable header; other containers are passed through to the
    /// recognition engine with unknown stream parameters.
    pub fn probe(&self) -> Result<AudioFormat, AudioFormatError> {
        if self.bytes.is_empty() {
            return Err(AudioFormatError::Empty);
        }

        match self.container {
            AudioContainer::Wav => AudioFormat::from_wav_bytes(&self.bytes),
            other => Ok(AudioFormat::of_container(other)),
        }
    }
}

/// Audio produced by the synthesis engine, held in memory so the scratch
/// directory that backed it can be released before the response is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl SynthesizedAudio {
    pub fn content_type(&self) -> &'static str {
        self.format.container.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
