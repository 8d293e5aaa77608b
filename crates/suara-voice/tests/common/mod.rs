//! Shared fixtures: mock engine scripts, WAV payloads and reply engines.

#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Cursor;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use suara_types::{ReplyText, Transcript};
use suara_voice::{
    PassthroughPhonemizer, PhonemeNormalizer, ReplyEngine, SttService, TtsConfig, TtsService,
    VoiceError, VoicePipeline,
};

/// Writes an executable `#!/bin/sh` script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A whisper.cpp stand-in: parses `-f` and `-of`, then runs `action` with
/// `$input` and `$out` bound.
pub fn mock_whisper(dir: &Path, action: &str) -> PathBuf {
    write_script(
        dir,
        "whisper-cli",
        &format!(
            r#"while [ $# -gt 0 ]; do
  case "$1" in
    -f) input="$2"; shift 2 ;;
    -of) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{}"#,
            action
        ),
    )
}

/// A Coqui `tts` stand-in: parses `--text` and `--out_path`, then runs
/// `action` with `$text` and `$out` bound.
pub fn mock_tts(dir: &Path, action: &str) -> PathBuf {
    write_script(
        dir,
        "tts",
        &format!(
            r#"while [ $# -gt 0 ]; do
  case "$1" in
    --text) text="$2"; shift 2 ;;
    --out_path) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{}"#,
            action
        ),
    )
}

/// 16-bit mono PCM silence.
pub fn silent_wav(sample_rate: u32, seconds: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..sample_rate * seconds {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Replies with fixed text and counts how often it was asked.
#[derive(Debug, Default)]
pub struct StaticReply {
    pub text: String,
    pub calls: AtomicUsize,
}

impl StaticReply {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplyEngine for StaticReply {
    async fn generate_reply(&self, _transcript: &Transcript) -> Result<ReplyText, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReplyText::new(self.text.clone()))
    }
}

/// Replies with the transcript itself.
#[derive(Debug, Default)]
pub struct EchoReply;

#[async_trait]
impl ReplyEngine for EchoReply {
    async fn generate_reply(&self, transcript: &Transcript) -> Result<ReplyText, VoiceError> {
        Ok(ReplyText::new(transcript.as_str()))
    }
}

/// Always fails with an upstream error.
#[derive(Debug, Default)]
pub struct FailingReply;

#[async_trait]
impl ReplyEngine for FailingReply {
    async fn generate_reply(&self, _transcript: &Transcript) -> Result<ReplyText, VoiceError> {
        Err(VoiceError::Upstream("model overloaded".to_string()))
    }
}

/// Engine binaries, model files and a workspace root inside one temp dir.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub workspace_root: PathBuf,
    pub stt_model: PathBuf,
    pub tts_model: PathBuf,
    pub tts_config: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let workspace_root = dir.path().join("workspaces");
        std::fs::create_dir_all(&workspace_root).unwrap();
        let stt_model = dir.path().join("ggml-model.bin");
        let tts_model = dir.path().join("checkpoint.pth");
        let tts_config = dir.path().join("config.json");
        std::fs::write(&stt_model, b"ggml").unwrap();
        std::fs::write(&tts_model, b"weights").unwrap();
        std::fs::write(&tts_config, b"{}").unwrap();
        Self {
            dir,
            workspace_root,
            stt_model,
            tts_model,
            tts_config,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn stt(&self, binary: &Path) -> SttService {
        SttService::new(&self.stt_model, binary)
    }

    pub fn tts_config(&self, binary: &Path) -> TtsConfig {
        TtsConfig {
            binary_path: binary.to_path_buf(),
            model_path: self.tts_model.clone(),
            config_path: self.tts_config.clone(),
            speaker: "wibowo".to_string(),
            ..TtsConfig::default()
        }
    }

    pub fn tts(&self, binary: &Path) -> TtsService {
        TtsService::new(
            &self.tts_config(binary),
            PhonemeNormalizer::new(Arc::new(PassthroughPhonemizer)),
        )
    }

    pub fn pipeline(
        &self,
        stt_binary: &Path,
        reply: Arc<dyn ReplyEngine>,
        tts_binary: &Path,
    ) -> VoicePipeline {
        VoicePipeline::new(
            Arc::new(self.stt(stt_binary)),
            reply,
            Arc::new(self.tts(tts_binary)),
            &self.workspace_root,
        )
    }

    /// Entries left under the workspace root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.workspace_root).unwrap().count()
    }
}
