//! Single-turn voice pipeline: transcription, reply, synthesis.
//!
//! [`VoicePipeline::run`] drives one request through a linear state
//! machine. The first stage failure ends the run; later stages never start.
//! A fresh [`Workspace`] backs every run and is removed on every exit path.

use crate::error::VoiceError;
use crate::reply::ReplyEngine;
use crate::stt::SttService;
use crate::tts::TtsService;
use crate::workspace::Workspace;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use suara_types::{AudioBuffer, ErrorKind, PipelineStage, SynthesizedAudio};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// States of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Transcribing,
    Transcribed,
    Generating,
    Generated,
    Synthesizing,
    Synthesized,
    Completed,
    Failed(PipelineStage),
}

impl PipelineState {
    /// The next state on the success path. `None` for terminal states.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Transcribing),
            Self::Transcribing => Some(Self::Transcribed),
            Self::Transcribed => Some(Self::Generating),
            Self::Generating => Some(Self::Generated),
            Self::Generated => Some(Self::Synthesizing),
            Self::Synthesizing => Some(Self::Synthesized),
            Self::Synthesized => Some(Self::Completed),
            Self::Completed | Self::Failed(_) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Tracks and logs the state of a run.
#[derive(Debug)]
struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        debug!(state = ?PipelineState::Received, "pipeline state");
        Self {
            state: PipelineState::Received,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.successor() {
            debug!(from = ?self.state, to = ?next, "pipeline state");
            self.state = next;
        }
    }

    fn fail(&mut self, stage: PipelineStage) {
        if !self.state.is_terminal() {
            debug!(from = ?self.state, to = ?PipelineState::Failed(stage), "pipeline state");
            self.state = PipelineState::Failed(stage);
        }
    }
}

/// A classified failure, tagged with the stage it happened in.
#[derive(Debug)]
pub struct PipelineFailure {
    pub request_id: Uuid,
    pub stage: PipelineStage,
    pub error: VoiceError,
}

impl PipelineFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of [`VoicePipeline::run`].
#[derive(Debug)]
pub enum PipelineResult {
    Success(SynthesizedAudio),
    Failure(PipelineFailure),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<SynthesizedAudio, PipelineFailure> {
        match self {
            Self::Success(audio) => Ok(audio),
            Self::Failure(failure) => Err(failure),
        }
    }
}

/// Orchestrates the three stages for one request at a time.
///
/// Cheap to share: every run owns its own workspace and nothing else is
/// mutated, so concurrent runs only meet on the filesystem, under distinct
/// workspace names.
pub struct VoicePipeline {
    stt: Arc<SttService>,
    reply: Arc<dyn ReplyEngine>,
    tts: Arc<TtsService>,
    workspace_root: PathBuf,
}

impl fmt::Debug for VoicePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoicePipeline")
            .field("stt", &self.stt)
            .field("tts", &self.tts)
            .field("workspace_root", &self.workspace_root)
            .finish_non_exhaustive()
    }
}

impl VoicePipeline {
    pub fn new(
        stt: Arc<SttService>,
        reply: Arc<dyn ReplyEngine>,
        tts: Arc<TtsService>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stt,
            reply,
            tts,
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Runs transcription, reply generation and synthesis for one request.
    ///
    /// Empty or malformed audio fails at ingress without creating a
    /// workspace or invoking any engine. Dropping the returned future kills
    /// any engine process still running and removes the workspace.
    pub async fn run(&self, audio: AudioBuffer) -> PipelineResult {
        let request_id = Uuid::new_v4();
        self.run_request(request_id, audio)
            .instrument(info_span!("voice_pipeline", %request_id))
            .await
    }

    async fn run_request(&self, request_id: Uuid, audio: AudioBuffer) -> PipelineResult {
        let mut tracker = StateTracker::new();
        let failure = |stage: PipelineStage, error: VoiceError| {
            warn!(stage = %stage, kind = %error.kind(), error = %error, "pipeline failed");
            PipelineResult::Failure(PipelineFailure {
                request_id,
                stage,
                error,
            })
        };

        let format = match audio.probe() {
            Ok(format) => format,
            Err(e) => {
                tracker.fail(PipelineStage::Ingress);
                return failure(PipelineStage::Ingress, VoiceError::Validation(e.to_string()));
            }
        };
        info!(
            bytes = audio.len(),
            container = ?format.container,
            sample_rate = ?format.sample_rate,
            channels = ?format.channels,
            duration_ms = ?format.duration_ms,
            "received audio"
        );

        let workspace = match Workspace::create(&self.workspace_root).await {
            Ok(workspace) => workspace,
            Err(e) => {
                tracker.fail(PipelineStage::Ingress);
                return failure(PipelineStage::Ingress, e);
            }
        };

        let outcome = self.run_stages(&mut tracker, audio, &workspace).await;
        workspace.close().await;

        match outcome {
            Ok(audio) => {
                tracker.advance();
                info!(bytes = audio.len(), "pipeline completed");
                PipelineResult::Success(audio)
            }
            Err((stage, error)) => {
                tracker.fail(stage);
                failure(stage, error)
            }
        }
    }

    async fn run_stages(
        &self,
        tracker: &mut StateTracker,
        audio: AudioBuffer,
        workspace: &Workspace,
    ) -> Result<SynthesizedAudio, (PipelineStage, VoiceError)> {
        tracker.advance();
        let transcript = self
            .stt
            .transcribe(&audio, workspace)
            .await
            .map_err(|e| (PipelineStage::Transcribing, e))?;
        drop(audio);
        tracker.advance();
        info!(chars = transcript.as_str().chars().count(), "transcribed");
        debug!(transcript = %transcript.as_str().trim(), "transcript text");

        tracker.advance();
        let reply = self
            .reply
            .generate_reply(&transcript)
            .await
            .map_err(|e| (PipelineStage::Generating, e))?;
        tracker.advance();
        info!(chars = reply.as_str().chars().count(), "reply received");
        debug!(reply = %reply.as_str(), "reply text");

        tracker.advance();
        let synthesized = self
            .tts
            .synthesize(&reply, workspace)
            .await
            .map_err(|e| (PipelineStage::Synthesizing, e))?;
        tracker.advance();

        Ok(synthesized)
    }
}
