#![cfg(unix)]

mod common;

use common::{mock_tts, mock_whisper, silent_wav, EchoReply, FailingReply, Fixture, StaticReply};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use suara_types::{AudioBuffer, AudioContainer, ErrorKind, PipelineStage};
use suara_voice::{PipelineResult, PipelineState, VoiceError};

fn wav() -> AudioBuffer {
    AudioBuffer::new(silent_wav(16_000, 1), AudioContainer::Wav)
}

fn expect_failure(result: PipelineResult) -> suara_voice::PipelineFailure {
    match result {
        PipelineResult::Failure(failure) => failure,
        PipelineResult::Success(audio) => panic!("expected failure, got {} bytes", audio.len()),
    }
}

#[tokio::test]
async fn test_pipeline_success_produces_audio() {
    let fixture = Fixture::new();
    let whisper = mock_whisper(fixture.path(), r#"printf 'halo' > "$out.txt""#);
    let tts = mock_tts(fixture.path(), r#"printf 'audio:%s' "$text" > "$out""#);
    let reply = StaticReply::new("Halo dunia");
    let pipeline = fixture.pipeline(&whisper, reply.clone(), &tts);

    let audio = pipeline.run(wav()).await.into_result().unwrap();

    assert!(!audio.is_empty());
    assert_eq!(audio.bytes, b"audio:Halo dunia");
    assert_eq!(reply.calls(), 1);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_pipeline_silence_still_replies() {
    let fixture = Fixture::new();
    let whisper = mock_whisper(fixture.path(), r#": > "$out.txt""#);
    let tts = mock_tts(fixture.path(), r#"printf 'audio:%s' "$text" > "$out""#);
    let reply = StaticReply::new("Maaf, saya tidak mendengar apa pun.");
    let pipeline = fixture.pipeline(&whisper, reply.clone(), &tts);

    let result = pipeline.run(wav()).await;

    assert!(result.is_success());
    assert_eq!(reply.calls(), 1);
}

#[tokio::test]
async fn test_pipeline_empty_buffer_fails_at_ingress() {
    let fixture = Fixture::new();
    let marker = fixture.path().join("ran");
    let whisper = mock_whisper(fixture.path(), &format!("touch '{}'", marker.display()));
    let tts = mock_tts(fixture.path(), r#"printf 'x' > "$out""#);
    let reply = StaticReply::new("Halo");
    let pipeline = fixture.pipeline(&whisper, reply.clone(), &tts);

    let failure = expect_failure(
        pipeline
            .run(AudioBuffer::new(Vec::new(), AudioContainer::Wav))
            .await,
    );

    assert_eq!(failure.stage, PipelineStage::Ingress);
    assert_eq!(failure.kind(), ErrorKind::ValidationError);
    assert!(!marker.exists());
    assert_eq!(reply.calls(), 0);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_pipeline_malformed_wav_fails_at_ingress() {
    let fixture = Fixture::new();
    let whisper = mock_whisper(fixture.path(), r#": > "$out.txt""#);
    let tts = mock_tts(fixture.path(), r#"printf 'x' > "$out""#);
    let pipeline = fixture.pipeline(&whisper, StaticReply::new("Halo"), &tts);

    let failure = expect_failure(
        pipeline
            .run(AudioBuffer::new(b"not a wav".to_vec(), AudioContainer::Wav))
            .await,
    );
    assert_eq!(failure.stage, PipelineStage::Ingress);
    assert_eq!(failure.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_pipeline_missing_recognizer() {
    let fixture = Fixture::new();
    let tts = mock_tts(fixture.path(), r#"printf 'x' > "$out""#);
    let reply = StaticReply::new("Halo");
    let pipeline = fixture.pipeline(&fixture.path().join("no-whisper"), reply.clone(), &tts);

    let failure = expect_failure(pipeline.run(wav()).await);

    assert_eq!(failure.stage, PipelineStage::Transcribing);
    assert_eq!(failure.kind(), ErrorKind::ExternalToolMissing);
    assert_eq!(reply.calls(), 0);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_pipeline_synthesis_failure_is_reported_verbatim() {
    let fixture = Fixture::new();
    let whisper = mock_whisper(fixture.path(), r#"printf 'halo' > "$out.txt""#);
    let tts = mock_tts(fixture.path(), "echo 'speaker not found' >&2\nexit 1");
    let pipeline = fixture.pipeline(&whisper, StaticReply::new("Halo dunia"), &tts);

    let failure = expect_failure(pipeline.run(wav()).await);

    assert_eq!(failure.stage, PipelineStage::Synthesizing);
    assert_eq!(failure.kind(), ErrorKind::ExternalToolFailure);
    match &failure.error {
        VoiceError::ToolFailure {
            exit_code, stderr, ..
        } => {
            assert_eq!(*exit_code, Some(1));
            assert_eq!(stderr, "speaker not found");
        }
        other => panic!("expected ToolFailure, got {:?}", other),
    }
    assert!(failure.to_string().starts_with("[ERROR] synthesizing:"));
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_pipeline_upstream_error_passes_through() {
    let fixture = Fixture::new();
    let whisper = mock_whisper(fixture.path(), r#"printf 'halo' > "$out.txt""#);
    let marker = fixture.path().join("tts-ran");
    let tts = mock_tts(fixture.path(), &format!("touch '{}'", marker.display()));
    let pipeline = fixture.pipeline(&whisper, Arc::new(FailingReply), &tts);

    let failure = expect_failure(pipeline.run(wav()).await);

    assert_eq!(failure.stage, PipelineStage::Generating);
    assert_eq!(failure.kind(), ErrorKind::UpstreamError);
    assert!(failure.error.to_string().contains("model overloaded"));
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_pipeline_empty_phonemes_at_synthesis() {
    let fixture = Fixture::new();
    let whisper = mock_whisper(fixture.path(), r#"printf 'halo' > "$out.txt""#);
    let tts = mock_tts(fixture.path(), r#"printf 'x' > "$out""#);
    let pipeline = fixture.pipeline(&whisper, StaticReply::new("ʔ ˈ"), &tts);

    let failure = expect_failure(pipeline.run(wav()).await);
    assert_eq!(failure.stage, PipelineStage::Synthesizing);
    assert_eq!(failure.kind(), ErrorKind::EmptyPhonemeError);
}

#[tokio::test]
async fn test_concurrent_runs_use_distinct_workspaces() {
    let fixture = Fixture::new();
    // The transcript is the workspace directory the engine was given.
    let whisper = mock_whisper(
        fixture.path(),
        r#"printf '%s' "$(dirname "$input")" > "$out.txt""#,
    );
    let tts = mock_tts(fixture.path(), r#"printf '%s' "$text" > "$out""#);
    let pipeline = Arc::new(fixture.pipeline(&whisper, Arc::new(EchoReply), &tts));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move { pipeline.run(wav()).await }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        let audio = handle.await.unwrap().into_result().unwrap();
        let workspace = String::from_utf8(audio.bytes).unwrap();
        assert!(workspace.contains("suara-"), "got {:?}", workspace);
        assert!(seen.insert(workspace), "workspace reused across requests");
    }
    assert_eq!(seen.len(), 8);
    assert_eq!(fixture.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_cancelled_run_kills_engine_and_removes_workspace() {
    let fixture = Fixture::new();
    let started = fixture.path().join("started");
    let survived = fixture.path().join("survived");
    let whisper = mock_whisper(
        fixture.path(),
        &format!(
            "touch '{}'\nsleep 1\ntouch '{}'",
            started.display(),
            survived.display()
        ),
    );
    let tts = mock_tts(fixture.path(), r#"printf 'x' > "$out""#);
    let pipeline = Arc::new(fixture.pipeline(&whisper, StaticReply::new("Halo"), &tts));

    let task = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run(wav()).await })
    };

    for _ in 0..100 {
        if started.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(started.exists(), "recognizer never started");
    assert_eq!(fixture.leftover_workspaces(), 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(fixture.leftover_workspaces(), 0);

    tokio::time::sleep(Duration::from_millis(1800)).await;
    assert!(!survived.exists(), "recognizer kept running after cancellation");
}

#[test]
fn test_state_machine_is_linear() {
    let mut state = PipelineState::Received;
    let mut visited = vec![state];
    while let Some(next) = state.successor() {
        state = next;
        visited.push(state);
    }
    assert_eq!(
        visited,
        vec![
            PipelineState::Received,
            PipelineState::Transcribing,
            PipelineState::Transcribed,
            PipelineState::Generating,
            PipelineState::Generated,
            PipelineState::Synthesizing,
            PipelineState::Synthesized,
            PipelineState::Completed,
        ]
    );
    assert!(PipelineState::Failed(PipelineStage::Generating).is_terminal());
    assert_eq!(
        PipelineState::Failed(PipelineStage::Ingress).successor(),
        None
    );
}
