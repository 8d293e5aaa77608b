//! Voice pipeline core for suara.
//!
//! Turns one spoken utterance into a spoken reply: the recognition engine
//! transcribes the audio, a reply engine answers the transcript, and the
//! synthesis engine speaks the answer. The recognition, G2P and synthesis
//! engines are external command-line programs driven through the
//! [`invoker`]; the reply engine is any [`ReplyEngine`].
//!
//! Every request runs in its own [`Workspace`] and ends in a typed
//! [`PipelineResult`]. Failures are classified by
//! [`suara_types::ErrorKind`] and never smuggled through content strings.

pub mod config;
pub mod error;
pub mod invoker;
pub mod phoneme;
pub mod pipeline;
pub mod reply;
pub mod stt;
pub mod tts;
pub mod workspace;

pub use config::{PhonemizerConfig, ReplyConfig, SttConfig, TtsConfig, WorkspaceConfig};
pub use error::VoiceError;
pub use invoker::{Artifact, Invocation, InvokeOutput, ProcessInvoker};
pub use phoneme::{
    build_phonemizer, filter_phonemes, CommandPhonemizer, PassthroughPhonemizer,
    PhonemeNormalizer, Phonemizer,
};
pub use pipeline::{PipelineFailure, PipelineResult, PipelineState, VoicePipeline};
pub use reply::{HttpReplyEngine, ReplyEngine};
pub use stt::SttService;
pub use tts::TtsService;
pub use workspace::Workspace;
