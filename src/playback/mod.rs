//! Per-card text-to-speech playback
//!
//! Each card on screen owns a [`PlaybackController`]: a single-slot cache of
//! the audio for the card's current text, plus the state machine that keeps
//! the speaker button honest while synthesis and playback complete
//! asynchronously.

mod controller;
mod engine;
mod speaker;
mod state;
mod synth;

pub use controller::PlaybackController;
pub use engine::{
    AudioEngine, AudioFormat, AudioResource, EngineError, EngineStatus, StatusReceiver,
    StatusSender, status_channel,
};
pub use speaker::{PLAYBACK_SAMPLE_RATE, SpeakerEngine, decode};
pub use state::{
    CacheEntry, Command, Event, FailureReason, Generation, PlaybackMachine, PlaybackState,
    PressError,
};
pub use synth::{HttpSynthesizer, SpeechSynthesizer, SynthesisError, TtsProvider};
