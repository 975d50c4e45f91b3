//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use uuid::Uuid;

use voice_card::playback::{
    AudioEngine, AudioFormat, AudioResource, EngineError, EngineStatus, PlaybackController,
    PlaybackState, SpeechSynthesizer, StatusReceiver, StatusSender, SynthesisError, status_channel,
};

pub type SynthesisResult = Result<AudioResource, SynthesisError>;

/// Create a small fake MP3 clip
#[must_use]
pub fn clip() -> AudioResource {
    AudioResource::new(AudioFormat::Mp3, vec![0xFF, 0xFB, 0x90, 0x00])
}

enum Reply {
    Ready(SynthesisResult),
    Gated(oneshot::Receiver<SynthesisResult>),
}

/// Synthesizer that answers from a queue of scripted replies
///
/// Once the queue runs dry every call succeeds with a fresh clip.
#[derive(Default)]
pub struct FakeSynthesizer {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a reply that resolves immediately
    pub fn reply(&self, result: SynthesisResult) {
        self.replies.lock().unwrap().push_back(Reply::Ready(result));
    }

    /// Queue a reply that resolves when the returned sender fires
    pub fn gate(&self) -> oneshot::Sender<SynthesisResult> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply::Gated(rx));
        tx
    }

    /// `(text, voice)` for every synthesis call so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> SynthesisResult {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice.to_string()));

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(SynthesisError::Network("gate dropped".to_string()))),
            None => Ok(clip()),
        }
    }
}

/// Call recorded by [`FakeEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load(Uuid),
    Play,
    Pause,
    Unload,
}

/// Engine that records calls and reports status like a real one
pub struct FakeEngine {
    log: Arc<Mutex<Vec<EngineCall>>>,
    status: StatusSender,
    fail_load: bool,
}

/// Test-side view of a [`FakeEngine`]
#[derive(Clone)]
pub struct EngineHandle {
    log: Arc<Mutex<Vec<EngineCall>>>,
    status: StatusSender,
}

impl EngineHandle {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn loads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::Load(_)))
            .count()
    }

    /// Report the end of the clip
    pub fn finish_clip(&self) {
        self.status.send(EngineStatus { playing: false }).unwrap();
    }
}

impl FakeEngine {
    #[must_use]
    pub fn new() -> (Self, StatusReceiver, EngineHandle) {
        let (status, rx) = status_channel();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle = EngineHandle {
            log: Arc::clone(&log),
            status: status.clone(),
        };
        let engine = Self {
            log,
            status,
            fail_load: false,
        };
        (engine, rx, handle)
    }

    #[must_use]
    pub fn failing_load() -> (Self, StatusReceiver, EngineHandle) {
        let (mut engine, rx, handle) = Self::new();
        engine.fail_load = true;
        (engine, rx, handle)
    }

    fn record(&self, call: EngineCall) {
        self.log.lock().unwrap().push(call);
    }
}

impl AudioEngine for FakeEngine {
    fn load(&mut self, resource: &AudioResource) -> Result<(), EngineError> {
        if self.fail_load {
            return Err(EngineError::Load("unsupported codec".to_string()));
        }
        self.record(EngineCall::Load(resource.id()));
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Play);
        let _ = self.status.send(EngineStatus { playing: true });
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::Pause);
        let _ = self.status.send(EngineStatus { playing: false });
        Ok(())
    }

    fn unload(&mut self) {
        self.record(EngineCall::Unload);
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub type Card = PlaybackController<FakeSynthesizer, FakeEngine>;

/// Build a card showing `text`
pub fn card(text: &str) -> (Card, Arc<FakeSynthesizer>, EngineHandle) {
    let synthesizer = FakeSynthesizer::new();
    let (engine, status, handle) = FakeEngine::new();
    let mut card = PlaybackController::new(Arc::clone(&synthesizer), engine, status, "alloy");
    card.set_displayed_text(text);
    (card, synthesizer, handle)
}

/// Apply every event that arrives before the card goes quiet
///
/// Returns the view state after each event.
pub async fn settle(card: &mut Card) -> Vec<PlaybackState> {
    let mut states = Vec::new();
    while let Ok(Some(state)) =
        tokio::time::timeout(Duration::from_millis(50), card.next_event()).await
    {
        states.push(state);
    }
    states
}
