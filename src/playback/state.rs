//! Playback state machine
//!
//! [`PlaybackMachine::reduce`] is the single transition function for a card.
//! It performs no I/O: every side effect is returned as a [`Command`] for the
//! driver to execute, and every asynchronous completion comes back in as an
//! [`Event`]. Stale completions are detected with a [`Generation`] token.

use std::fmt;

use super::engine::{AudioResource, EngineError};
use super::synth::SynthesisError;

/// Monotonic token identifying the current fetch/cache epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    const fn bump(&mut self) {
        self.0 += 1;
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Synthesized audio together with the text it was generated for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Text the audio speaks
    pub text: String,
    /// Synthesized audio
    pub resource: AudioResource,
}

/// Why the last playback attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Remote synthesis failed
    Synthesis(SynthesisError),
    /// The engine rejected the audio
    EngineLoad(String),
    /// The engine failed to play or pause
    EngineOperation(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synthesis(e) => write!(f, "synthesis failed: {e}"),
            Self::EngineLoad(msg) => write!(f, "could not load audio: {msg}"),
            Self::EngineOperation(msg) => write!(f, "playback failed: {msg}"),
        }
    }
}

impl From<EngineError> for FailureReason {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Load(msg) => Self::EngineLoad(msg),
            EngineError::Playback(msg) => Self::EngineOperation(msg),
        }
    }
}

/// View state rendered by a card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing happening
    #[default]
    Idle,
    /// Synthesis in flight
    Loading,
    /// Audio is playing
    Playing,
    /// Last attempt failed; pressing again retries
    Error(FailureReason),
}

impl PlaybackState {
    /// Short lowercase label, suitable for logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Error(_) => "error",
        }
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Rejected press
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PressError {
    /// The card has no text to speak
    #[error("nothing to speak: card text is empty")]
    EmptyText,
}

/// Input to the state machine
#[derive(Debug, Clone)]
pub enum Event {
    /// The card's text changed
    TextChanged(String),
    /// The voice used for synthesis changed
    VoiceChanged(String),
    /// The user pressed the speaker button
    Pressed,
    /// A synthesis request finished
    SynthesisFinished {
        /// Generation the request was issued under
        generation: Generation,
        /// Text that was synthesized
        text: String,
        /// Synthesized audio or the failure
        outcome: Result<AudioResource, SynthesisError>,
    },
    /// The engine reported its playing status
    EngineStatus {
        /// Whether audio is currently coming out
        playing: bool,
    },
    /// An engine call issued by the driver failed
    EngineFailed(EngineError),
}

/// Side effect requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start synthesizing `text`; report back with `generation`
    Synthesize {
        generation: Generation,
        text: String,
        voice: String,
    },
    /// Load the resource into the engine and start playing
    Play(AudioResource),
    /// Pause the engine
    Pause,
    /// Unload the resource from the engine
    Release(AudioResource),
}

/// Single-card playback state machine
#[derive(Debug)]
pub struct PlaybackMachine {
    displayed_text: String,
    voice: String,
    cache: Option<CacheEntry>,
    generation: Generation,
    state: PlaybackState,
    play_requested: bool,
}

impl PlaybackMachine {
    /// Create an idle machine with no text and an empty cache
    #[must_use]
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            displayed_text: String::new(),
            voice: voice.into(),
            cache: None,
            generation: Generation::default(),
            state: PlaybackState::Idle,
            play_requested: false,
        }
    }

    /// Apply one event and return the side effects to perform, in order
    ///
    /// # Errors
    ///
    /// Returns [`PressError::EmptyText`] when a press arrives while the card
    /// text is blank. State is left untouched in that case.
    pub fn reduce(&mut self, event: Event) -> Result<Vec<Command>, PressError> {
        let before = self.state.label();

        let commands = match event {
            Event::TextChanged(text) => self.text_changed(text),
            Event::VoiceChanged(voice) => self.voice_changed(voice),
            Event::Pressed => self.pressed()?,
            Event::SynthesisFinished {
                generation,
                text,
                outcome,
            } => self.synthesis_finished(generation, text, outcome),
            Event::EngineStatus { playing } => {
                self.engine_status(playing);
                Vec::new()
            }
            Event::EngineFailed(err) => self.engine_failed(err),
        };

        if before != self.state.label() {
            tracing::debug!(
                from = before,
                to = self.state.label(),
                generation = %self.generation,
                "playback state changed"
            );
        }

        Ok(commands)
    }

    fn text_changed(&mut self, text: String) -> Vec<Command> {
        if text == self.displayed_text {
            return Vec::new();
        }

        self.displayed_text = text;
        self.invalidate(false)
    }

    fn voice_changed(&mut self, voice: String) -> Vec<Command> {
        if voice == self.voice {
            return Vec::new();
        }

        self.voice = voice;
        self.invalidate(true)
    }

    /// Drop whatever no longer matches the current request and return to idle
    fn invalidate(&mut self, force_evict: bool) -> Vec<Command> {
        let mut commands = Vec::new();
        let was_playing = self.state.is_playing();

        if self.state.is_loading() {
            tracing::debug!(generation = %self.generation, "in-flight synthesis superseded");
        }

        let displayed = &self.displayed_text;
        if let Some(entry) = self
            .cache
            .take_if(|entry| force_evict || entry.text != *displayed)
        {
            tracing::debug!(text = %entry.text, "evicting cached audio");
            commands.push(Command::Release(entry.resource));
        } else if was_playing {
            commands.push(Command::Pause);
        }

        self.generation.bump();
        self.play_requested = false;
        self.state = PlaybackState::Idle;
        commands
    }

    fn pressed(&mut self) -> Result<Vec<Command>, PressError> {
        match self.state {
            PlaybackState::Playing => {
                self.play_requested = false;
                self.state = PlaybackState::Idle;
                Ok(vec![Command::Pause])
            }
            PlaybackState::Loading => {
                tracing::debug!("press ignored while synthesis is in flight");
                Ok(Vec::new())
            }
            PlaybackState::Idle | PlaybackState::Error(_) => {
                if self.displayed_text.trim().is_empty() {
                    tracing::debug!("press rejected: empty text");
                    return Err(PressError::EmptyText);
                }

                if let Some(entry) = self.cached_entry() {
                    let resource = entry.resource.clone();
                    tracing::debug!(text = %self.displayed_text, "cache hit, replaying");
                    self.play_requested = true;
                    self.state = PlaybackState::Playing;
                    return Ok(vec![Command::Play(resource)]);
                }

                self.generation.bump();
                self.state = PlaybackState::Loading;
                Ok(vec![Command::Synthesize {
                    generation: self.generation,
                    text: self.displayed_text.clone(),
                    voice: self.voice.clone(),
                }])
            }
        }
    }

    fn synthesis_finished(
        &mut self,
        generation: Generation,
        text: String,
        outcome: Result<AudioResource, SynthesisError>,
    ) -> Vec<Command> {
        if generation != self.generation {
            tracing::debug!(
                %generation,
                current = %self.generation,
                ok = outcome.is_ok(),
                "discarding stale synthesis result"
            );
            return Vec::new();
        }

        match outcome {
            Ok(resource) => {
                self.cache = Some(CacheEntry {
                    text,
                    resource: resource.clone(),
                });
                self.play_requested = true;
                self.state = PlaybackState::Playing;
                vec![Command::Play(resource)]
            }
            Err(err) => {
                tracing::warn!(error = %err, "speech synthesis failed");
                self.state = PlaybackState::Error(FailureReason::Synthesis(err));
                Vec::new()
            }
        }
    }

    fn engine_status(&mut self, playing: bool) {
        if playing {
            match self.state {
                PlaybackState::Playing => {}
                _ if self.play_requested && self.cache.is_some() => {
                    self.state = PlaybackState::Playing;
                }
                _ => {
                    tracing::warn!(
                        state = self.state.label(),
                        "engine reports playing without a requested play, ignoring"
                    );
                }
            }
            return;
        }

        // A stop report never interrupts a fetch, and never hides a failure
        if self.state.is_playing() {
            self.state = PlaybackState::Idle;
        }
    }

    fn engine_failed(&mut self, err: EngineError) -> Vec<Command> {
        tracing::warn!(error = %err, "audio engine failed");

        let commands = self
            .cache
            .take()
            .map(|entry| vec![Command::Release(entry.resource)])
            .unwrap_or_default();

        self.generation.bump();
        self.play_requested = false;
        self.state = PlaybackState::Error(err.into());
        commands
    }

    fn cached_entry(&self) -> Option<&CacheEntry> {
        self.cache
            .as_ref()
            .filter(|entry| entry.text == self.displayed_text)
    }

    /// Current view state
    #[must_use]
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Text the card currently shows
    #[must_use]
    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }

    /// Voice used for synthesis
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Cached entry, if any
    #[must_use]
    pub const fn cache(&self) -> Option<&CacheEntry> {
        self.cache.as_ref()
    }

    /// Text of the cached entry, if any
    #[must_use]
    pub fn cached_text(&self) -> Option<&str> {
        self.cache.as_ref().map(|entry| entry.text.as_str())
    }

    /// Current generation token
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Remove the cached entry so its resource can be released
    pub fn take_cache(&mut self) -> Option<CacheEntry> {
        self.cache.take()
    }
}
