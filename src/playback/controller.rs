//! Card playback controller
//!
//! Wraps a [`PlaybackMachine`] with the collaborators it commands. Presses
//! and text changes are handled synchronously; synthesis runs as a parked
//! future that [`PlaybackController::next_event`] drives alongside the
//! engine's status channel, on the caller's task.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;

use super::engine::{AudioEngine, StatusReceiver};
use super::state::{Command, Event, Generation, PlaybackMachine, PlaybackState, PressError};
use super::synth::SpeechSynthesizer;

type SynthesisFuture = BoxFuture<'static, Event>;

/// Drives playback for one card
pub struct PlaybackController<S, E>
where
    S: SpeechSynthesizer + 'static,
    E: AudioEngine,
{
    machine: PlaybackMachine,
    synthesizer: Arc<S>,
    engine: E,
    status: StatusReceiver,
    status_open: bool,
    in_flight: FuturesUnordered<SynthesisFuture>,
}

impl<S, E> PlaybackController<S, E>
where
    S: SpeechSynthesizer + 'static,
    E: AudioEngine,
{
    /// Create a controller that owns `engine` for the card's lifetime
    pub fn new(
        synthesizer: Arc<S>,
        engine: E,
        status: StatusReceiver,
        voice: impl Into<String>,
    ) -> Self {
        let machine = PlaybackMachine::new(voice);
        tracing::debug!(engine = engine.name(), voice = machine.voice(), "card controller created");

        Self {
            machine,
            synthesizer,
            engine,
            status,
            status_open: true,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Current view state
    #[must_use]
    pub const fn view_state(&self) -> &PlaybackState {
        self.machine.state()
    }

    /// Toggle playback
    ///
    /// Pauses when playing, replays cached audio when the text is unchanged,
    /// and otherwise starts synthesis. Never waits for the synthesis result.
    ///
    /// # Errors
    ///
    /// Returns [`PressError::EmptyText`] when the card has nothing to speak
    pub fn press(&mut self) -> Result<(), PressError> {
        self.dispatch(Event::Pressed)
    }

    /// Update the text shown on the card
    pub fn set_displayed_text(&mut self, text: impl Into<String>) {
        // Only presses can be rejected
        let _ = self.dispatch(Event::TextChanged(text.into()));
    }

    /// Change the voice; cached audio for the old voice is dropped
    pub fn set_voice(&mut self, voice: impl Into<String>) {
        let _ = self.dispatch(Event::VoiceChanged(voice.into()));
    }

    /// Feed an engine status report
    ///
    /// Status arriving on the channel given to [`Self::new`] is handled by
    /// [`Self::next_event`]; this is for hosts that observe the engine
    /// themselves.
    pub fn on_engine_status(&mut self, playing: bool) {
        let _ = self.dispatch(Event::EngineStatus { playing });
    }

    /// Wait for the next synthesis completion or engine status report
    ///
    /// Returns the view state after applying it, or `None` once there is
    /// nothing left to wait for.
    pub async fn next_event(&mut self) -> Option<PlaybackState> {
        loop {
            let event = tokio::select! {
                biased;

                status = self.status.recv(), if self.status_open => match status {
                    Some(status) => Event::EngineStatus { playing: status.playing },
                    None => {
                        tracing::debug!("engine status channel closed");
                        self.status_open = false;
                        continue;
                    }
                },
                Some(event) = self.in_flight.next(), if !self.in_flight.is_empty() => event,
                else => return None,
            };

            let _ = self.dispatch(event);
            return Some(self.view_state().clone());
        }
    }

    /// Whether a synthesis request is still running, stale or not
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Text the card currently shows
    #[must_use]
    pub fn displayed_text(&self) -> &str {
        self.machine.displayed_text()
    }

    /// Text the cached audio was synthesized for
    #[must_use]
    pub fn cached_text(&self) -> Option<&str> {
        self.machine.cached_text()
    }

    #[must_use]
    pub fn voice(&self) -> &str {
        self.machine.voice()
    }

    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.machine.generation()
    }

    /// Apply an event and run the commands it produces, feeding engine
    /// failures back in until the machine settles
    fn dispatch(&mut self, event: Event) -> Result<(), PressError> {
        let mut commands: VecDeque<Command> = self.machine.reduce(event)?.into();

        while let Some(command) = commands.pop_front() {
            if let Some(followup) = self.execute(command) {
                commands.extend(self.machine.reduce(followup)?);
            }
        }

        Ok(())
    }

    fn execute(&mut self, command: Command) -> Option<Event> {
        match command {
            Command::Synthesize {
                generation,
                text,
                voice,
            } => {
                tracing::debug!(%generation, text = %text, voice = %voice, "requesting synthesis");
                let synthesizer = Arc::clone(&self.synthesizer);
                self.in_flight.push(Box::pin(async move {
                    let outcome = synthesizer.synthesize(&text, &voice).await;
                    Event::SynthesisFinished {
                        generation,
                        text,
                        outcome,
                    }
                }));
                None
            }
            Command::Play(resource) => {
                tracing::debug!(id = %resource.id(), "starting playback");
                self.engine
                    .load(&resource)
                    .and_then(|()| self.engine.play())
                    .err()
                    .map(Event::EngineFailed)
            }
            Command::Pause => self.engine.pause().err().map(Event::EngineFailed),
            Command::Release(resource) => {
                tracing::debug!(id = %resource.id(), "releasing audio");
                self.engine.unload();
                None
            }
        }
    }
}

impl<S, E> Drop for PlaybackController<S, E>
where
    S: SpeechSynthesizer + 'static,
    E: AudioEngine,
{
    fn drop(&mut self) {
        if let Some(entry) = self.machine.take_cache() {
            tracing::debug!(id = %entry.resource.id(), "releasing audio on teardown");
            self.engine.unload();
        }
    }
}
