//! Voice Card - text-to-speech playback for translation cards
//!
//! A voice translation app shows two cards: what was said, and its
//! translation. Each card has a speaker button that synthesizes the card's
//! text, caches the audio against that text, and plays it back.
//!
//! - Playback: per-card cache and state machine ([`playback`])
//! - Translation between the two speakers' languages ([`translate`])
//! - Conversation and language bookkeeping ([`conversation`], [`language`])
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Card (UI)                          │
//! │      press()   │   set_displayed_text()   │  view     │
//! └───────────────────────┬──────────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────────┐
//! │                PlaybackController                     │
//! │   PlaybackMachine  │  single-slot cache  │ generation │
//! └──────────┬─────────────────────────────┬─────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼─────────────┐
//! │  SpeechSynthesizer  │       │      AudioEngine        │
//! │  OpenAI/ElevenLabs  │       │  cpal speaker + status  │
//! └─────────────────────┘       └────────────────────────┘
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod language;
pub mod playback;
pub mod translate;

pub use config::Config;
pub use conversation::{Conversation, Speaker};
pub use error::{Error, Result};
pub use language::{LANGUAGES, Language};
pub use playback::{
    AudioEngine, AudioFormat, AudioResource, HttpSynthesizer, PlaybackController, PlaybackState,
    SpeakerEngine, SpeechSynthesizer,
};
pub use translate::{OpenAiTranslator, Translator};
