//! Audio engine seam
//!
//! A card drives exactly one engine. Calls are synchronous; the engine
//! reports whether audio is coming out on a separate status channel, which
//! also carries stops the card did not ask for (end of clip).

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Encoding of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// MPEG layer III (what the TTS APIs return by default)
    Mp3,
    /// RIFF/WAVE
    Wav,
}

impl AudioFormat {
    /// MIME type for the format
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }

    /// Guess the format from a `Content-Type` header value
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim();
        match essence {
            "audio/mpeg" | "audio/mp3" => Some(Self::Mp3),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(Self::Wav),
            _ => None,
        }
    }
}

/// Reference to a synthesized clip
///
/// Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioResource {
    id: Uuid,
    format: AudioFormat,
    data: Arc<[u8]>,
}

impl AudioResource {
    /// Wrap encoded audio bytes
    #[must_use]
    pub fn new(format: AudioFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            format,
            data: data.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Encoded bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for AudioResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioResource")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Playing status reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub playing: bool,
}

/// Sending half of an engine's status channel
pub type StatusSender = mpsc::UnboundedSender<EngineStatus>;

/// Receiving half of an engine's status channel
pub type StatusReceiver = mpsc::UnboundedReceiver<EngineStatus>;

/// Create a status channel for an engine
#[must_use]
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}

/// Engine failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Resource is malformed or unreachable
    #[error("load error: {0}")]
    Load(String),

    /// Engine is in an invalid state for the call
    #[error("playback error: {0}")]
    Playback(String),
}

/// Plays one clip at a time
pub trait AudioEngine {
    /// Load a clip, replacing whatever was loaded
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the clip cannot be decoded
    fn load(&mut self, resource: &AudioResource) -> Result<(), EngineError>;

    /// Start or resume the loaded clip; restarts a clip that already ended
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Playback`] if nothing is loaded or the device fails
    fn play(&mut self) -> Result<(), EngineError>;

    /// Pause the loaded clip
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Playback`] if the device fails
    fn pause(&mut self) -> Result<(), EngineError>;

    /// Stop and free the loaded clip, if any
    fn unload(&mut self);

    /// Engine name for logging
    fn name(&self) -> &'static str;
}
