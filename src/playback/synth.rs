//! Text-to-speech (TTS) synthesis

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::engine::{AudioFormat, AudioResource};
use crate::config::VoiceConfig;
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// Synthesis failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// The request never got a response
    #[error("network error: {0}")]
    Network(String),

    /// The service rejected our credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Nothing to synthesize
    #[error("empty input")]
    EmptyInput,

    /// The service answered with a non-success status
    #[error("service error: HTTP {0}")]
    Service(u16),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Turns text into audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice`
    ///
    /// # Errors
    ///
    /// Returns error if the text is blank or the remote call fails
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> std::result::Result<AudioResource, SynthesisError>;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    OpenAI,
    ElevenLabs,
}

impl TtsProvider {
    /// Default model for the provider
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "tts-1",
            Self::ElevenLabs => "eleven_monolingual_v1",
        }
    }

    /// Default voice for the provider
    #[must_use]
    pub const fn default_voice(self) -> &'static str {
        match self {
            Self::OpenAI => "alloy",
            // "Rachel"
            Self::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
        }
    }
}

impl std::str::FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" | "eleven_labs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Synthesizes speech over HTTP
pub struct HttpSynthesizer {
    client: reqwest::Client,
    api_key: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
    base_url: String,
}

impl HttpSynthesizer {
    /// Create a synthesizer using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: String, speed: f32, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            speed,
            model,
            provider: TtsProvider::OpenAI,
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Create a synthesizer using ElevenLabs
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            speed: 1.0, // ElevenLabs doesn't use speed in the same way
            model,
            provider: TtsProvider::ElevenLabs,
            base_url: ELEVENLABS_BASE_URL.to_string(),
        })
    }

    /// Create a synthesizer from voice settings and the matching API key
    ///
    /// # Errors
    ///
    /// Returns error if the key for the configured provider is missing
    pub fn from_config(voice: &VoiceConfig, api_key: Option<&str>) -> Result<Self> {
        let api_key = api_key.unwrap_or_default().to_string();
        let synthesizer = match voice.provider {
            TtsProvider::OpenAI => Self::new_openai(api_key, voice.speed, voice.model.clone())?,
            TtsProvider::ElevenLabs => Self::new_elevenlabs(api_key, voice.model.clone())?,
        };

        Ok(match &voice.base_url {
            Some(base_url) => synthesizer.with_base_url(base_url.as_str()),
            None => synthesizer,
        })
    }

    /// Point requests at a different host, including the version prefix
    /// (e.g. `http://localhost:8080/v1`)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn provider(&self) -> TtsProvider {
        self.provider
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Synthesize using `OpenAI` TTS
    async fn synthesize_openai(
        &self,
        text: &str,
        voice: &str,
    ) -> std::result::Result<AudioResource, SynthesisError> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        read_audio(response).await
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(
        &self,
        text: &str,
        voice: &str,
    ) -> std::result::Result<AudioResource, SynthesisError> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech/{voice}", self.base_url))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        read_audio(response).await
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> std::result::Result<AudioResource, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyInput);
        }

        tracing::debug!(
            provider = ?self.provider,
            voice,
            chars = text.chars().count(),
            "synthesizing speech"
        );

        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text, voice).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, voice).await,
        }
    }
}

/// Turn a TTS response into a clip, mapping failures by status
async fn read_audio(
    response: reqwest::Response,
) -> std::result::Result<AudioResource, SynthesisError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, body = %body, "TTS request rejected");
        return Err(classify_status(status, &body));
    }

    let format = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(AudioFormat::from_content_type)
        .unwrap_or(AudioFormat::Mp3);

    let audio = response.bytes().await?;
    tracing::debug!(bytes = audio.len(), ?format, "speech synthesized");

    Ok(AudioResource::new(format, audio.to_vec()))
}

/// Map a non-success HTTP status to a synthesis error
fn classify_status(status: StatusCode, body: &str) -> SynthesisError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SynthesisError::Auth(format!("{status}: {body}"))
        }
        _ => SynthesisError::Service(status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            SynthesisError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            SynthesisError::Auth(_)
        ));
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            SynthesisError::Service(500)
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            SynthesisError::Service(429)
        );
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(HttpSynthesizer::new_openai(String::new(), 1.0, "tts-1".to_string()).is_err());
        assert!(
            HttpSynthesizer::new_elevenlabs(String::new(), "eleven_monolingual_v1".to_string())
                .is_err()
        );
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("openai".parse::<TtsProvider>().unwrap(), TtsProvider::OpenAI);
        assert_eq!(
            " ElevenLabs ".parse::<TtsProvider>().unwrap(),
            TtsProvider::ElevenLabs
        );
        assert!("festival".parse::<TtsProvider>().is_err());
    }

    fn voice_config(provider: TtsProvider, base_url: Option<&str>) -> VoiceConfig {
        VoiceConfig {
            provider,
            model: provider.default_model().to_string(),
            voice: provider.default_voice().to_string(),
            speed: 1.0,
            base_url: base_url.map(str::to_string),
        }
    }

    #[test]
    fn test_from_config_uses_configured_base_url() {
        let synth = HttpSynthesizer::from_config(
            &voice_config(TtsProvider::OpenAI, Some("http://proxy.local:8080/v1")),
            Some("sk-test"),
        )
        .unwrap();

        assert_eq!(synth.base_url(), "http://proxy.local:8080/v1");
    }

    #[test]
    fn test_from_config_defaults_to_provider_url() {
        let openai =
            HttpSynthesizer::from_config(&voice_config(TtsProvider::OpenAI, None), Some("sk-test"))
                .unwrap();
        let elevenlabs = HttpSynthesizer::from_config(
            &voice_config(TtsProvider::ElevenLabs, None),
            Some("xi-test"),
        )
        .unwrap();

        assert_eq!(openai.base_url(), "https://api.openai.com/v1");
        assert_eq!(elevenlabs.base_url(), "https://api.elevenlabs.io/v1");
    }

    #[tokio::test]
    async fn test_blank_text_never_hits_network() {
        let synth = HttpSynthesizer::new_openai("sk-test".to_string(), 1.0, "tts-1".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let result = synth.synthesize("  ", "alloy").await;

        assert_eq!(result.unwrap_err(), SynthesisError::EmptyInput);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let synth = HttpSynthesizer::new_openai("sk-test".to_string(), 1.0, "tts-1".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let result = synth.synthesize("Ciao", "alloy").await;

        assert!(matches!(result, Err(SynthesisError::Network(_))));
    }
}
