//! Configuration management for voice card
//!
//! Values come from environment variables layered over the optional TOML
//! file (see [`file`]), layered over built-in defaults.

pub mod file;

use std::path::{Path, PathBuf};

use crate::language::Language;
use crate::playback::TtsProvider;
use crate::{Error, Result};

use self::file::ConfigFile;

/// Default model for translation requests
pub const DEFAULT_TRANSLATION_MODEL: &str = "gpt-4.1-nano-2025-04-14";

/// Default `OpenAI` API base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Voice card configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Speech synthesis configuration
    pub voice: VoiceConfig,

    /// Translation configuration
    pub translation: TranslationConfig,

    /// Default speaker languages
    pub languages: LanguageConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// TTS backend
    pub provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "eleven_monolingual_v1")
    pub model: String,

    /// TTS voice identifier
    pub voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// TTS API base URL, without trailing slash; `None` uses the provider's
    pub base_url: Option<String>,
}

/// Translation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationConfig {
    /// Responses API model
    pub model: String,

    /// Upper bound on generated tokens
    pub max_output_tokens: u32,

    /// API base URL, without trailing slash
    pub base_url: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_TRANSLATION_MODEL.to_string(),
            max_output_tokens: 10_000,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

/// Default languages for the two speakers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageConfig {
    pub source: Language,
    pub target: Language,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for TTS and translation)
    pub openai: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// `VOICECARD_CONFIG` overrides the config file location.
    ///
    /// # Errors
    ///
    /// Returns error if the named config file cannot be loaded or a
    /// configured value is invalid
    pub fn load() -> Result<Self> {
        let path = std::env::var("VOICECARD_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Load configuration from the environment and an explicit config file
    ///
    /// Falls back to the standard config file location when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns error if `path` cannot be loaded or a configured value is
    /// invalid
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = file::load_config_file(path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match env("VOICECARD_TTS_PROVIDER") {
            Some(value) => value.parse()?,
            None => file.voice.provider.unwrap_or_default(),
        };

        let speed = match env("VOICECARD_TTS_SPEED") {
            Some(value) => value
                .trim()
                .parse::<f32>()
                .map_err(|e| Error::Config(format!("invalid VOICECARD_TTS_SPEED {value:?}: {e}")))?,
            None => file.voice.speed.unwrap_or(1.0),
        };
        if !(0.25..=4.0).contains(&speed) {
            return Err(Error::Config(format!(
                "TTS speed must be between 0.25 and 4.0, got {speed}"
            )));
        }

        // OPENAI_BASE_URL covers every OpenAI request, speech included
        let openai_base_url = env("OPENAI_BASE_URL");

        let voice = VoiceConfig {
            provider,
            model: env("VOICECARD_TTS_MODEL")
                .or(file.voice.model)
                .unwrap_or_else(|| provider.default_model().to_string()),
            voice: env("VOICECARD_TTS_VOICE")
                .or(file.voice.voice)
                .unwrap_or_else(|| provider.default_voice().to_string()),
            speed,
            base_url: file
                .voice
                .base_url
                .or_else(|| openai_base_url.clone().filter(|_| provider == TtsProvider::OpenAI))
                .map(|url| url.trim_end_matches('/').to_string()),
        };

        let defaults = TranslationConfig::default();
        let translation = TranslationConfig {
            model: env("VOICECARD_TRANSLATION_MODEL")
                .or(file.translation.model)
                .unwrap_or(defaults.model),
            max_output_tokens: file
                .translation
                .max_output_tokens
                .unwrap_or(defaults.max_output_tokens),
            base_url: openai_base_url
                .or(file.translation.base_url)
                .map_or(defaults.base_url, |url| url.trim_end_matches('/').to_string()),
        };

        let languages = LanguageConfig {
            source: Language::parse(
                &env("VOICECARD_SOURCE_LANGUAGE")
                    .or(file.languages.source)
                    .unwrap_or_else(|| "it-IT".to_string()),
            )?,
            target: Language::parse(
                &env("VOICECARD_TARGET_LANGUAGE")
                    .or(file.languages.target)
                    .unwrap_or_else(|| "fr-FR".to_string()),
            )?,
        };

        // Keys only come from the environment
        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            elevenlabs: env("ELEVENLABS_API_KEY").filter(|k| !k.is_empty()),
        };

        Ok(Self {
            voice,
            translation,
            languages,
            api_keys,
        })
    }

    /// API key for the configured TTS provider
    #[must_use]
    pub fn tts_api_key(&self) -> Option<&str> {
        match self.voice.provider {
            TtsProvider::OpenAI => self.api_keys.openai.as_deref(),
            TtsProvider::ElevenLabs => self.api_keys.elevenlabs.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::file::VoiceFileConfig;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(ConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.voice.provider, TtsProvider::OpenAI);
        assert_eq!(config.voice.model, "tts-1");
        assert_eq!(config.voice.voice, "alloy");
        assert!((config.voice.speed - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.translation, TranslationConfig::default());
        assert_eq!(config.languages.source.code, "it-IT");
        assert_eq!(config.languages.target.code, "fr-FR");
        assert!(config.tts_api_key().is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigFile {
            voice: VoiceFileConfig {
                voice: Some("nova".to_string()),
                model: Some("tts-1-hd".to_string()),
                ..VoiceFileConfig::default()
            },
            ..ConfigFile::default()
        };

        let config = Config::resolve(
            file,
            env_from(&[
                ("VOICECARD_TTS_VOICE", "shimmer"),
                ("OPENAI_API_KEY", "sk-test"),
                ("VOICECARD_TARGET_LANGUAGE", "ja"),
            ]),
        )
        .unwrap();

        assert_eq!(config.voice.voice, "shimmer");
        assert_eq!(config.voice.model, "tts-1-hd");
        assert_eq!(config.tts_api_key(), Some("sk-test"));
        assert_eq!(config.languages.target.code, "ja-JP");
    }

    #[test]
    fn test_elevenlabs_defaults_and_key() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[
                ("VOICECARD_TTS_PROVIDER", "elevenlabs"),
                ("OPENAI_API_KEY", "sk-test"),
                ("ELEVENLABS_API_KEY", "xi-test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.voice.model, "eleven_monolingual_v1");
        assert_eq!(config.tts_api_key(), Some("xi-test"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("VOICECARD_TTS_SPEED", "fast"),
            ("VOICECARD_TTS_SPEED", "9"),
            ("VOICECARD_TTS_PROVIDER", "festival"),
            ("VOICECARD_SOURCE_LANGUAGE", "klingon"),
        ] {
            let result = Config::resolve(ConfigFile::default(), env_from(&[(key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn test_openai_base_url_covers_speech_and_translation() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[("OPENAI_BASE_URL", "http://proxy.local:8080/v1/")]),
        )
        .unwrap();

        assert_eq!(
            config.voice.base_url.as_deref(),
            Some("http://proxy.local:8080/v1")
        );
        assert_eq!(config.translation.base_url, "http://proxy.local:8080/v1");
    }

    #[test]
    fn test_openai_base_url_ignored_for_elevenlabs_speech() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[
                ("VOICECARD_TTS_PROVIDER", "elevenlabs"),
                ("OPENAI_BASE_URL", "http://proxy.local:8080/v1"),
            ]),
        )
        .unwrap();

        assert!(config.voice.base_url.is_none());
        assert_eq!(config.translation.base_url, "http://proxy.local:8080/v1");
    }

    #[test]
    fn test_load_from_missing_explicit_file_fails() {
        let result = Config::load_from(Some(Path::new("/nonexistent/voicecard.toml")));

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_key_treated_as_missing() {
        let config =
            Config::resolve(ConfigFile::default(), env_from(&[("OPENAI_API_KEY", "")])).unwrap();

        assert!(config.api_keys.openai.is_none());
    }
}
