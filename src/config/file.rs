//! TOML configuration file loading
//!
//! Supports `~/.config/voicecard/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};
use crate::playback::TtsProvider;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Speech synthesis configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Translation configuration
    #[serde(default)]
    pub translation: TranslationFileConfig,

    /// Default conversation languages
    #[serde(default)]
    pub languages: LanguagesFileConfig,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// TTS backend ("openai" or "elevenlabs")
    pub provider: Option<TtsProvider>,

    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub voice: Option<String>,

    /// TTS speed multiplier
    pub speed: Option<f32>,

    /// TTS API base URL, including the version prefix
    pub base_url: Option<String>,
}

/// Translation configuration
#[derive(Debug, Default, Deserialize)]
pub struct TranslationFileConfig {
    pub model: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub base_url: Option<String>,
}

/// Speaker languages
#[derive(Debug, Default, Deserialize)]
pub struct LanguagesFileConfig {
    /// Language of the first speaker (e.g. "it-IT")
    pub source: Option<String>,
    /// Language of the second speaker
    pub target: Option<String>,
}

impl ConfigFile {
    /// Parse a config file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid TOML
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Load the TOML config file from `path`, or the standard path if `None`
///
/// The standard path is optional: if it is missing or can't be parsed,
/// `ConfigFile::default()` is used.
///
/// # Errors
///
/// Returns error if an explicitly given file is missing or invalid
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = path {
        let config = ConfigFile::from_path(path).map_err(|e| {
            Error::Config(format!("failed to load config file {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(ConfigFile::default());
    };

    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    match ConfigFile::from_path(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            Ok(ConfigFile::default())
        }
    }
}

/// Return the config file path: `~/.config/voicecard/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "voicecard", "voicecard")
        .map(|d| d.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[voice]
provider = "elevenlabs"
speed = 1.25

[languages]
source = "en-US"
"#
        )
        .unwrap();

        let config = ConfigFile::from_path(file.path()).unwrap();

        assert_eq!(config.voice.provider, Some(TtsProvider::ElevenLabs));
        assert_eq!(config.voice.speed, Some(1.25));
        assert!(config.voice.model.is_none());
        assert_eq!(config.languages.source.as_deref(), Some("en-US"));
        assert!(config.translation.model.is_none());
    }

    #[test]
    fn test_explicit_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "voice = [[[").unwrap();

        let result = load_config_file(Some(file.path()));

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = load_config_file(Some(Path::new("/nonexistent/voicecard.toml")));

        assert!(
            matches!(result, Err(Error::Config(msg)) if msg.contains("/nonexistent/voicecard.toml"))
        );
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[voice]\nvoice = \"nova\"").unwrap();

        let config = load_config_file(Some(file.path())).unwrap();

        assert_eq!(config.voice.voice.as_deref(), Some("nova"));
    }
}
