//! Two-speaker conversation state
//!
//! Tracks who is talking, in which language, and the text of the original
//! and translated cards. Speech recognition feeds transcripts in; the
//! translation is fetched on demand.

use crate::Result;
use crate::language::Language;
use crate::translate::Translator;

/// One side of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speaker {
    #[default]
    One,
    Two,
}

impl Speaker {
    /// The other speaker
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

/// Conversation between two speakers of different languages
#[derive(Debug, Clone)]
pub struct Conversation {
    languages: [Language; 2],
    current: Speaker,
    transcribed_text: String,
    translated_text: String,
}

impl Conversation {
    /// Start a conversation; speaker one talks first
    #[must_use]
    pub const fn new(speaker_one: Language, speaker_two: Language) -> Self {
        Self {
            languages: [speaker_one, speaker_two],
            current: Speaker::One,
            transcribed_text: String::new(),
            translated_text: String::new(),
        }
    }

    /// Speaker currently talking
    #[must_use]
    pub const fn current_speaker(&self) -> Speaker {
        self.current
    }

    /// Language of `speaker`
    #[must_use]
    pub const fn language(&self, speaker: Speaker) -> Language {
        match speaker {
            Speaker::One => self.languages[0],
            Speaker::Two => self.languages[1],
        }
    }

    /// Language being spoken
    #[must_use]
    pub const fn source_language(&self) -> Language {
        self.language(self.current)
    }

    /// Language being translated into
    #[must_use]
    pub const fn target_language(&self) -> Language {
        self.language(self.current.other())
    }

    /// Hand the turn to the other speaker, clearing both cards
    pub fn toggle_speaker(&mut self) {
        self.current = self.current.other();
        self.transcribed_text.clear();
        self.translated_text.clear();
        tracing::debug!(speaker = ?self.current, "speaker toggled");
    }

    /// Change the language of `speaker`
    pub fn select_language(&mut self, speaker: Speaker, language: Language) {
        let slot = match speaker {
            Speaker::One => &mut self.languages[0],
            Speaker::Two => &mut self.languages[1],
        };
        *slot = language;
        tracing::debug!(?speaker, language = language.code, "language selected");
    }

    /// Latest recognition result; the previous translation no longer applies
    pub fn on_transcript(&mut self, text: impl Into<String>) {
        self.transcribed_text = text.into();
        self.translated_text.clear();
    }

    /// Text for the original card
    #[must_use]
    pub fn transcribed_text(&self) -> &str {
        &self.transcribed_text
    }

    /// Text for the translated card
    #[must_use]
    pub fn translated_text(&self) -> &str {
        &self.translated_text
    }

    /// Translate the transcript into the other speaker's language
    ///
    /// Returns `None` without calling the translator when there is no
    /// transcript yet.
    ///
    /// # Errors
    ///
    /// Returns error if translation fails; the previous translation is kept
    pub async fn translate(&mut self, translator: &dyn Translator) -> Result<Option<&str>> {
        if self.transcribed_text.trim().is_empty() {
            return Ok(None);
        }

        let from = self.source_language();
        let to = self.target_language();

        let translated = translator
            .translate(&self.transcribed_text, from.name, to.name)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, translator = translator.name(), "translation failed");
            })?;

        tracing::info!(from = from.code, to = to.code, "translation received");
        self.translated_text = translated;
        Ok(Some(&self.translated_text))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::Error;

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
            Ok(format!("[{from}->{to}] {text}"))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Err(Error::Translation("OpenAI API error 503".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn italian_french() -> Conversation {
        Conversation::new(
            Language::find("it-IT").unwrap(),
            Language::find("fr-FR").unwrap(),
        )
    }

    #[test]
    fn test_toggle_swaps_languages_and_clears() {
        let mut conversation = italian_french();
        conversation.on_transcript("Buongiorno");

        conversation.toggle_speaker();

        assert_eq!(conversation.current_speaker(), Speaker::Two);
        assert_eq!(conversation.source_language().code, "fr-FR");
        assert_eq!(conversation.target_language().code, "it-IT");
        assert_eq!(conversation.transcribed_text(), "");
    }

    #[test]
    fn test_select_language() {
        let mut conversation = italian_french();

        conversation.select_language(Speaker::Two, Language::find("de").unwrap());

        assert_eq!(conversation.target_language().name, "German");
    }

    #[tokio::test]
    async fn test_translate_uses_speaker_languages() {
        let mut conversation = italian_french();
        conversation.on_transcript("Buongiorno");

        let translated = conversation.translate(&EchoTranslator).await.unwrap();

        assert_eq!(translated, Some("[Italian->French] Buongiorno"));
    }

    #[tokio::test]
    async fn test_translate_blank_is_noop() {
        let mut conversation = italian_french();
        conversation.on_transcript("   ");

        assert_eq!(conversation.translate(&FailingTranslator).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_translation_keeps_previous() {
        let mut conversation = italian_french();
        conversation.on_transcript("Ciao");
        conversation.translate(&EchoTranslator).await.unwrap();

        assert!(conversation.translate(&FailingTranslator).await.is_err());
        assert_eq!(conversation.translated_text(), "[Italian->French] Ciao");
    }

    #[test]
    fn test_new_transcript_clears_translation() {
        let mut conversation = italian_french();
        conversation.on_transcript("Ciao");
        conversation.on_transcript("Ciao a tutti");

        assert_eq!(conversation.translated_text(), "");
    }
}
