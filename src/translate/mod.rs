//! Text translation between the two speakers' languages

mod openai;

pub use openai::OpenAiTranslator;

use async_trait::async_trait;

use crate::Result;

/// Translates text from one language to another
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `from_language` to `to_language`
    ///
    /// Languages are given by English name (e.g. "Italian").
    ///
    /// # Errors
    ///
    /// Returns error if the text is blank or the remote call fails
    async fn translate(
        &self,
        text: &str,
        from_language: &str,
        to_language: &str,
    ) -> Result<String>;

    /// Translator name for logging
    fn name(&self) -> &'static str;
}
