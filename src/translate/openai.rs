//! `OpenAI` Responses API translator

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Translator;
use crate::config::TranslationConfig;
use crate::{Error, Result};

const INSTRUCTIONS: &str = "You are a professional translation expert. Your task is to \
accurately and naturally translate text between two languages to facilitate clear \
communication between two people who do not understand each other's language. Focus on \
maintaining the original meaning, tone, and context.";

/// Translator backed by the `OpenAI` Responses API
pub struct OpenAiTranslator {
    client: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
    base_url: String,
}

impl OpenAiTranslator {
    /// Create a new translator
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: Option<String>, config: &TranslationConfig) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key required for translation".to_string()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        from_language: &str,
        to_language: &str,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::Translation("no text provided for translation".to_string()));
        }

        let input = build_input(text, from_language, to_language);
        let request = ResponsesRequest {
            model: &self.model,
            instructions: INSTRUCTIONS,
            input: &input,
            max_output_tokens: self.max_output_tokens,
            store: false,
        };

        tracing::debug!(
            model = %self.model,
            from = from_language,
            to = to_language,
            "requesting translation"
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Translation(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Translation(format!("OpenAI API error {status}: {body}")));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|e| Error::Translation(format!("failed to parse OpenAI response: {e}")))?;

        reply
            .output_text()
            .ok_or_else(|| Error::Translation("no translation received from OpenAI".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Prompt sent as the request input
fn build_input(text: &str, from_language: &str, to_language: &str) -> String {
    format!("Translate the following text from {from_language} to {to_language}:\n\n{text}")
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    max_output_tokens: u32,
    store: bool,
}

#[derive(Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesReply {
    /// First non-empty text part, trimmed
    fn output_text(&self) -> Option<String> {
        self.output
            .iter()
            .flat_map(|item| &item.content)
            .filter_map(|part| part.text.as_deref())
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(ToString::to_string)
    }
}
