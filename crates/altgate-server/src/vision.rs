use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

use altgate_core::describe::{DescriptionModel, PreparedImage};
use altgate_core::language::PromptLanguage;

/// Completion length cap. 120 characters of pt-BR text stays well below it.
const MAX_COMPLETION_TOKENS: u32 = 80;

/// OpenAI-compatible chat-completions client for image descriptions.
///
/// The image travels inline as a `data:` URL, so the upstream never needs
/// to reach the caller's site.
#[derive(Clone)]
pub struct OpenAiVision {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVision {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.ai_timeout())
            .build()
            .context("vision client build failed")?;
        Ok(Self {
            client,
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

/// Trimmed text of the first choice. No choices, or only whitespace, is an
/// error: the plugin must never receive an empty alt text.
pub fn first_choice_text(response: ChatResponse) -> Result<String> {
    let Some(choice) = response.choices.into_iter().next() else {
        bail!("completion returned no choices");
    };
    let text = choice.message.content.unwrap_or_default().trim().to_string();
    if text.is_empty() {
        bail!("completion returned an empty description");
    }
    Ok(text)
}

#[async_trait]
impl DescriptionModel for OpenAiVision {
    async fn describe(&self, image: &PreparedImage, language: PromptLanguage) -> Result<String> {
        let instruction = language.instruction();
        let data_url = format!("data:{};base64,{}", image.mime, STANDARD.encode(&image.bytes));
        let request = ChatRequest {
            model: &self.model,
            max_tokens: MAX_COMPLETION_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &instruction,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("vision completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("vision completion error {status}: {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("vision completion response parse failed")?;
        let text = first_choice_text(parsed)?;
        debug!(lang = language.code(), chars = text.chars().count(), "Description generated");
        Ok(text)
    }
}
