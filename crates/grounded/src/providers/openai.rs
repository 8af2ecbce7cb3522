use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    chat_completions_url, completion_from_response, create_openai_request_payload,
    send_chat_request,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";
/// Groq serves the same chat completions API under this prefix
pub const GROQ_HOST: &str = "https://api.groq.com/openai";
pub const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Client for any bearer-authenticated OpenAI-compatible chat completions API
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let payload = create_openai_request_payload(
            &self.config.model,
            system,
            messages,
            tools,
            self.config.temperature,
            self.config.max_tokens,
        )?;

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            "requesting completion"
        );
        let request = self
            .client
            .post(chat_completions_url(&self.config.host))
            .bearer_auth(&self.config.api_key)
            .json(&payload);
        let response = send_chat_request(&self.config.retry, request).await?;

        completion_from_response(response)
    }
}
