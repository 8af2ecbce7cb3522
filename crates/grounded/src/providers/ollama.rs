use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OllamaProviderConfig;
use super::utils::{
    chat_completions_url, completion_from_response, create_openai_request_payload,
    send_chat_request,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen2.5";

/// Local models through Ollama's OpenAI-compatible endpoint, no authentication
pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> Result<Self> {
        // Local models can be slow to load on first use
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
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

        let request = self
            .client
            .post(chat_completions_url(&self.config.host))
            .json(&payload);
        completion_from_response(send_chat_request(&self.config.retry, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn _setup_mock_server(response_body: Value) -> (MockServer, OllamaProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OllamaProviderConfig {
            host: mock_server.uri(),
            model: OLLAMA_MODEL.to_string(),
            temperature: Some(0.1),
            max_tokens: None,
            retry: RetryPolicy::none(),
        };

        let provider = OllamaProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello from a local model"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_, provider) = _setup_mock_server(response_body).await;
        let messages = vec![Message::user().with_text("Hello?")];

        let (message, usage) = provider
            .complete("You are a helpful assistant.", &messages, &[])
            .await?;

        assert_eq!(message.text(), "Hello from a local model");
        assert_eq!(usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_error_payload_is_reported() -> Result<()> {
        let (_, provider) = _setup_mock_server(json!({
            "error": {"message": "model \"qwen2.5\" not found, try pulling it first"}
        }))
        .await;

        let err = provider
            .complete("sys", &[Message::user().with_text("Hi")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Completion failed:"));
        assert!(err.to_string().contains("try pulling it first"));
        Ok(())
    }
}
