use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use renewly_core::config::LlmConfig;
use renewly_core::errors::GatewayError;

use super::{CompletionRequest, LlmClient};

/// `LlmClient` over an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    http: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(GatewayError::MissingCredential)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            n: 1,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|error| GatewayError::Decode(format!("chat completion envelope: {error}")))?;

        completion_text(payload)
    }
}

fn completion_text(payload: ChatResponse) -> Result<String, GatewayError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GatewayError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use renewly_core::config::AppConfig;
    use renewly_core::errors::GatewayError;

    use super::{completion_text, ChatResponse, OpenAiChatClient};
    use crate::llm::{CompletionRequest, LlmTask};

    fn llm_config(api_key: Option<&str>) -> renewly_core::config::LlmConfig {
        let mut config = AppConfig::default().llm;
        config.api_key = api_key.map(|key| key.to_string().into());
        config.base_url = "https://llm.internal.test/v1/".to_string();
        config
    }

    #[test]
    fn missing_api_key_is_a_missing_credential_error() {
        let result = OpenAiChatClient::from_config(&llm_config(None));
        assert!(matches!(result, Err(GatewayError::MissingCredential)));

        let blank = OpenAiChatClient::from_config(&llm_config(Some("  ")));
        assert!(matches!(blank, Err(GatewayError::MissingCredential)));
    }

    #[test]
    fn request_body_carries_model_messages_and_json_mode() {
        let client = OpenAiChatClient::from_config(&llm_config(Some("sk-test"))).expect("client");
        assert_eq!(client.endpoint, "https://llm.internal.test/v1/chat/completions");

        let request = CompletionRequest {
            task: LlmTask::Sentiment,
            system: "classify".to_string(),
            user: "great service".to_string(),
            temperature: 0.0,
            max_tokens: 100,
        };
        let body = serde_json::to_value(client.request_body(&request)).expect("serialize");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0], json!({ "role": "system", "content": "classify" }));
        assert_eq!(body["messages"][1], json!({ "role": "user", "content": "great service" }));
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["n"], 1);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn completion_text_reads_first_choice() {
        let payload: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"sentiment\":\"positive\"}" } }]
        }))
        .expect("decode envelope");

        assert_eq!(completion_text(payload).expect("text"), "{\"sentiment\":\"positive\"}");
    }

    #[test]
    fn completion_without_choices_is_empty() {
        let payload: ChatResponse = serde_json::from_value(json!({ "choices": [] })).expect("decode");
        assert_eq!(completion_text(payload), Err(GatewayError::EmptyResponse));
    }
}
