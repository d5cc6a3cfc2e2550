//! Narrow seam to the external model: prompt in, typed JSON out.

pub mod openai;
pub mod scripted;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use renewly_core::errors::GatewayError;

pub use openai::OpenAiChatClient;
pub use scripted::ScriptedLlmClient;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LlmTask {
    PolicyParse,
    Intent,
    Sentiment,
    Decision,
}

impl LlmTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyParse => "policy_parse",
            Self::Intent => "intent",
            Self::Sentiment => "sentiment",
            Self::Decision => "decision",
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            Self::PolicyParse => 600,
            Self::Intent => 200,
            Self::Sentiment => 100,
            Self::Decision => 400,
        }
    }
}

/// One chat completion: a system message and a user message.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub task: LlmTask,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GatewayError>;
}

#[derive(Clone, Copy, Debug)]
pub struct SchemaField {
    pub name: &'static str,
    pub description: &'static str,
}

/// Declared output shape, rendered into the system prompt.
#[derive(Clone, Copy, Debug)]
pub struct OutputSchema {
    pub name: &'static str,
    pub fields: &'static [SchemaField],
}

impl OutputSchema {
    pub fn render(&self) -> String {
        let mut rendered = String::from(
            "Respond with a single JSON object and nothing else. It must have exactly these keys:\n",
        );
        for field in self.fields {
            rendered.push_str(&format!("- {}: {}\n", field.name, field.description));
        }
        rendered
    }
}

#[derive(Clone)]
pub struct LlmGateway {
    client: Arc<dyn LlmClient>,
}

impl LlmGateway {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Calls the model once and decodes its answer into `T`.
    pub async fn complete<T>(
        &self,
        task: LlmTask,
        system_prompt: &str,
        user_text: &str,
        schema: &OutputSchema,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let value = self.complete_json(task, system_prompt, user_text, schema).await?;
        serde_json::from_value(value).map_err(|error| {
            GatewayError::Decode(format!("`{}` output: {error}", schema.name))
        })
    }

    /// Like [`LlmGateway::complete`], but returns the raw JSON object.
    pub async fn complete_json(
        &self,
        task: LlmTask,
        system_prompt: &str,
        user_text: &str,
        schema: &OutputSchema,
    ) -> Result<Value, GatewayError> {
        let request = CompletionRequest {
            task,
            system: format!("{}\n\n{}", system_prompt.trim(), schema.render()),
            user: user_text.to_string(),
            temperature: 0.0,
            max_tokens: task.max_tokens(),
        };

        let started = Instant::now();
        let outcome = self.client.complete(&request).await.and_then(|text| parse_object(&text));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(
                event_name = "llm.request.completed",
                task = task.as_str(),
                elapsed_ms,
                prompt_chars = request.user.len(),
                "llm call completed"
            ),
            Err(error) => warn!(
                event_name = "llm.request.failed",
                task = task.as_str(),
                elapsed_ms,
                error = %error,
                "llm call failed"
            ),
        }

        outcome
    }
}

fn parse_object(text: &str) -> Result<Value, GatewayError> {
    let json = extract_json(text);
    if json.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(json)
        .map_err(|error| GatewayError::Decode(format!("response is not valid json: {error}")))?;
    if !value.is_object() {
        return Err(GatewayError::Decode("response is not a json object".to_string()));
    }
    Ok(value)
}

/// Strips a surrounding markdown code fence, if any.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"));

    unfenced.map(str::trim).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;

    use renewly_core::errors::GatewayError;

    use super::{extract_json, LlmGateway, LlmTask, OutputSchema, ScriptedLlmClient, SchemaField};

    const SCHEMA: OutputSchema = OutputSchema {
        name: "probe",
        fields: &[SchemaField { name: "answer", description: "string" }],
    };

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        answer: String,
    }

    #[test]
    fn extract_json_strips_code_fences() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn schema_render_lists_every_field() {
        let rendered = SCHEMA.render();
        assert!(rendered.contains("- answer: string"));
    }

    #[tokio::test]
    async fn complete_decodes_declared_shape_and_sends_schema() {
        let client = Arc::new(
            ScriptedLlmClient::new().with_response(LlmTask::Intent, "```json\n{\"answer\":\"yes\"}\n```"),
        );
        let gateway = LlmGateway::new(client.clone());

        let probe: Probe =
            gateway.complete(LlmTask::Intent, "Be brief.", "hello", &SCHEMA).await.expect("decode");
        assert_eq!(probe, Probe { answer: "yes".to_string() });

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system.starts_with("Be brief."));
        assert!(requests[0].system.contains("- answer: string"));
        assert_eq!(requests[0].user, "hello");
        assert_eq!(requests[0].max_tokens, 200);
    }

    #[tokio::test]
    async fn prose_output_is_a_decode_error() {
        let client =
            Arc::new(ScriptedLlmClient::new().with_response(LlmTask::Intent, "Sure! The answer is yes."));
        let gateway = LlmGateway::new(client);

        let result: Result<Probe, _> =
            gateway.complete(LlmTask::Intent, "Be brief.", "hello", &SCHEMA).await;
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_field_is_a_decode_error() {
        let client =
            Arc::new(ScriptedLlmClient::new().with_response(LlmTask::Intent, "{\"other\":1}"));
        let gateway = LlmGateway::new(client);

        let result: Result<Probe, _> =
            gateway.complete(LlmTask::Intent, "Be brief.", "hello", &SCHEMA).await;
        assert!(matches!(result, Err(GatewayError::Decode(message)) if message.contains("probe")));
    }

    #[tokio::test]
    async fn empty_completion_is_reported() {
        let client = Arc::new(ScriptedLlmClient::new().with_response(LlmTask::Intent, "   "));
        let gateway = LlmGateway::new(client);

        let result = gateway.complete_json(LlmTask::Intent, "Be brief.", "hello", &SCHEMA).await;
        assert_eq!(result, Err(GatewayError::EmptyResponse));
    }

    #[tokio::test]
    async fn client_failure_propagates_unchanged() {
        let gateway = LlmGateway::new(Arc::new(ScriptedLlmClient::new()));

        let result = gateway.complete_json(LlmTask::Sentiment, "Be brief.", "hello", &SCHEMA).await;
        assert!(matches!(result, Err(GatewayError::Status { status: 503, .. })));
    }
}
