//! Single-call model services: policy extraction, intent and sentiment.

use serde_json::Value;

use renewly_core::errors::GatewayError;
use renewly_core::{IntentResult, ParsedPolicy, SentimentResult};

use crate::llm::{LlmGateway, LlmTask};
use crate::prompts::{
    INTENT_PROMPT, INTENT_SCHEMA, POLICY_PARSER_PROMPT, POLICY_SCHEMA, SENTIMENT_PROMPT,
    SENTIMENT_SCHEMA,
};

/// Typed fields plus the untouched model output they came from.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyExtraction {
    pub fields: ParsedPolicy,
    pub raw: Value,
}

#[derive(Clone)]
pub struct PolicyParser {
    gateway: LlmGateway,
}

impl PolicyParser {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    pub async fn parse(&self, text: &str) -> Result<PolicyExtraction, GatewayError> {
        let raw = self
            .gateway
            .complete_json(LlmTask::PolicyParse, POLICY_PARSER_PROMPT, text, &POLICY_SCHEMA)
            .await?;
        let fields = serde_json::from_value(raw.clone()).map_err(|error| {
            GatewayError::Decode(format!("`{}` output: {error}", POLICY_SCHEMA.name))
        })?;
        Ok(PolicyExtraction { fields, raw })
    }
}

#[derive(Clone)]
pub struct IntentClassifier {
    gateway: LlmGateway,
}

impl IntentClassifier {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    pub async fn classify(&self, text: &str) -> Result<IntentResult, GatewayError> {
        self.gateway.complete(LlmTask::Intent, INTENT_PROMPT, text, &INTENT_SCHEMA).await
    }
}

#[derive(Clone)]
pub struct SentimentClassifier {
    gateway: LlmGateway,
}

impl SentimentClassifier {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    pub async fn classify(&self, text: &str) -> Result<SentimentResult, GatewayError> {
        self.gateway.complete(LlmTask::Sentiment, SENTIMENT_PROMPT, text, &SENTIMENT_SCHEMA).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use serde_json::json;

    use renewly_core::errors::GatewayError;
    use renewly_core::{IntentLabel, PolicyNumber, Sentiment};

    use super::{IntentClassifier, PolicyParser, SentimentClassifier};
    use crate::llm::{LlmGateway, LlmTask, ScriptedLlmClient};

    fn gateway(client: ScriptedLlmClient) -> (Arc<ScriptedLlmClient>, LlmGateway) {
        let client = Arc::new(client);
        (client.clone(), LlmGateway::new(client))
    }

    #[tokio::test]
    async fn parser_keeps_policy_number_from_source_text() {
        let (client, gateway) = gateway(ScriptedLlmClient::new().with_response(
            LlmTask::PolicyParse,
            r#"{"policy_number":"MOT-2291-A","customer_name":"Asha Rao","expiry_date":"2026-11-30",
               "premium_amount":12450,"eligible_upsells":["zero_dep"],"coverage_summary":["own damage"]}"#,
        ));
        let parser = PolicyParser::new(gateway);

        let extraction = parser
            .parse("Policy No: MOT-2291-A, insured Asha Rao, expires 30 Nov 2026, premium 12450")
            .await
            .expect("parse");

        assert_eq!(
            extraction.fields.policy_number(),
            Some(PolicyNumber("MOT-2291-A".to_string()))
        );
        assert_eq!(extraction.fields.premium_amount, Some(Decimal::from(12450)));
        assert_eq!(extraction.raw["coverage_summary"], json!(["own damage"]));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].user.contains("MOT-2291-A"));
        assert!(requests[0].system.contains("eligible_upsells"));
        assert_eq!(requests[0].max_tokens, 600);
    }

    #[tokio::test]
    async fn parser_rejects_wrongly_typed_fields() {
        let (_, gateway) = gateway(
            ScriptedLlmClient::new()
                .with_response(LlmTask::PolicyParse, r#"{"premium_amount":"about twelve"}"#),
        );

        let error = PolicyParser::new(gateway).parse("some document").await.expect_err("decode");
        assert!(matches!(error, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn pay_now_message_classifies_as_renew_now() {
        let (client, gateway) = gateway(ScriptedLlmClient::new().with_response(
            LlmTask::Intent,
            r#"{"intent":"renew_now","confidence":0.93,"entities":{"payment_method":"upi"}}"#,
        ));

        let intent = IntentClassifier::new(gateway)
            .classify("I want to pay my premium now")
            .await
            .expect("classify");

        assert_eq!(intent.intent, IntentLabel::RenewNow);
        assert!(intent.intent.is_payment_intent());
        assert_eq!(intent.entities.get("payment_method"), Some(&json!("upi")));
        assert_eq!(client.calls_for(LlmTask::Intent), 1);
    }

    #[tokio::test]
    async fn outrage_classifies_as_negative() {
        let (_, gateway) = gateway(
            ScriptedLlmClient::new()
                .with_response(LlmTask::Sentiment, r#"{"sentiment":"negative","score":0.97}"#),
        );

        let sentiment = SentimentClassifier::new(gateway)
            .classify("This is outrageous, cancel everything")
            .await
            .expect("classify");

        assert_eq!(sentiment.sentiment, Sentiment::Negative);
        assert_eq!(sentiment.score, Some(0.97));
    }

    #[tokio::test]
    async fn gateway_failures_propagate_unchanged() {
        let (_, gateway) = gateway(
            ScriptedLlmClient::new()
                .with_failure(LlmTask::Sentiment, GatewayError::Transport("timed out".to_string())),
        );

        let error = SentimentClassifier::new(gateway).classify("hello").await.expect_err("fails");
        assert_eq!(error, GatewayError::Transport("timed out".to_string()));
    }
}
