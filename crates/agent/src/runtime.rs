use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use renewly_core::config::AgentConfig;
use renewly_core::errors::{ApplicationError, GatewayError};
use renewly_core::{
    AgentAction, AgentDecision, ConversationTurn, IntentResult, Language, PolicyNumber,
    PolicyRecord, SentimentResult, SessionId, TurnRole,
};
use renewly_db::repositories::{ConversationRepository, PolicyRepository, RepositoryError};

use crate::analysis::{IntentClassifier, PolicyExtraction, PolicyParser, SentimentClassifier};
use crate::llm::{LlmGateway, LlmTask};
use crate::prompts::{
    DecisionPromptInput, HistoryLine, PromptRenderer, AGENT_POLICY_PROMPT, DECISION_SCHEMA,
};
use crate::tools::{
    parse_amount, DeliveryAck, MockNotificationHandler, MockPaymentHandler, PaymentLink,
    DEFAULT_PAYMENT_BASE_URL,
};

/// Stored fields that never go into the decision prompt.
const PROMPT_EXCLUDED_FIELDS: [&str; 4] = ["id", "raw_parse", "created_at", "updated_at"];

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("store failure: {0}")]
    Store(#[from] RepositoryError),
    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] tera::Error),
    #[error("prompt context encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<AgentError> for ApplicationError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::Gateway(error) => Self::Gateway(error),
            AgentError::Store(error) => Self::Persistence(error.to_string()),
            AgentError::Prompt(error) => Self::Internal(error.to_string()),
            AgentError::Encode(error) => Self::Internal(error.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    pub history_limit: u32,
    pub payment_base_url: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { history_limit: 10, payment_base_url: DEFAULT_PAYMENT_BASE_URL.to_string() }
    }
}

impl From<&AgentConfig> for RuntimeSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            payment_base_url: config.payment_base_url.clone(),
        }
    }
}

/// One inbound customer message.
#[derive(Clone, Debug)]
pub struct AgentMessage {
    pub session_id: SessionId,
    pub policy_number: Option<PolicyNumber>,
    pub language: Language,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentReply {
    pub session_id: SessionId,
    pub reply: String,
    pub language: Language,
    pub action: AgentAction,
    pub action_payload: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicyParseOutcome {
    pub extraction: PolicyExtraction,
    /// Present when a policy number was known and the record was stored.
    pub record: Option<PolicyRecord>,
}

pub struct AgentRuntime {
    gateway: LlmGateway,
    parser: PolicyParser,
    intents: IntentClassifier,
    sentiments: SentimentClassifier,
    prompts: PromptRenderer,
    payments: MockPaymentHandler,
    notifications: MockNotificationHandler,
    policies: Arc<dyn PolicyRepository>,
    conversations: Arc<dyn ConversationRepository>,
    settings: RuntimeSettings,
}

impl AgentRuntime {
    pub fn new(
        gateway: LlmGateway,
        policies: Arc<dyn PolicyRepository>,
        conversations: Arc<dyn ConversationRepository>,
        settings: RuntimeSettings,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            parser: PolicyParser::new(gateway.clone()),
            intents: IntentClassifier::new(gateway.clone()),
            sentiments: SentimentClassifier::new(gateway.clone()),
            prompts: PromptRenderer::new()?,
            payments: MockPaymentHandler::new(settings.payment_base_url.clone()),
            notifications: MockNotificationHandler,
            gateway,
            policies,
            conversations,
            settings,
        })
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Runs one conversational turn. The user turn is stored first and stays
    /// stored even when a later step fails.
    pub async fn handle_message(&self, message: AgentMessage) -> Result<AgentReply, AgentError> {
        let started = Instant::now();
        let session_id = message.session_id.clone();

        let outcome = self.run_turn(message).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(reply) => info!(
                event_name = "agent.message.completed",
                session_id = %session_id,
                action = reply.action.as_str(),
                reply_chars = reply.reply.len(),
                elapsed_ms,
                "agent turn completed"
            ),
            Err(error) => warn!(
                event_name = "agent.message.failed",
                session_id = %session_id,
                elapsed_ms,
                error = %error,
                "agent turn failed"
            ),
        }

        outcome
    }

    async fn run_turn(&self, message: AgentMessage) -> Result<AgentReply, AgentError> {
        let AgentMessage { session_id, policy_number, language, message } = message;
        info!(
            event_name = "agent.message.received",
            session_id = %session_id,
            message_chars = message.len(),
            has_policy_number = policy_number.is_some(),
            "agent turn received"
        );

        // Earlier turns only; the current message is rendered on its own.
        let history = self
            .conversations
            .recent_turns(&session_id, self.settings.history_limit)
            .await?
            .into_iter()
            .map(|turn| HistoryLine { role: turn.role.as_str(), message: turn.message })
            .collect();

        self.conversations
            .append_turn(ConversationTurn::new(session_id.clone(), TurnRole::User, &message))
            .await?;

        let policy = match &policy_number {
            Some(number) => self.policies.get_policy(number).await?,
            None => None,
        };

        let intent = self.intents.classify(&message).await?;
        let sentiment = self.sentiments.classify(&message).await?;

        let prompt = self.prompts.decision(&DecisionPromptInput {
            message: message.clone(),
            policy_context: policy_context(policy.as_ref())?,
            intent: serde_json::to_string(&intent)?,
            sentiment: serde_json::to_string(&sentiment)?,
            language: language.as_str(),
            history,
        })?;

        let mut decision: AgentDecision = self
            .gateway
            .complete(LlmTask::Decision, AGENT_POLICY_PROMPT, &prompt, &DECISION_SCHEMA)
            .await?;

        if decision.action == AgentAction::InitiatePayment {
            let number = policy_number
                .as_ref()
                .or(policy.as_ref().map(|record| &record.policy_number))
                .map(PolicyNumber::as_str)
                .unwrap_or_default();
            let amount = payload_amount(&decision.action_payload)
                .or(policy.as_ref().and_then(|record| record.premium_amount));
            let link = self.payments.initiate(number, amount);
            merge_payment(&mut decision.action_payload, link);
        }

        self.conversations
            .append_turn(ConversationTurn::new(session_id.clone(), TurnRole::Agent, &decision.reply))
            .await?;

        Ok(AgentReply {
            session_id,
            reply: decision.reply,
            language: decision.language.unwrap_or(language),
            action: decision.action,
            action_payload: decision.action_payload,
        })
    }

    /// Extracts policy fields and stores them when a policy number is known.
    /// An explicit `policy_number` wins over the extracted one.
    pub async fn parse_policy(
        &self,
        text: &str,
        policy_number: Option<PolicyNumber>,
    ) -> Result<PolicyParseOutcome, AgentError> {
        let mut extraction = self.parser.parse(text).await?;
        if let Some(number) = &policy_number {
            extraction.fields.policy_number = Some(number.as_str().to_string());
        }

        let record = match extraction.fields.policy_number() {
            Some(number) => {
                let record = extraction.fields.clone().into_record(
                    number,
                    extraction.raw.clone(),
                    Utc::now(),
                );
                let stored = self.policies.save_policy(record).await?;
                info!(
                    event_name = "agent.policy.stored",
                    policy_number = %stored.policy_number,
                    "policy parse stored"
                );
                Some(stored)
            }
            None => {
                info!(
                    event_name = "agent.policy.unkeyed",
                    text_chars = text.len(),
                    "policy parse had no policy number; not stored"
                );
                None
            }
        };

        Ok(PolicyParseOutcome { extraction, record })
    }

    pub async fn classify_intent(&self, text: &str) -> Result<IntentResult, AgentError> {
        Ok(self.intents.classify(text).await?)
    }

    pub async fn classify_sentiment(&self, text: &str) -> Result<SentimentResult, AgentError> {
        Ok(self.sentiments.classify(text).await?)
    }

    pub async fn policy(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyRecord>, AgentError> {
        Ok(self.policies.get_policy(policy_number).await?)
    }

    pub async fn history(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ConversationTurn>, AgentError> {
        Ok(self.conversations.get_turns(session_id).await?)
    }

    pub fn initiate_payment(&self, policy_number: &str, amount: Option<Decimal>) -> PaymentLink {
        self.payments.initiate(policy_number, amount)
    }

    pub fn send_sms(&self, to: &str, text: &str) -> DeliveryAck {
        self.notifications.send_sms(to, text)
    }
}

fn policy_context(policy: Option<&PolicyRecord>) -> Result<String, serde_json::Error> {
    let Some(policy) = policy else {
        return Ok("{}".to_string());
    };

    let mut value = serde_json::to_value(policy)?;
    if let Some(fields) = value.as_object_mut() {
        for excluded in PROMPT_EXCLUDED_FIELDS {
            fields.remove(excluded);
        }
    }
    Ok(value.to_string())
}

fn payload_amount(payload: &Map<String, Value>) -> Option<Decimal> {
    payload.get("amount").and_then(parse_amount)
}

fn merge_payment(payload: &mut Map<String, Value>, link: PaymentLink) {
    payload.insert("payment_link".to_string(), json!(link.payment_link));
    payload.insert("reference".to_string(), json!(link.reference));
    payload.insert("amount".to_string(), json!(link.amount.and_then(|amount| amount.to_f64())));
}
