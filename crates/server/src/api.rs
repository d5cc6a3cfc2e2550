//! JSON routes.
//!
//! - `POST /v1/policy/parse`                      extract and store policy fields
//! - `GET  /v1/policy/{policy_number}`            stored policy record
//! - `POST /v1/nlp/intent`                        intent classification
//! - `POST /v1/nlp/sentiment`                     sentiment classification
//! - `POST /v1/agent/message`                     one conversational turn
//! - `GET  /v1/agent/sessions/{session_id}/turns` conversation history
//! - `POST /v1/payments/initiate`                 mock payment link
//! - `POST /v1/notify/sms`                        mock SMS delivery

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use renewly_agent::tools::{parse_amount, DeliveryAck, PaymentLink};
use renewly_agent::{AgentError, AgentMessage, AgentReply, AgentRuntime};
use renewly_core::errors::{ApplicationError, InterfaceError, ValidationError};
use renewly_core::{
    ConversationTurn, IntentResult, Language, ParsedPolicy, PolicyNumber, PolicyRecord,
    SentimentResult, SessionId,
};
use renewly_db::DbPool;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::health;

#[derive(Clone)]
pub struct AppState {
    runtime: Arc<AgentRuntime>,
}

pub fn router(runtime: Arc<AgentRuntime>, db_pool: DbPool) -> Router {
    let api = Router::new()
        .route("/v1/policy/parse", post(parse_policy))
        .route("/v1/policy/{policy_number}", get(get_policy))
        .route("/v1/nlp/intent", post(classify_intent))
        .route("/v1/nlp/sentiment", post(classify_sentiment))
        .route("/v1/agent/message", post(agent_message))
        .route("/v1/agent/sessions/{session_id}/turns", get(session_turns))
        .route("/v1/payments/initiate", post(initiate_payment))
        .route("/v1/notify/sms", post(notify_sms))
        .with_state(AppState { runtime });

    api.merge(health::router(db_pool)).layer(TraceLayer::new_for_http())
}

// Errors

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    field: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            info!(
                event_name = "api.request.rejected",
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: self.0.user_message(),
            field: self.0.field().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        Self(InterfaceError::from(value))
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApplicationError::from(value).into()
    }
}

impl From<AgentError> for ApiError {
    fn from(value: AgentError) -> Self {
        ApplicationError::from(value).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ValidationError::invalid("body", value.body_text()).into()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

/// Non-blank string field, trimmed.
fn required(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ValidationError::missing(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty())
}

// Policy

#[derive(Debug, Deserialize)]
pub struct ParsePolicyRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Already-extracted document text; used when `text` is blank.
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParsePolicyResponse {
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: ParsedPolicy,
    pub raw_parse: Value,
}

async fn parse_policy(
    State(state): State<AppState>,
    payload: Result<Json<ParsePolicyRequest>, JsonRejection>,
) -> ApiResult<ParsePolicyResponse> {
    let request = body(payload)?;
    let text = required("text", optional(request.text).or(request.file_url))?;
    let policy_number = optional(request.policy_number).and_then(|raw| PolicyNumber::parse(&raw));

    let outcome = state.runtime.parse_policy(&text, policy_number).await?;
    Ok(Json(ParsePolicyResponse {
        id: outcome.record.map(|record| record.id.0),
        fields: outcome.extraction.fields,
        raw_parse: outcome.extraction.raw,
    }))
}

async fn get_policy(
    State(state): State<AppState>,
    Path(policy_number): Path<String>,
) -> ApiResult<PolicyRecord> {
    let number = PolicyNumber::parse(&policy_number)
        .ok_or_else(|| ValidationError::missing("policy_number"))?;

    match state.runtime.policy(&number).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApplicationError::NotFound(format!("policy `{number}` not found")).into()),
    }
}

// NLP

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

async fn classify_intent(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> ApiResult<IntentResult> {
    let text = required("text", body(payload)?.text)?;
    Ok(Json(state.runtime.classify_intent(&text).await?))
}

async fn classify_sentiment(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> ApiResult<SentimentResult> {
    let text = required("text", body(payload)?.text)?;
    Ok(Json(state.runtime.classify_sentiment(&text).await?))
}

// Agent

#[derive(Debug, Deserialize)]
pub struct AgentMessageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

async fn agent_message(
    State(state): State<AppState>,
    payload: Result<Json<AgentMessageRequest>, JsonRejection>,
) -> ApiResult<AgentReply> {
    let request = body(payload)?;
    let message = required("message", request.message)?;
    let language = match optional(request.language) {
        Some(raw) => Language::parse(&raw)
            .ok_or_else(|| ValidationError::invalid("language", "expected `en` or `hi`"))?,
        None => Language::default(),
    };
    let session_id =
        optional(request.session_id).map(SessionId).unwrap_or_else(SessionId::generate);
    let policy_number =
        optional(request.policy_number).and_then(|raw| PolicyNumber::parse(&raw));

    let reply = state
        .runtime
        .handle_message(AgentMessage { session_id, policy_number, language, message })
        .await?;
    Ok(Json(reply))
}

#[derive(Debug, Serialize)]
pub struct SessionTurnsResponse {
    pub session_id: SessionId,
    pub turns: Vec<ConversationTurn>,
}

async fn session_turns(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionTurnsResponse> {
    let session_id = SessionId(session_id);
    let turns = state.runtime.history(&session_id).await?;
    Ok(Json(SessionTurnsResponse { session_id, turns }))
}

// Side effects

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
}

async fn initiate_payment(
    State(state): State<AppState>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> ApiResult<PaymentLink> {
    let request = body(payload)?;
    let policy_number = required("policy_number", request.policy_number)?;
    let amount = request
        .amount
        .filter(|value| !value.is_null())
        .ok_or_else(|| ValidationError::missing("amount"))?;
    let amount = parse_amount(&amount)
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| ValidationError::invalid("amount", "`amount` must be a positive number"))?;

    let link = state.runtime.initiate_payment(&policy_number, Some(amount));
    info!(
        event_name = "api.payment.initiated",
        policy_number = %policy_number,
        reference = %link.reference,
        "mock payment link issued"
    );
    Ok(Json(link))
}

#[derive(Debug, Deserialize)]
pub struct SmsRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SmsResponse {
    pub delivery_ack: DeliveryAck,
}

async fn notify_sms(
    State(state): State<AppState>,
    payload: Result<Json<SmsRequest>, JsonRejection>,
) -> ApiResult<SmsResponse> {
    let request = body(payload)?;
    let to = required("to", request.to)?;
    let text = required("text", request.text)?;

    let delivery_ack = state.runtime.send_sms(&to, &text);
    info!(
        event_name = "api.sms.sent",
        message_id = %delivery_ack.message_id,
        text_chars = text.len(),
        "mock sms accepted"
    );
    Ok(Json(SmsResponse { delivery_ack }))
}
