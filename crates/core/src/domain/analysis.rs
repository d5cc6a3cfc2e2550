//! Typed shapes of the model's classification and decision outputs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::null_as_default;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    RenewNow,
    RenewLaterDate,
    NeedsDiscount,
    NeedsHumanAgent,
    ModifyPolicy,
    InterestedInUpsell,
    SwitchingToCompetitor,
    NotInterested,
    CallbackRequest,
    OutOfScope,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 10] = [
        Self::RenewNow,
        Self::RenewLaterDate,
        Self::NeedsDiscount,
        Self::NeedsHumanAgent,
        Self::ModifyPolicy,
        Self::InterestedInUpsell,
        Self::SwitchingToCompetitor,
        Self::NotInterested,
        Self::CallbackRequest,
        Self::OutOfScope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RenewNow => "renew_now",
            Self::RenewLaterDate => "renew_later_date",
            Self::NeedsDiscount => "needs_discount",
            Self::NeedsHumanAgent => "needs_human_agent",
            Self::ModifyPolicy => "modify_policy",
            Self::InterestedInUpsell => "interested_in_upsell",
            Self::SwitchingToCompetitor => "switching_to_competitor",
            Self::NotInterested => "not_interested",
            Self::CallbackRequest => "callback_request",
            Self::OutOfScope => "out_of_scope",
        }
    }

    /// The customer wants to pay or renew right away.
    pub fn is_payment_intent(&self) -> bool {
        matches!(self, Self::RenewNow)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: IntentLabel,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    AskForMissingInfo,
    OfferRenewal,
    InitiatePayment,
    UpsellOffer,
    ScheduleCallback,
    EscalateHuman,
    #[default]
    None,
}

impl AgentAction {
    pub const ALL: [AgentAction; 7] = [
        Self::AskForMissingInfo,
        Self::OfferRenewal,
        Self::InitiatePayment,
        Self::UpsellOffer,
        Self::ScheduleCallback,
        Self::EscalateHuman,
        Self::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskForMissingInfo => "ask_for_missing_info",
            Self::OfferRenewal => "offer_renewal",
            Self::InitiatePayment => "initiate_payment",
            Self::UpsellOffer => "upsell_offer",
            Self::ScheduleCallback => "schedule_callback",
            Self::EscalateHuman => "escalate_human",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en", alias = "english", alias = "English")]
    En,
    #[serde(rename = "hi", alias = "hindi", alias = "Hindi")]
    Hi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::En),
            "hi" | "hindi" => Some(Self::Hi),
            _ => None,
        }
    }
}

/// The decision model's answer for one inbound message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    pub reply: String,
    /// `None` when the model leaves it out; callers keep the requested language.
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: AgentAction,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action_payload: Map<String, Value>,
}
