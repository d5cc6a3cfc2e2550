use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::null_as_default;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub String);

impl PolicyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyNumber(pub String);

impl PolicyNumber {
    /// Trims surrounding whitespace; blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PolicyNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields the extraction prompt asks the model for. Every field may be
/// absent or `null` in the model output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPolicy {
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub policy_type: Option<String>,
    #[serde(default)]
    pub insurer_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_contact: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub premium_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub no_claim_bonus_percent: Option<Decimal>,
    #[serde(default, alias = "eligible_upsell", deserialize_with = "null_as_default")]
    pub eligible_upsells: Vec<String>,
}

impl ParsedPolicy {
    pub fn policy_number(&self) -> Option<PolicyNumber> {
        self.policy_number.as_deref().and_then(PolicyNumber::parse)
    }

    pub fn into_record(
        self,
        policy_number: PolicyNumber,
        raw_parse: Value,
        now: DateTime<Utc>,
    ) -> PolicyRecord {
        PolicyRecord {
            id: PolicyId::generate(),
            policy_number,
            customer_name: self.customer_name,
            customer_contact: self.customer_contact,
            policy_type: self.policy_type,
            insurer_name: self.insurer_name,
            expiry_date: self.expiry_date,
            premium_amount: self.premium_amount,
            no_claim_bonus_percent: self.no_claim_bonus_percent,
            eligible_upsells: self.eligible_upsells,
            raw_parse,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: PolicyId,
    pub policy_number: PolicyNumber,
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub policy_type: Option<String>,
    pub insurer_name: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub premium_amount: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub no_claim_bonus_percent: Option<Decimal>,
    pub eligible_upsells: Vec<String>,
    pub raw_parse: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
