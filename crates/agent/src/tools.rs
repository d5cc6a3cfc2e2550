//! Mock payment and SMS handlers. No external calls are made; outputs are
//! derived from the inputs so repeated requests get repeated answers.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEFAULT_PAYMENT_BASE_URL: &str = "https://mockpay.example";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub reference: String,
    pub payment_link: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAck {
    pub status: String,
    pub message_id: String,
}

#[derive(Clone, Debug)]
pub struct MockPaymentHandler {
    base_url: String,
}

impl Default for MockPaymentHandler {
    fn default() -> Self {
        Self::new(DEFAULT_PAYMENT_BASE_URL)
    }
}

impl MockPaymentHandler {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn initiate(&self, policy_number: &str, amount: Option<Decimal>) -> PaymentLink {
        let amount_label = amount.map(|value| value.normalize().to_string()).unwrap_or_default();
        let reference = format!("pay_{}", short_digest(&[policy_number, &amount_label]));
        let payment_link = format!("{}/pay/{reference}", self.base_url);
        PaymentLink { reference, payment_link, amount }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockNotificationHandler;

impl MockNotificationHandler {
    pub fn send_sms(&self, to: &str, text: &str) -> DeliveryAck {
        DeliveryAck {
            status: "sent".to_string(),
            message_id: format!("msg_{}", short_digest(&[to, text])),
        }
    }
}

/// Reads a currency amount given as a JSON number or numeric string.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            let raw = number.to_string();
            Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
        }
        Value::String(raw) => Decimal::from_str(raw.trim()).ok(),
        _ => None,
    }
}

/// First 8 hex chars of SHA-256 over the `|`-joined parts.
fn short_digest(parts: &[&str]) -> String {
    let digest = Sha256::digest(parts.join("|").as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}
