//! Fixed instruction texts and output schemas for every model call.

use serde::Serialize;
use tera::{Context, Tera};

use crate::llm::{OutputSchema, SchemaField};

pub const POLICY_PARSER_PROMPT: &str = "You are a careful insurance document parser. \
The user message is raw text extracted from a policy document, or a description of one. \
Extract the requested fields. Use null, or an empty array, for anything the text does not state. \
Dates use YYYY-MM-DD. Amounts are plain numbers without currency symbols.";

pub const INTENT_PROMPT: &str = "You are a compact natural-language-understanding assistant \
for an insurance renewal desk. Classify the customer's message into exactly one intent label \
and extract any slots it mentions (policy_number, followup_date, preferred_channel, language, \
upsell_choice, payment_method, contact).";

pub const SENTIMENT_PROMPT: &str = "You are a sentiment classifier. The user message is a \
short customer utterance. Classify its overall sentiment.";

pub const AGENT_POLICY_PROMPT: &str = "You are an insurance renewal and upsell virtual agent. \
Behaviour rules:
1. Confirm the customer's identity (customer_name and policy_number) if it is not confirmed yet.
2. If the expiry date is within 30 days, proactively offer renewal and state the premium and no-claim bonus.
3. Propose short, simple add-ons from eligible_upsells only when sentiment is positive and the customer is willing.
4. If the customer asks to pay, choose the initiate_payment action and put the amount in action_payload.
5. Keep replies short and empathetic, in the customer's preferred language (en or hi, default en).
6. Respect opt-outs: if the customer says stop or unsubscribe, confirm the opt-out and choose none.
7. If information needed to proceed is missing, ask for the specific missing field.";

pub const POLICY_SCHEMA: OutputSchema = OutputSchema {
    name: "policy_parse",
    fields: &[
        SchemaField { name: "policy_number", description: "string or null" },
        SchemaField { name: "policy_type", description: "string or null" },
        SchemaField { name: "insurer_name", description: "string or null" },
        SchemaField { name: "customer_name", description: "string or null" },
        SchemaField { name: "customer_contact", description: "string or null, E.164 if possible" },
        SchemaField { name: "expiry_date", description: "YYYY-MM-DD or null" },
        SchemaField { name: "premium_amount", description: "number or null" },
        SchemaField { name: "no_claim_bonus_percent", description: "number between 0 and 100 or null" },
        SchemaField {
            name: "asset_details",
            description: "object with make, model, year, registration_number (each may be null)",
        },
        SchemaField { name: "coverage_summary", description: "array of strings" },
        SchemaField { name: "eligible_upsells", description: "array of strings" },
        SchemaField { name: "last_payment_date", description: "YYYY-MM-DD or null" },
    ],
};

pub const INTENT_SCHEMA: OutputSchema = OutputSchema {
    name: "intent",
    fields: &[
        SchemaField {
            name: "intent",
            description: "one of renew_now, renew_later_date, needs_discount, needs_human_agent, \
modify_policy, interested_in_upsell, switching_to_competitor, not_interested, callback_request, \
out_of_scope",
        },
        SchemaField { name: "confidence", description: "number from 0.0 to 1.0" },
        SchemaField { name: "entities", description: "object mapping slot name to extracted value" },
    ],
};

pub const SENTIMENT_SCHEMA: OutputSchema = OutputSchema {
    name: "sentiment",
    fields: &[
        SchemaField { name: "sentiment", description: "one of positive, neutral, negative" },
        SchemaField { name: "score", description: "confidence from 0.0 to 1.0" },
    ],
};

pub const DECISION_SCHEMA: OutputSchema = OutputSchema {
    name: "decision",
    fields: &[
        SchemaField { name: "reply", description: "string, the text to send to the customer" },
        SchemaField { name: "language", description: "en or hi" },
        SchemaField {
            name: "action",
            description: "one of ask_for_missing_info, offer_renewal, initiate_payment, \
upsell_offer, schedule_callback, escalate_human, none",
        },
        SchemaField {
            name: "action_payload",
            description: "object with extra instructions (amount, followup_date, missing_field) or null",
        },
    ],
};

const DECISION_TEMPLATE_NAME: &str = "decision_prompt.txt";

const DECISION_TEMPLATE: &str = "Customer message: {{ message }}
Policy context: {{ policy_context }}
Intent: {{ intent }}
Sentiment: {{ sentiment }}
Preferred language: {{ language }}

Recent conversation (oldest first):
{% for turn in history %}- {{ turn.role }}: {{ turn.message }}
{% else %}(no earlier turns)
{% endfor %}
Following the behaviour rules, decide the next reply and action. \
When offering renewal include the premium and expiry date. \
When asking for missing information name the missing field.";

#[derive(Clone, Debug, Serialize)]
pub struct HistoryLine {
    pub role: &'static str,
    pub message: String,
}

/// Everything the decision prompt interpolates. JSON-valued parts are
/// pre-serialized.
#[derive(Clone, Debug, Serialize)]
pub struct DecisionPromptInput {
    pub message: String,
    pub policy_context: String,
    pub intent: String,
    pub sentiment: String,
    pub language: &'static str,
    pub history: Vec<HistoryLine>,
}

pub struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(DECISION_TEMPLATE_NAME, DECISION_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn decision(&self, input: &DecisionPromptInput) -> Result<String, tera::Error> {
        let context = Context::from_serialize(input)?;
        self.tera.render(DECISION_TEMPLATE_NAME, &context)
    }
}
