//! Renewal agent runtime.
//!
//! Every judgement here comes from the external model: policy extraction,
//! intent, sentiment and the next-action decision. This crate owns the
//! prompts, the typed gateway to the model, and the orchestration of a
//! conversational turn around the stores in `renewly-db`.
//!
//! - [`llm`]: the `LlmClient` seam, the OpenAI-compatible client and a scripted fake.
//! - [`analysis`]: one-call services for policy parsing, intent and sentiment.
//! - [`runtime`]: `AgentRuntime`, which runs a full turn and logs it.
//! - [`tools`]: mock payment-link and SMS handlers.

pub mod analysis;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod tools;

pub use runtime::{
    AgentError, AgentMessage, AgentReply, AgentRuntime, PolicyParseOutcome, RuntimeSettings,
};
