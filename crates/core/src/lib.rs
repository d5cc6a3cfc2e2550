pub mod config;
pub mod domain;
pub mod errors;

pub use domain::analysis::{
    AgentAction, AgentDecision, IntentLabel, IntentResult, Language, Sentiment, SentimentResult,
};
pub use domain::conversation::{ConversationTurn, SessionId, TurnId, TurnRole};
pub use domain::policy::{ParsedPolicy, PolicyId, PolicyNumber, PolicyRecord};
pub use errors::{ApplicationError, GatewayError, InterfaceError, ValidationError};
