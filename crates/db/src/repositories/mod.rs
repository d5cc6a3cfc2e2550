use async_trait::async_trait;
use thiserror::Error;

use renewly_core::domain::conversation::{ConversationTurn, SessionId};
use renewly_core::domain::policy::{PolicyNumber, PolicyRecord};

pub mod conversation;
pub mod memory;
pub mod policy;

pub use conversation::SqlConversationRepository;
pub use memory::{InMemoryConversationRepository, InMemoryPolicyRepository};
pub use policy::SqlPolicyRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Upserts by policy number and returns the stored row. A re-parse keeps
    /// the original `id` and `created_at`.
    async fn save_policy(&self, record: PolicyRecord) -> Result<PolicyRecord, RepositoryError>;

    async fn get_policy(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyRecord>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn append_turn(&self, turn: ConversationTurn) -> Result<(), RepositoryError>;

    /// All turns of a session, oldest first.
    async fn get_turns(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ConversationTurn>, RepositoryError>;

    /// The newest `limit` turns of a session, oldest first.
    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError>;
}
