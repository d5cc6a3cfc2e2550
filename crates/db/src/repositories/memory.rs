use std::collections::HashMap;

use tokio::sync::RwLock;

use renewly_core::domain::conversation::{ConversationTurn, SessionId};
use renewly_core::domain::policy::{PolicyNumber, PolicyRecord};

use super::{ConversationRepository, PolicyRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryPolicyRepository {
    policies: RwLock<HashMap<String, PolicyRecord>>,
}

#[async_trait::async_trait]
impl PolicyRepository for InMemoryPolicyRepository {
    async fn save_policy(&self, record: PolicyRecord) -> Result<PolicyRecord, RepositoryError> {
        let mut policies = self.policies.write().await;
        let stored = match policies.get(&record.policy_number.0) {
            Some(existing) => PolicyRecord {
                id: existing.id.clone(),
                created_at: existing.created_at,
                ..record
            },
            None => record,
        };
        policies.insert(stored.policy_number.0.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_policy(
        &self,
        policy_number: &PolicyNumber,
    ) -> Result<Option<PolicyRecord>, RepositoryError> {
        let policies = self.policies.read().await;
        Ok(policies.get(&policy_number.0).cloned())
    }
}

/// Keeps turns in insertion order, which is also timestamp order for turns
/// created through `ConversationTurn::new`.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    turns: RwLock<Vec<ConversationTurn>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn append_turn(&self, turn: ConversationTurn) -> Result<(), RepositoryError> {
        let mut turns = self.turns.write().await;
        turns.push(turn);
        Ok(())
    }

    async fn get_turns(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let turns = self.turns.read().await;
        let mut session_turns: Vec<ConversationTurn> =
            turns.iter().filter(|turn| &turn.session_id == session_id).cloned().collect();
        session_turns.sort_by_key(|turn| turn.created_at);
        Ok(session_turns)
    }

    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let mut session_turns = self.get_turns(session_id).await?;
        let keep = usize::try_from(limit).unwrap_or(usize::MAX);
        let skip = session_turns.len().saturating_sub(keep);
        Ok(session_turns.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use renewly_core::domain::conversation::{ConversationTurn, SessionId, TurnRole};
    use renewly_core::domain::policy::{ParsedPolicy, PolicyNumber};

    use super::{InMemoryConversationRepository, InMemoryPolicyRepository};
    use crate::repositories::{ConversationRepository, PolicyRepository};

    #[tokio::test]
    async fn in_memory_policy_upsert_keeps_first_identity() {
        let repo = InMemoryPolicyRepository::default();
        let number = PolicyNumber("P-MEM-1".to_string());

        let first = ParsedPolicy { customer_name: Some("A".to_string()), ..Default::default() }
            .into_record(number.clone(), json!({}), Utc::now());
        let second = ParsedPolicy { customer_name: Some("B".to_string()), ..Default::default() }
            .into_record(number.clone(), json!({}), Utc::now());

        let first_stored = repo.save_policy(first).await.expect("save first");
        let second_stored = repo.save_policy(second).await.expect("save second");

        assert_eq!(second_stored.id, first_stored.id);
        let found = repo.get_policy(&number).await.expect("get").expect("present");
        assert_eq!(found.customer_name.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn in_memory_recent_turns_respects_limit() {
        let repo = InMemoryConversationRepository::default();
        let session = SessionId("S-MEM".to_string());
        for message in ["one", "two", "three"] {
            repo.append_turn(ConversationTurn::new(session.clone(), TurnRole::User, message))
                .await
                .expect("append");
        }

        let recent = repo.recent_turns(&session, 2).await.expect("recent");
        let messages: Vec<&str> = recent.iter().map(|turn| turn.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
        assert_eq!(repo.get_turns(&session).await.expect("all").len(), 3);
    }
}
