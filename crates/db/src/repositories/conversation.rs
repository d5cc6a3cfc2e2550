use chrono::SecondsFormat;
use sqlx::{sqlite::SqliteRow, Row};

use renewly_core::domain::conversation::{ConversationTurn, SessionId, TurnId, TurnRole};

use super::policy::parse_timestamp;
use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn append_turn(&self, turn: ConversationTurn) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (id, session_id, role, message, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&turn.id.0)
        .bind(&turn.session_id.0)
        .bind(turn.role.as_str())
        .bind(&turn.message)
        // Fixed-width timestamps sort lexicographically in time order.
        .bind(turn.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_turns(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, role, message, created_at
             FROM conversations
             WHERE session_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(turn_from_row).collect()
    }

    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, role, message, created_at
             FROM (
                SELECT id, session_id, role, message, created_at, rowid AS seq
                FROM conversations
                WHERE session_id = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?
             )
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(&session_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(turn_from_row).collect()
    }
}

fn turn_from_row(row: SqliteRow) -> Result<ConversationTurn, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = TurnRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown turn role `{role_raw}`")))?;

    Ok(ConversationTurn {
        id: TurnId(row.try_get("id")?),
        session_id: SessionId(row.try_get("session_id")?),
        role,
        message: row.try_get("message")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use renewly_core::domain::conversation::{ConversationTurn, SessionId, TurnId, TurnRole};

    use super::SqlConversationRepository;
    use crate::migrations;
    use crate::repositories::ConversationRepository;
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn turns_come_back_oldest_first_in_submission_order() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());
        let session = SessionId("S-REL-001".to_string());

        let turns = vec![
            turn("t1", &session, TurnRole::User, "Hi, my policy expires soon", "2026-02-23T12:00:00Z"),
            turn("t2", &session, TurnRole::Agent, "I can help you renew", "2026-02-23T12:00:01Z"),
            turn("t3", &session, TurnRole::User, "What is the premium?", "2026-02-23T12:00:01Z"),
            turn("t4", &session, TurnRole::User, "Also add roadside cover", "2026-02-23T12:00:05Z"),
        ];
        for turn in &turns {
            repo.append_turn(turn.clone()).await.expect("append turn");
        }
        repo.append_turn(turn(
            "other",
            &SessionId("S-OTHER".to_string()),
            TurnRole::User,
            "unrelated",
            "2026-02-23T11:00:00Z",
        ))
        .await
        .expect("append other session turn");

        let history = repo.get_turns(&session).await.expect("get turns");
        assert_eq!(history, turns);
        assert!(history.windows(2).all(|pair| pair[0].created_at <= pair[1].created_at));

        pool.close().await;
    }

    #[tokio::test]
    async fn unknown_session_has_empty_history() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());

        let history =
            repo.get_turns(&SessionId("S-NONE".to_string())).await.expect("get turns");
        assert!(history.is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn recent_turns_returns_newest_window_oldest_first() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());
        let session = SessionId("S-REL-002".to_string());

        for (index, ts) in
            ["2026-02-23T12:00:00Z", "2026-02-23T12:01:00Z", "2026-02-23T12:02:00Z"]
                .into_iter()
                .enumerate()
        {
            let role = if index % 2 == 0 { TurnRole::User } else { TurnRole::Agent };
            repo.append_turn(turn(&format!("t{index}"), &session, role, &format!("m{index}"), ts))
                .await
                .expect("append turn");
        }

        let recent = repo.recent_turns(&session, 2).await.expect("recent turns");
        let messages: Vec<&str> = recent.iter().map(|turn| turn.message.as_str()).collect();
        assert_eq!(messages, vec!["m1", "m2"]);

        pool.close().await;
    }

    #[tokio::test]
    async fn fresh_turns_round_trip_exactly() {
        let pool = setup_pool().await;
        let repo = SqlConversationRepository::new(pool.clone());
        let session = SessionId::generate();
        let turn = ConversationTurn::new(session.clone(), TurnRole::User, "renew please");

        repo.append_turn(turn.clone()).await.expect("append turn");
        assert_eq!(repo.get_turns(&session).await.expect("get turns"), vec![turn]);

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn turn(
        id: &str,
        session_id: &SessionId,
        role: TurnRole,
        message: &str,
        created_at: &str,
    ) -> ConversationTurn {
        ConversationTurn {
            id: TurnId(id.to_string()),
            session_id: session_id.clone(),
            role,
            message: message.to_string(),
            created_at: DateTime::parse_from_rfc3339(created_at)
                .expect("valid rfc3339")
                .with_timezone(&Utc),
        }
    }
}
