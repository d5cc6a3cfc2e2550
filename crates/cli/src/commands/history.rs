use renewly_core::{ConversationTurn, SessionId};
use renewly_db::connect_with_settings;
use renewly_db::repositories::{ConversationRepository, SqlConversationRepository};
use serde::Serialize;

use crate::commands::{build_runtime, load_config, CommandResult, EXIT_DATABASE};

#[derive(Debug, Serialize)]
struct HistoryReport {
    command: &'static str,
    status: &'static str,
    session_id: SessionId,
    turn_count: usize,
    turns: Vec<ConversationTurn>,
}

pub fn run(session_id: &str) -> CommandResult {
    let config = match load_config("history") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("history") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let session_id = SessionId(session_id.trim().to_string());

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| error.to_string())?;
        let turns = SqlConversationRepository::new(pool.clone())
            .get_turns(&session_id)
            .await
            .map_err(|error| error.to_string());
        pool.close().await;
        turns
    });

    match result {
        Ok(turns) => CommandResult::report(
            0,
            &HistoryReport {
                command: "history",
                status: "ok",
                turn_count: turns.len(),
                session_id,
                turns,
            },
        ),
        Err(message) => CommandResult::failure("history", "db_connectivity", message, EXIT_DATABASE),
    }
}
