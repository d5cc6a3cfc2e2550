use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use renewly_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &str, env_keys: &[&str]| {
        field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_secret(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let entries: [(&str, String, &[&str]); 13] = [
        ("database.url", config.database.url.clone(), &["RENEWLY_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["RENEWLY_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["RENEWLY_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.api_key", api_key, &["RENEWLY_LLM_API_KEY", "OPENAI_API_KEY"]),
        ("llm.base_url", config.llm.base_url.clone(), &["RENEWLY_LLM_BASE_URL"]),
        ("llm.model", config.llm.model.clone(), &["RENEWLY_LLM_MODEL", "LLM_MODEL"]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["RENEWLY_LLM_TIMEOUT_SECS"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["RENEWLY_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["RENEWLY_SERVER_PORT"]),
        (
            "agent.history_limit",
            config.agent.history_limit.to_string(),
            &["RENEWLY_AGENT_HISTORY_LIMIT"],
        ),
        (
            "agent.payment_base_url",
            config.agent.payment_base_url.clone(),
            &["RENEWLY_AGENT_PAYMENT_BASE_URL"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["RENEWLY_LOGGING_LEVEL", "RENEWLY_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["RENEWLY_LOGGING_FORMAT", "RENEWLY_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        lines.push(render_line(key, &value, source(key, env_keys)));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("renewly.toml"), PathBuf::from("config/renewly.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognisable prefix such as `sk-` and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
