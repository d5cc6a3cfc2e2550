pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "renewly",
    about = "Renewly operator CLI",
    long_about = "Operate the Renewly service: migrations, readiness checks, config inspection and conversation history.",
    after_help = "Examples:\n  renewly doctor --json\n  renewly config\n  renewly history 6f1c2d3e-0000-4000-8000-000000000000"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Validate config, LLM credential presence, DB connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the stored conversation turns of one session as JSON")]
    History {
        #[arg(help = "Session identifier returned by /v1/agent/message")]
        session_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Config => commands::config::run(),
        Command::History { session_id } => commands::history::run(&session_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
