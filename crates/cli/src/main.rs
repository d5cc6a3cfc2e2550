use std::process::ExitCode;

fn main() -> ExitCode {
    renewly_cli::run()
}
