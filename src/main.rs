use std::process::ExitCode;

use clap::Parser;
use parquet_tools::cli::{self, Cli};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stdout carries command output, diagnostics go to stderr
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) parse args & dispatch ────────────────────────────────────
    let args = Cli::parse();
    debug!(command = ?args.command, "startup");

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
