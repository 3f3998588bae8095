//! tasktrack - a small personal task tracker
//!
//! Runs one subcommand, or the interactive menu when none is given.

use clap::Parser;
use tasktrack::cli::Cli;
use tasktrack::config::Config;
use tasktrack::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json && !cli.events_to_stdout();

    let config = cli.resolve_config();
    init_tracing(config.as_ref().ok());

    if let Err(err) = config.and_then(|config| cli.run(config)) {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

/// RUST_LOG wins over `log.level`. Invalid or huge filters are ignored.
fn init_tracing(config: Option<&Config>) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .or_else(|| config.and_then(|config| EnvFilter::try_new(&config.log.level).ok()))
        .unwrap_or_else(|| EnvFilter::new("error"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
