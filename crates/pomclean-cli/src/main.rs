//! pomclean CLI binary.
//!
//! Parses arguments with `clap`, resolves the POM and its configuration,
//! initializes logging via `tracing`, and dispatches to the command handlers.

mod cli;
mod commands;

use miette::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    let invocation = commands::prepare(args)?;

    // `verbose` may come from -v or from pomclean.toml.
    let default_level = if invocation.config.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    commands::run(invocation)
}
