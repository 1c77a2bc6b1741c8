mod cli;
mod commands;
mod config;
mod git;
mod node;
mod sync;
#[cfg(test)]
mod test_utils;
mod tui;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use console::style;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config_path = Config::locate(cli.config.as_deref())?;
    let config = Config::load(&config_path)?;

    match &cli.command {
        Commands::Update { from_upstream } => commands::update::handle_update(&config, *from_upstream),
        Commands::Status { grep } => commands::status::handle_status(&config, grep.as_deref()),
    }
}

/// `RUST_LOG` wins; otherwise the level follows the number of `-v` flags.
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
