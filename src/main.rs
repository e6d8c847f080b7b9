//! zip2repo - publish a ZIP archive as a new GitHub repository
//!
//! Available as the `z2r` and `zip2repo` commands.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zip2repo::cli::commands::{Cli, Commands};
use zip2repo::cli::{auth, config, upload};
use zip2repo::error::{Result, Zip2RepoError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        handle_error(&e);
        std::process::exit(1);
    }
}

/// Print the terminal error with a pointer for the common cases
fn handle_error(e: &Zip2RepoError) {
    eprintln!("Error: {}", e);

    if let Zip2RepoError::Upload(err) = e {
        eprintln!();
        eprintln!("Files before '{}' were uploaded and remain in the repository.", err.path());
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Auth(args) => auth::handle_auth(args.command, &cli.overrides).await,
        Commands::Upload(args) => upload::handle_upload(args, &cli.overrides).await,
        Commands::Config(args) => config::handle_config(args.command),
    }
}
