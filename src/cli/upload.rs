//! Upload CLI command handler

use crate::cli::commands::{ConfigOverrides, UploadArgs};
use crate::core::archive::ArchiveReader;
use crate::core::token_manager::TokenManager;
use crate::error::Result;
use crate::github::client::{GitHubClient, RepoSpec};
use crate::github::error_handler::open_browser;
use crate::github::upload::{UploadEvent, UploadOrchestrator};

/// Handle the upload command
pub async fn handle_upload(args: UploadArgs, overrides: &ConfigOverrides) -> Result<()> {
    let spec = RepoSpec {
        name: args.name,
        description: args.description,
        is_private: args.private,
        init_with_readme: args.readme,
    };
    spec.validate()?;

    let mut reader = ArchiveReader::open(&args.archive)?;
    let config = overrides.load_config()?;
    let token = TokenManager::get_valid_token()?;
    let client = GitHubClient::new(&token, &config.api_base)?;

    println!(
        "Uploading {} ({} entries) to a new {} repository '{}'...",
        args.archive.display(),
        reader.len(),
        if spec.is_private { "private" } else { "public" },
        spec.name
    );

    let orchestrator = UploadOrchestrator::new(client, config.rate_limiter())
        .with_settle_delay(config.settle_delay())
        .with_progress(Box::new(print_event));

    let summary = orchestrator.run(&spec, reader.entries()).await?;

    println!();
    println!(
        "✓ Uploaded {} file(s) to {}",
        summary.files_uploaded(),
        summary.repository.full_name()
    );
    if summary.files_updated > 0 {
        println!("  {} replaced an existing file", summary.files_updated);
    }
    println!("  {}", summary.repository.html_url);

    if args.open && !open_browser(&summary.repository.html_url) {
        println!("  Could not open a browser.");
    }

    Ok(())
}

fn print_event(event: &UploadEvent) {
    match event {
        UploadEvent::RepositoryCreated(repo) => {
            println!("✓ Created {}", repo.full_name());
        }
        UploadEvent::FileUploaded { path, updated } => {
            let verb = if *updated { "Updated" } else { "Added" };
            println!("  {} {}", verb, path);
        }
        UploadEvent::DirectorySkipped { .. } => {}
    }
}
