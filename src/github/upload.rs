//! Archive-to-repository upload pipeline
//!
//! Creates the repository, waits for GitHub to finish provisioning it, then
//! writes every archive file through the contents API one at a time. Each
//! write takes a rate-limit token first and probes for an existing blob so
//! that re-uploaded paths become updates instead of conflicts.
//!
//! The run stops at the first failing file. Files written before it stay in
//! the repository.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::core::archive::ArchiveEntry;
use crate::core::rate_limiter::RateLimiter;
use crate::error::{Result, UploadError};
use crate::github::client::{RemoteRepoClient, RepoHandle, RepoSpec};

/// Wait between repository creation and the first file write
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Progress notifications emitted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// The repository exists
    RepositoryCreated(RepoHandle),
    /// A file was written
    FileUploaded {
        path: String,
        /// True when an existing blob was replaced
        updated: bool,
    },
    /// A directory entry was skipped
    DirectorySkipped { path: String },
}

/// Callback receiving [`UploadEvent`]s
pub type ProgressCallback = Box<dyn Fn(&UploadEvent) + Send + Sync>;

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// The created repository
    pub repository: RepoHandle,
    /// Files written as new blobs
    pub files_created: usize,
    /// Files that replaced an existing blob
    pub files_updated: usize,
    /// Directory entries skipped
    pub directories_skipped: usize,
}

impl UploadSummary {
    /// Total files written
    pub fn files_uploaded(&self) -> usize {
        self.files_created + self.files_updated
    }
}

/// Commit message for one file write
pub fn commit_message(path: &str, updating: bool) -> String {
    if updating {
        format!("Update {}", path)
    } else {
        format!("Add {}", path)
    }
}

/// Drives a single archive-to-repository transfer
pub struct UploadOrchestrator<C> {
    client: C,
    limiter: RateLimiter,
    settle_delay: Duration,
    on_progress: Option<ProgressCallback>,
}

impl<C: RemoteRepoClient> UploadOrchestrator<C> {
    /// Create an orchestrator using `client` and sharing `limiter`
    pub fn new(client: C, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            settle_delay: DEFAULT_SETTLE_DELAY,
            on_progress: None,
        }
    }

    /// Override the post-creation settle delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Receive progress events
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// The wrapped client
    pub fn client(&self) -> &C {
        &self.client
    }

    fn emit(&self, event: UploadEvent) {
        if let Some(callback) = &self.on_progress {
            callback(&event);
        }
    }

    /// Create the repository described by `spec` and upload `entries` into it
    ///
    /// Entries are processed strictly in order, each fully resolved before
    /// the next starts. The first failure aborts the run.
    pub async fn run<I>(&self, spec: &RepoSpec, entries: I) -> Result<UploadSummary>
    where
        I: IntoIterator<Item = Result<ArchiveEntry>>,
    {
        let repository = self.client.create_repository(spec).await?;
        tracing::info!(repo = %repository.full_name(), "created repository");
        self.emit(UploadEvent::RepositoryCreated(repository.clone()));

        // Repository provisioning is asynchronous on GitHub's side
        if !self.settle_delay.is_zero() {
            tracing::debug!(delay_ms = self.settle_delay.as_millis() as u64, "waiting for repository to settle");
            tokio::time::sleep(self.settle_delay).await;
        }

        let mut summary = UploadSummary {
            repository,
            files_created: 0,
            files_updated: 0,
            directories_skipped: 0,
        };

        for (index, entry) in entries.into_iter().enumerate() {
            let entry = entry.map_err(|e| {
                UploadError::path_failed(format!("<archive entry {}>", index + 1), e)
            })?;

            if entry.is_directory {
                summary.directories_skipped += 1;
                self.emit(UploadEvent::DirectorySkipped { path: entry.path });
                continue;
            }

            let updated = match self.upload_entry(&summary.repository, &entry).await {
                Ok(updated) => updated,
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "upload aborted");
                    return Err(e.into());
                }
            };

            if updated {
                summary.files_updated += 1;
            } else {
                summary.files_created += 1;
            }
            tracing::info!(path = %entry.path, updated, "uploaded file");
            self.emit(UploadEvent::FileUploaded {
                path: entry.path,
                updated,
            });
        }

        Ok(summary)
    }

    /// Write one file; returns whether an existing blob was replaced
    async fn upload_entry(
        &self,
        repository: &RepoHandle,
        entry: &ArchiveEntry,
    ) -> std::result::Result<bool, UploadError> {
        self.limiter.acquire().await;

        let content = STANDARD.encode(&entry.content);

        let existing = self
            .client
            .get_file(&repository.owner, &repository.name, &entry.path)
            .await?;
        let existing_sha = existing.map(|file| file.blob_sha);
        let updating = existing_sha.is_some();

        self.client
            .put_file(
                &repository.owner,
                &repository.name,
                &entry.path,
                &content,
                &commit_message(&entry.path, updating),
                existing_sha,
            )
            .await?;

        Ok(updating)
    }
}
