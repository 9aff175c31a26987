use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::Instrument;

use crate::error::Result;
use crate::migration::WriteMode;
use crate::platform::types::{CreatePullRequest, RepoRef};
use crate::state::AppState;
use crate::workflow::types::{MigrationOutcome, Stage};
use crate::workspace::{git, WorkingCopy, WorkspaceManager};

fn enter(stage: Stage) {
    tracing::info!(stage = %stage, "Entering stage");
}

/// Timestamp-qualified branch name, e.g. `update-infoblox-module-20240131_154500`.
pub fn branch_name<Tz: TimeZone>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{prefix}-{}", now.format("%Y%m%d_%H%M%S"))
}

/// Run the full migration for one repository.
///
/// Never returns an error: every failure is classified into the outcome. The
/// working copy is removed before this returns, whatever the outcome.
pub async fn migrate_repository(state: &AppState, repo: &RepoRef) -> MigrationOutcome {
    let span = tracing::info_span!("repository", repo = %repo);

    async move {
        let manager = WorkspaceManager::new(&state.config.workspace);

        enter(Stage::Cloning);
        let working_copy = match manager.acquire(repo).await {
            Ok(working_copy) => working_copy,
            Err(e) => {
                tracing::error!(error = %e, "Could not prepare a working copy");
                return MigrationOutcome::CloneFailed {
                    error: e.to_string(),
                };
            }
        };

        let clone_url = repo.clone_url(&state.config.github.clone_base_url);
        let cloned = git::clone(&clone_url, working_copy.path(), state.config.access_token()).await;
        let outcome = match cloned {
            Ok(()) => match transform_and_publish(state, repo, &working_copy).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Workflow failed");
                    MigrationOutcome::WorkflowError {
                        error: e.to_string(),
                    }
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Clone failed; skipping repository");
                MigrationOutcome::CloneFailed {
                    error: e.to_string(),
                }
            }
        };

        enter(Stage::CleaningUp);
        drop(working_copy);

        tracing::info!(stage = %Stage::Done, outcome = %outcome, "Repository finished");
        outcome
    }
    .instrument(span)
    .await
}

async fn transform_and_publish(
    state: &AppState,
    repo: &RepoRef,
    working_copy: &WorkingCopy,
) -> Result<MigrationOutcome> {
    let root = working_copy.path();
    let config = &state.config;

    enter(Stage::Discovering);
    let files = state.migrator.discover(root);
    if files.is_empty() {
        tracing::info!("No Terraform files found");
        return Ok(MigrationOutcome::NoTerraformFiles);
    }
    tracing::info!(count = files.len(), "Discovered configuration files");

    enter(Stage::Transforming);
    let mode = if config.run.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Apply
    };
    let report = state.migrator.migrate_files(&files, mode).await?;
    if report.changed_files.is_empty() {
        tracing::info!("No changes needed");
        return Ok(MigrationOutcome::NoChangesNeeded);
    }

    if mode == WriteMode::DryRun {
        return Ok(MigrationOutcome::ChangesDetected {
            files: relative_to(root, &report.changed_files),
        });
    }

    enter(Stage::Formatting);
    if state.formatter.is_enabled() {
        if let Err(e) = state.formatter.format(root).await {
            tracing::warn!(error = %e, "Formatting failed; committing unformatted changes");
        }
    }

    if !git::has_changes(root).await? {
        tracing::info!("Working tree is clean after formatting; nothing to commit");
        return Ok(MigrationOutcome::NoChangesNeeded);
    }

    enter(Stage::Branching);
    let branch = branch_name(&config.migration.branch_prefix, &chrono::Local::now());
    git::create_branch(root, &branch).await?;

    enter(Stage::Committing);
    git::add_all(root).await?;
    git::commit(
        root,
        &config.migration.commit_message,
        &config.git.author_name,
        &config.git.author_email,
    )
    .await?;

    enter(Stage::Pushing);
    git::push(root, &branch, config.access_token()).await?;
    tracing::info!(branch = %branch, "Pushed branch");

    enter(Stage::RequestingMerge);
    let request = CreatePullRequest {
        title: config.migration.pr_title.clone(),
        body: config.migration.pr_body.clone(),
        head_branch: branch.clone(),
        base_branch: config.github.base_branch.clone(),
    };

    let pr_url = match state.platform.create_pull_request(repo, &request).await {
        Ok(pr) => {
            tracing::info!(pr = pr.number, url = %pr.html_url, "Pull request created");
            Some(pr.html_url)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                branch = %branch,
                "Pull request creation failed; the pushed branch needs a manual pull request"
            );
            None
        }
    };

    Ok(MigrationOutcome::ChangesPushed { branch, pr_url })
}

fn relative_to(root: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|f| f.strip_prefix(root).unwrap_or(f).to_path_buf())
        .collect()
}
