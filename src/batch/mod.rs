//! Sequential batch driver over a list of repositories.

pub mod run_log;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::platform::types::RepoRef;
use crate::state::AppState;
use crate::workflow::{migrate_repository, MigrationOutcome};

pub use run_log::RunLog;

/// Per-repository outcomes of one batch run, in processing order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<(String, MigrationOutcome)>,
}

impl BatchSummary {
    pub fn record(&mut self, repository: String, outcome: MigrationOutcome) {
        self.outcomes.push((repository, outcome));
    }

    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, outcome) in &self.outcomes {
            *counts.entry(outcome.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    pub fn pr_urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|(_, o)| o.pr_url())
            .collect()
    }

    pub fn log(&self) {
        for (repository, outcome) in &self.outcomes {
            tracing::info!(repo = %repository, outcome = %outcome, "Result");
        }
        tracing::info!(
            total = self.outcomes.len(),
            failures = self.failures(),
            pull_requests = self.pr_urls().len(),
            counts = ?self.counts(),
            "Batch finished"
        );
    }
}

/// Checks that must pass before any repository is touched.
pub fn preflight(state: &AppState) -> Result<()> {
    if state.formatter.is_enabled() && !state.config.run.dry_run {
        let path = state.formatter.preflight()?;
        tracing::debug!(formatter = %path.display(), "Formatter found");
    }
    Ok(())
}

/// Migrate each repository in turn.
///
/// A failing repository is recorded and the run moves on; one repository's
/// failure never stops the rest.
pub async fn run_batch(state: &AppState, repos: &[RepoRef], log: &RunLog) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (index, repo) in repos.iter().enumerate() {
        tracing::info!(
            repo = %repo,
            position = index + 1,
            total = repos.len(),
            "Processing repository"
        );

        let outcome = migrate_repository(state, repo).await;

        if let Some(url) = outcome.pr_url() {
            if let Err(e) = log.append(&repo.name, url).await {
                tracing::error!(
                    repo = %repo,
                    path = %log.path().display(),
                    error = %e,
                    "Failed to record pull request link"
                );
            }
        }

        summary.record(repo.full_name(), outcome);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::sync::Arc;

    const LEGACY_TF: &str = "module \"x\" {\n  source = \"terraform.generalmills.com/generalmills/iaas/gmi//modules/infoblox-record\"\n}\n";

    #[tokio::test]
    async fn test_failure_is_isolated_and_link_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        seed_remote(&remotes_dir(tmp.path()), "infra", &[("main.tf", LEGACY_TF)]);
        let config = test_config(tmp.path());
        let log = RunLog::new(&config.run.log_path);
        let state = test_state(config, Arc::new(FakePlatform::default()));

        let repos = vec![
            RepoRef::new(TEST_ORG, "missing"),
            RepoRef::new(TEST_ORG, "infra"),
        ];
        let summary = run_batch(&state, &repos, &log).await;

        assert_eq!(summary.outcomes.len(), 2);
        assert!(matches!(
            summary.outcomes[0].1,
            MigrationOutcome::CloneFailed { .. }
        ));
        assert!(matches!(
            summary.outcomes[1].1,
            MigrationOutcome::ChangesPushed { pr_url: Some(_), .. }
        ));
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.counts().get("changes-pushed"), Some(&1));
        assert_eq!(
            std::fs::read_to_string(log.path()).unwrap(),
            "infra: https://github.com/acme/infra/pull/1\n"
        );
        assert!(workspace_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn test_no_link_when_pull_request_fails() {
        let tmp = tempfile::tempdir().unwrap();
        seed_remote(&remotes_dir(tmp.path()), "infra", &[("main.tf", LEGACY_TF)]);
        let config = test_config(tmp.path());
        let log = RunLog::new(&config.run.log_path);
        let state = test_state(config, Arc::new(FakePlatform::failing()));

        let summary = run_batch(&state, &[RepoRef::new(TEST_ORG, "infra")], &log).await;

        assert!(summary.pr_urls().is_empty());
        assert!(!log.path().exists());
    }

    #[test]
    fn test_preflight_skips_disabled_formatter() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        config.formatter.command = "rehome-no-such-formatter".to_string();
        let state = test_state(config.clone(), Arc::new(FakePlatform::default()));
        assert!(preflight(&state).is_ok());

        config.formatter.enabled = true;
        let state = test_state(config, Arc::new(FakePlatform::default()));
        assert!(preflight(&state).is_err());
    }
}
