//! Fixtures shared by the workflow and batch tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use git2::{build::RepoBuilder, IndexAddOption, Repository, Signature};

use crate::config::{AppConfig, GitHubConfig};
use crate::error::{AppError, Result};
use crate::platform::types::{CreatePullRequest, PullRequest, RepoRef};
use crate::platform::Platform;
use crate::state::AppState;

pub const TEST_ORG: &str = "acme";

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Create a bare repository `<dir>/<name>.git` whose `main` branch holds `files`.
pub fn seed_remote(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let seed_path = dir.join(format!("{name}-seed"));
    let seed = Repository::init(&seed_path).unwrap();
    seed.set_head("refs/heads/main").unwrap();

    for (path, content) in files {
        let full = seed_path.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    let sig = Signature::now("Seed", "seed@example.com").unwrap();
    let mut index = seed.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = seed.find_tree(index.write_tree().unwrap()).unwrap();
    seed.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
        .unwrap();

    let remote = dir.join(format!("{name}.git"));
    RepoBuilder::new()
        .bare(true)
        .clone(&file_url(&seed_path), &remote)
        .unwrap();
    remote
}

/// Read `path` from `branch` of a bare repository, if both exist.
pub fn read_remote_file(remote: &Path, branch: &str, path: &str) -> Option<String> {
    let repo = Repository::open_bare(remote).ok()?;
    let reference = repo.find_reference(&format!("refs/heads/{branch}")).ok()?;
    let tree = reference.peel_to_tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    let blob = entry.to_object(&repo).ok()?.peel_to_blob().ok()?;
    Some(String::from_utf8_lossy(blob.content()).into_owned())
}

pub fn remote_branches(remote: &Path) -> Vec<String> {
    let repo = Repository::open_bare(remote).unwrap();
    let mut names: Vec<String> = repo
        .branches(Some(git2::BranchType::Local))
        .unwrap()
        .filter_map(|b| b.ok())
        .filter_map(|(b, _)| b.name().ok().flatten().map(str::to_string))
        .collect();
    names.sort();
    names
}

/// In-memory stand-in for the code-hosting API.
#[derive(Default)]
pub struct FakePlatform {
    pub fail: bool,
    pub requests: Mutex<Vec<(String, CreatePullRequest)>>,
}

impl FakePlatform {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        let number = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((repo.full_name(), pr.clone()));
            requests.len() as u64
        };

        if self.fail {
            return Err(AppError::GitHubApi(
                "Pull request creation returned 422 Unprocessable Entity: {}".to_string(),
            ));
        }

        Ok(PullRequest {
            number,
            html_url: format!("https://github.com/{}/pull/{number}", repo.full_name()),
        })
    }
}

/// Config wired to local fixtures: remotes live under `<root>/remotes/acme`,
/// working copies under `<root>/workspaces`, the run log at `<root>/pr_links.txt`.
pub fn test_config(root: &Path) -> AppConfig {
    let mut github = GitHubConfig::with_token("test-token");
    github.organization = TEST_ORG.to_string();
    github.clone_base_url = file_url(&root.join("remotes"));

    let mut config = AppConfig::from_github(github);
    config.workspace.base_dir = root.join("workspaces");
    config.formatter.enabled = false;
    config.run.log_path = root.join("pr_links.txt");
    config
}

pub fn remotes_dir(root: &Path) -> PathBuf {
    let dir = root.join("remotes").join(TEST_ORG);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn test_state(config: AppConfig, platform: Arc<FakePlatform>) -> AppState {
    AppState::with_platform(config, platform).unwrap()
}

pub fn workspace_is_empty(root: &Path) -> bool {
    match std::fs::read_dir(root.join("workspaces")) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
