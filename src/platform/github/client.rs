use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

const USER_AGENT: &str = concat!("rehome/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// REST client for the GitHub pull request API, authenticated with a bearer token.
pub struct GitHubPlatform {
    client: Client,
    api_base_url: String,
    token: String,
}

impl GitHubPlatform {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &GitHubConfig, client: Client) -> Self {
        Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PullRequestBody<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    number: u64,
    html_url: String,
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        let url = format!(
            "{}/repos/{}/{}/pulls",
            self.api_base_url, repo.organization, repo.name
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("accept", ACCEPT)
            .header("x-github-api-version", API_VERSION)
            .json(&PullRequestBody {
                title: &pr.title,
                body: &pr.body,
                head: &pr.head_branch,
                base: &pr.base_branch,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GitHubApi(format!(
                "Pull request creation returned {status}: {body}"
            )));
        }

        let text = response.text().await?;
        let created: PullRequestResponse = serde_json::from_str(&text)?;
        Ok(PullRequest {
            number: created.number,
            html_url: created.html_url,
        })
    }
}
