use crate::error::{AppError, Result};

/// A repository on the code host, identified by organization and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub organization: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(organization: &str, name: &str) -> Self {
        Self {
            organization: organization.to_string(),
            name: name.to_string(),
        }
    }

    /// Parse `name` or `org/name`; bare names belong to `default_org`.
    pub fn parse(entry: &str, default_org: &str) -> Result<Self> {
        let entry = entry.trim();
        let (organization, name) = match entry.split_once('/') {
            Some((org, name)) => (org, name),
            None => (default_org, entry),
        };

        for part in [organization, name] {
            let valid = !part.is_empty()
                && part != "."
                && part != ".."
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
            if !valid {
                return Err(AppError::Config(format!("Invalid repository entry: {entry:?}")));
            }
        }

        Ok(Self::new(organization, name))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }

    pub fn clone_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}.git",
            base_url.trim_end_matches('/'),
            self.organization,
            self.name
        )
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.organization, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}
