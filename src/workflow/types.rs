use std::fmt;
use std::path::PathBuf;

/// Terminal classification of one repository's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No candidate configuration files in the repository.
    NoTerraformFiles,
    /// Files were found but none needed rewriting.
    NoChangesNeeded,
    /// Dry run: these files (relative to the repository root) would change.
    ChangesDetected { files: Vec<PathBuf> },
    /// Branch pushed. `pr_url` is `None` when opening the pull request failed.
    ChangesPushed {
        branch: String,
        pr_url: Option<String>,
    },
    /// The repository could not be cloned.
    CloneFailed { error: String },
    /// A step after cloning failed; nothing further was attempted.
    WorkflowError { error: String },
}

impl MigrationOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationOutcome::NoTerraformFiles => "no-terraform-files",
            MigrationOutcome::NoChangesNeeded => "no-changes-needed",
            MigrationOutcome::ChangesDetected { .. } => "changes-detected",
            MigrationOutcome::ChangesPushed { .. } => "changes-pushed",
            MigrationOutcome::CloneFailed { .. } => "clone-failed",
            MigrationOutcome::WorkflowError { .. } => "workflow-error",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            MigrationOutcome::CloneFailed { .. } | MigrationOutcome::WorkflowError { .. }
        )
    }

    pub fn pr_url(&self) -> Option<&str> {
        match self {
            MigrationOutcome::ChangesPushed {
                pr_url: Some(url), ..
            } => Some(url.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOutcome::ChangesDetected { files } => {
                write!(f, "{} ({} files)", self.kind(), files.len())
            }
            MigrationOutcome::ChangesPushed {
                branch,
                pr_url: Some(url),
            } => write!(f, "{} ({branch}, {url})", self.kind()),
            MigrationOutcome::ChangesPushed { branch, pr_url: None } => {
                write!(f, "{} ({branch}, no pull request)", self.kind())
            }
            MigrationOutcome::CloneFailed { error } | MigrationOutcome::WorkflowError { error } => {
                write!(f, "{}: {error}", self.kind())
            }
            _ => f.write_str(self.kind()),
        }
    }
}

/// Steps of the per-repository workflow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cloning,
    Discovering,
    Transforming,
    Formatting,
    Branching,
    Committing,
    Pushing,
    RequestingMerge,
    CleaningUp,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cloning => "cloning",
            Stage::Discovering => "discovering",
            Stage::Transforming => "transforming",
            Stage::Formatting => "formatting",
            Stage::Branching => "branching",
            Stage::Committing => "committing",
            Stage::Pushing => "pushing",
            Stage::RequestingMerge => "requesting-merge",
            Stage::CleaningUp => "cleaning-up",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}
