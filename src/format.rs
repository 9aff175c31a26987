use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use crate::config::FormatterConfig;
use crate::error::{AppError, Result};

/// Runs the external formatter (by default `terraform fmt -recursive`) over a
/// working copy.
#[derive(Debug, Clone)]
pub struct Formatter {
    enabled: bool,
    command: String,
    args: Vec<String>,
}

impl Formatter {
    pub fn new(config: &FormatterConfig) -> Self {
        Self {
            enabled: config.enabled,
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve the formatter executable on `PATH`.
    pub fn preflight(&self) -> Result<PathBuf> {
        which::which(&self.command).map_err(|e| {
            AppError::Config(format!(
                "Formatter '{}' is not installed or not in PATH: {e}",
                self.command
            ))
        })
    }

    pub async fn format(&self, dir: &Path) -> Result<()> {
        let start = Instant::now();
        let output = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .current_dir(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AppError::Format(format!("Failed to run {}: {e}", self.command)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(
            command = %self.command,
            elapsed_ms = start.elapsed().as_millis() as u64,
            stdout = %stdout.trim(),
            "Formatter finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("status {}", output.status),
                text => text.to_string(),
            };
            return Err(AppError::Format(format!("{}: {detail}", self.command)));
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn formatter(command: &str, args: &[&str]) -> Formatter {
        Formatter::new(&FormatterConfig {
            enabled: true,
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn test_success_runs_in_directory() {
        let tmp = tempfile::tempdir().unwrap();
        formatter("sh", &["-c", "touch formatted"])
            .format(tmp.path())
            .await
            .unwrap();
        assert!(tmp.path().join("formatted").exists());
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let err = formatter("sh", &["-c", "echo 'main.tf: syntax error' >&2; exit 2"])
            .format(tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
        assert!(err.to_string().contains("main.tf: syntax error"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_a_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = formatter("rehome-no-such-formatter", &[])
            .format(tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }

    #[test]
    fn test_preflight() {
        assert!(formatter("sh", &[]).preflight().is_ok());
        assert!(matches!(
            formatter("rehome-no-such-formatter", &[]).preflight(),
            Err(AppError::Config(_))
        ));
    }
}
