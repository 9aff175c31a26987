use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rehome::batch::{self, RunLog};
use rehome::config::AppConfig;
use rehome::migration::{Migrator, WriteMode};
use rehome::platform::types::RepoRef;
use rehome::state::AppState;

#[derive(Parser)]
#[command(
    name = "rehome",
    version,
    about = "Move Terraform module blocks to a new registry source and open pull requests"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone, rewrite, push and open a pull request for each repository
    Run {
        /// Repository to process (`name` or `org/name`); overrides the configured list
        #[arg(long = "repo")]
        repos: Vec<String>,

        /// Report what would change without branching, pushing or opening pull requests
        #[arg(long)]
        dry_run: bool,
    },
    /// Rewrite module sources in a local directory tree, in place
    Rewrite {
        dir: PathBuf,

        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run { repos, dry_run } => {
            config.run.dry_run |= dry_run;
            if !repos.is_empty() {
                config.run.repositories = repos;
            }
            run(config).await
        }
        Command::Rewrite { dir, dry_run } => rewrite(&config, &dir, dry_run).await,
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    config.require_token()?;

    let repos = config
        .run
        .repositories
        .iter()
        .map(|entry| RepoRef::parse(entry, &config.github.organization))
        .collect::<Result<Vec<_>, _>>()?;
    if repos.is_empty() {
        anyhow::bail!("No repositories configured; set run.repositories or pass --repo");
    }

    tracing::info!(
        organization = %config.github.organization,
        repositories = repos.len(),
        dry_run = config.run.dry_run,
        "Starting migration run"
    );

    let log = RunLog::new(config.run.log_path.clone());
    let state = AppState::new(config)?;
    batch::preflight(&state)?;

    let summary = batch::run_batch(&state, &repos, &log).await;
    summary.log();

    for url in summary.pr_urls() {
        println!("{url}");
    }

    Ok(())
}

async fn rewrite(config: &AppConfig, dir: &Path, dry_run: bool) -> anyhow::Result<()> {
    let migrator = Migrator::from_config(&config.migration)?;
    let mode = if dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Apply
    };

    let report = migrator.migrate_tree(dir, mode).await?;
    tracing::info!(
        scanned = report.scanned,
        changed = report.changed_files.len(),
        dry_run,
        "Rewrite finished"
    );

    for path in &report.changed_files {
        println!("{}", path.display());
    }

    Ok(())
}
