use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::format::Formatter;
use crate::migration::Migrator;
use crate::platform::github::GitHubPlatform;
use crate::platform::Platform;

/// Everything a batch run needs, built once from configuration and passed
/// down explicitly.
pub struct AppState {
    pub config: AppConfig,
    pub platform: Arc<dyn Platform>,
    pub migrator: Migrator,
    pub formatter: Formatter,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let platform = GitHubPlatform::new(&config.github)?;
        Self::with_platform(config, Arc::new(platform))
    }

    pub fn with_platform(config: AppConfig, platform: Arc<dyn Platform>) -> Result<Self> {
        let migrator = Migrator::from_config(&config.migration)?;
        let formatter = Formatter::new(&config.formatter);

        Ok(Self {
            config,
            platform,
            migrator,
            formatter,
        })
    }
}
