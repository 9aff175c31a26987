pub mod migrate;
pub mod types;

pub use migrate::migrate_repository;
pub use types::{MigrationOutcome, Stage};
