pub mod batch;
pub mod config;
pub mod error;
pub mod format;
pub mod hcl;
pub mod migration;
pub mod platform;
pub mod state;
pub mod workflow;
pub mod workspace;

#[cfg(test)]
mod test_support;
