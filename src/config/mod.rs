pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::client::DEFAULT_API_HOST;
#[cfg(feature = "cli")]
use crate::core::retry::BackoffPolicy;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "mintkudos-export")]
#[command(about = "Export MintKudos tokens, communities and their details to JSON files")]
pub struct CliConfig {
    #[arg(long, default_value = DEFAULT_API_HOST)]
    pub api_host: String,

    #[arg(long, default_value = ".")]
    pub output_path: String,

    #[arg(long, default_value = "10", help = "Concurrent workers per phase")]
    pub workers: usize,

    #[arg(long, default_value = "1000")]
    pub page_limit: usize,

    #[arg(long, default_value = "5")]
    pub initial_backoff_secs: u64,

    #[arg(long, default_value = "30")]
    pub max_backoff_secs: u64,

    #[arg(long, help = "Load settings from a TOML file instead of the flags above")]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Validate configuration and exit without calling the API")]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn api_host(&self) -> &str {
        &self.api_host
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn page_limit(&self) -> usize {
        self.page_limit
    }

    fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_secs(self.initial_backoff_secs),
            max_interval: Duration::from_secs(self.max_backoff_secs),
            ..BackoffPolicy::default()
        }
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitor
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        validate_url("api_host", &self.api_host)?;
        validate_path("output_path", &self.output_path)?;
        validate_range("workers", self.workers, 1, 100)?;
        validate_range("page_limit", self.page_limit, 1, 1000)?;
        validate_range("max_backoff_secs", self.max_backoff_secs, 1, u64::MAX)?;
        validate_range("initial_backoff_secs", self.initial_backoff_secs, 1, self.max_backoff_secs)?;
        Ok(())
    }
}
