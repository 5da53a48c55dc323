use crate::core::client::DEFAULT_API_HOST;
use crate::core::dispatcher::DEFAULT_WORKERS;
use crate::core::pager::DEFAULT_PAGE_LIMIT;
use crate::core::retry::{BackoffPolicy, DEFAULT_MULTIPLIER};
use crate::core::ConfigProvider;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_api_host")]
    pub api_host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    pub workers: Option<usize>,
    pub page_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    pub initial_backoff_secs: Option<u64>,
    pub max_backoff_secs: Option<u64>,
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_output_path() -> String {
    ".".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            workers: None,
            page_limit: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_HOST})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ExportError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_host(&self) -> &str {
        &self.source.api_host
    }

    fn output_path(&self) -> &str {
        &self.export.output_path
    }

    fn workers(&self) -> usize {
        self.export.workers.unwrap_or(DEFAULT_WORKERS)
    }

    fn page_limit(&self) -> usize {
        self.export.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    fn backoff(&self) -> BackoffPolicy {
        let defaults = BackoffPolicy::default();
        BackoffPolicy {
            initial_interval: self
                .retry
                .initial_backoff_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.initial_interval),
            max_interval: self
                .retry
                .max_backoff_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_interval),
            multiplier: self.retry.multiplier.unwrap_or(DEFAULT_MULTIPLIER),
        }
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("source.api_host", &self.source.api_host)?;
        validate_path("export.output_path", &self.export.output_path)?;
        validate_range("export.workers", self.workers(), 1, 100)?;
        validate_range("export.page_limit", self.page_limit(), 1, 1000)?;

        let backoff = self.backoff();
        validate_range("retry.multiplier", backoff.multiplier, 1.0, 10.0)?;
        if backoff.initial_interval.is_zero() || backoff.initial_interval > backoff.max_interval {
            return Err(ExportError::InvalidConfigValueError {
                field: "retry.initial_backoff_secs".to_string(),
                value: backoff.initial_interval.as_secs().to_string(),
                reason: "must be positive and not above retry.max_backoff_secs".to_string(),
            });
        }

        Ok(())
    }
}
