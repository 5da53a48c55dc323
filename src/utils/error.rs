use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    /// 429 / 502 from the API. Absorbed by the retrier, never surfaced past it.
    #[error("rate limited")]
    RateLimited,

    #[error("error code {status}, path={path}")]
    HttpStatus { status: u16, path: String },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Worker task failed: {message}")]
    WorkerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Data,
    Configuration,
    System,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::RateLimited | ExportError::HttpStatus { .. } => ErrorCategory::Api,
            ExportError::Request(_) => ErrorCategory::Network,
            ExportError::Decode { .. } | ExportError::SerializationError(_) => ErrorCategory::Data,
            ExportError::Cancelled => ErrorCategory::Shutdown,
            ExportError::IoError(_) | ExportError::WorkerError { .. } => ErrorCategory::System,
            ExportError::ConfigError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::Cancelled => ErrorSeverity::Low,
            ExportError::RateLimited | ExportError::Request(_) => ErrorSeverity::Medium,
            ExportError::HttpStatus { .. }
            | ExportError::Decode { .. }
            | ExportError::SerializationError(_)
            | ExportError::ConfigError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            ExportError::IoError(_) | ExportError::WorkerError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Rate limiting is the only condition the retrier absorbs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::RateLimited)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and that the API host is reachable",
            ErrorCategory::Api => "Check the API host and that the requested resource exists",
            ErrorCategory::Data => "The API returned an unexpected payload; retry later or report it upstream",
            ErrorCategory::Configuration => "Fix the configuration value and run again",
            ErrorCategory::System => "Check disk space and permissions on the output path",
            ErrorCategory::Shutdown => "The export was interrupted; run it again to produce a complete dump",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExportError::HttpStatus { status, path } => {
                format!("The API answered {} for {}", status, path)
            }
            ExportError::Cancelled => "Export cancelled before completion".to_string(),
            ExportError::Request(e) => format!("Could not reach the API: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(ExportError::RateLimited.is_retryable());
        assert!(!ExportError::Cancelled.is_retryable());
        assert!(!ExportError::HttpStatus {
            status: 500,
            path: "/v1/tokens".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_http_status_message_carries_status_and_path() {
        let err = ExportError::HttpStatus {
            status: 404,
            path: "/token/7/owners".to_string(),
        };
        assert_eq!(err.to_string(), "error code 404, path=/token/7/owners");
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.category(), ErrorCategory::Api);
    }

    #[test]
    fn test_cancelled_is_low_severity() {
        assert_eq!(ExportError::Cancelled.severity(), ErrorSeverity::Low);
        assert_eq!(ExportError::Cancelled.category(), ErrorCategory::Shutdown);
    }
}
