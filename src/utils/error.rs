use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    ApiStatusError { status: u16, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

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

    #[error("Invalid input '{value}' for {field}: {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No product found for '{query}'")]
    ProductNotFound { query: String },

    #[error("Reading {id} not found")]
    RecordNotFound { id: u64 },

    #[error("Calculator row {id} not found")]
    RowNotFound { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Input,
    Storage,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn invalid_input(field: &str, value: impl ToString, reason: &str) -> Self {
        AppError::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ApiError(_) | AppError::ApiStatusError { .. } => ErrorCategory::Network,
            AppError::ConfigError { .. }
            | AppError::ConfigValidationError { .. }
            | AppError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AppError::InvalidInput { .. } => ErrorCategory::Input,
            AppError::CsvError(_) | AppError::IoError(_) | AppError::SerializationError(_) => {
                ErrorCategory::Storage
            }
            AppError::ProductNotFound { .. }
            | AppError::RecordNotFound { .. }
            | AppError::RowNotFound { .. } => ErrorCategory::NotFound,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// 是否值得重試 (網路錯誤與 5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ApiError(e) => e.is_timeout() || e.is_connect(),
            AppError::ApiStatusError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AppError::ApiError(_) => {
                "Check your network connection and the food API endpoint".to_string()
            }
            AppError::ApiStatusError { status, .. } if *status >= 500 => {
                "The food database is having trouble, try again in a moment".to_string()
            }
            AppError::ApiStatusError { .. } => {
                "Check food_api.endpoint in the configuration file".to_string()
            }
            AppError::ConfigError { .. } | AppError::ConfigValidationError { .. } => {
                "Make sure the configuration file exists and is valid TOML".to_string()
            }
            AppError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' setting in your configuration", field)
            }
            AppError::InvalidInput { field, .. } => {
                format!("Enter a non-negative number for {}", field)
            }
            AppError::ProductNotFound { .. } => {
                "Try a shorter or different product name".to_string()
            }
            AppError::RecordNotFound { .. } => {
                "Run `sugar-log reading list` to see existing reading ids".to_string()
            }
            AppError::RowNotFound { .. } => "The row was already removed".to_string(),
            AppError::CsvError(_) | AppError::IoError(_) | AppError::SerializationError(_) => {
                "Check that the data directory is writable and not corrupted".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::ApiError(_) | AppError::ApiStatusError { .. } => {
                "Could not reach the food database".to_string()
            }
            AppError::InvalidInput { field, value, .. } => {
                format!("'{}' is not a valid value for {}", value, field)
            }
            AppError::ProductNotFound { query } => format!("Product '{}' was not found", query),
            AppError::RecordNotFound { id } => format!("Reading {} does not exist", id),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
