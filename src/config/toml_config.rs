use crate::adapters::food_api::{FoodApiSettings, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use crate::core::bread_units::{Rounding, DEFAULT_GRAMS_PER_UNIT};
use crate::core::ConfigProvider;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub food_api: FoodApiConfig,
    pub calculator: CalculatorConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodApiConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub page_size: usize,
    pub user_agent: String,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for FoodApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 10,
            page_size: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_attempts: 1,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub grams_per_unit: f64,
    pub rounding: Rounding,
    pub debounce_ms: u64,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            grams_per_unit: DEFAULT_GRAMS_PER_UNIT,
            rounding: Rounding::Half,
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./sugar-log-data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub verbose: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| AppError::ConfigError {
            message: format!(
                "Cannot read config file '{}': {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OFF_ENDPOINT})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("food_api.endpoint", &self.food_api.endpoint)?;
        validation::validate_range("food_api.timeout_seconds", self.food_api.timeout_seconds, 1, 120)?;
        validation::validate_positive_number("food_api.page_size", self.food_api.page_size, 1)?;
        validation::validate_non_empty_string("food_api.user_agent", &self.food_api.user_agent)?;
        validation::validate_range("food_api.retry_attempts", self.food_api.retry_attempts, 0, 5)?;
        validation::validate_range("food_api.retry_delay_ms", self.food_api.retry_delay_ms, 0, 30_000)?;

        let grams = self.calculator.grams_per_unit;
        if !grams.is_finite() || grams <= 0.0 {
            return Err(AppError::InvalidConfigValueError {
                field: "calculator.grams_per_unit".to_string(),
                value: grams.to_string(),
                reason: "Must be a positive number of grams".to_string(),
            });
        }
        validation::validate_range("calculator.debounce_ms", self.calculator.debounce_ms, 0, 10_000)?;

        validation::validate_path("storage.data_dir", &self.storage.data_dir)?;
        Ok(())
    }

    pub fn food_api_settings(&self) -> FoodApiSettings {
        FoodApiSettings {
            endpoint: self.food_api.endpoint.clone(),
            timeout: Duration::from_secs(self.food_api.timeout_seconds),
            page_size: self.food_api.page_size,
            user_agent: self.food_api.user_agent.clone(),
            retry_attempts: self.food_api.retry_attempts,
            retry_delay: Duration::from_millis(self.food_api.retry_delay_ms),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn food_api_endpoint(&self) -> &str {
        &self.food_api.endpoint
    }

    fn data_dir(&self) -> &str {
        &self.storage.data_dir
    }

    fn grams_per_unit(&self) -> f64 {
        self.calculator.grams_per_unit
    }

    fn debounce_ms(&self) -> u64 {
        self.calculator.debounce_ms
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[food_api]
endpoint = "https://food.example.com/cgi/search.pl"
timeout_seconds = 5
page_size = 3
retry_attempts = 2
retry_delay_ms = 250

[calculator]
grams_per_unit = 10.0
rounding = "none"
debounce_ms = 150

[storage]
data_dir = "/tmp/sugar"

[logging]
json = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.food_api_endpoint(), "https://food.example.com/cgi/search.pl");
        assert_eq!(config.food_api.page_size, 3);
        assert_eq!(config.food_api.user_agent, DEFAULT_USER_AGENT);
        let api = config.food_api_settings();
        assert_eq!(api.retry_attempts, 2);
        assert_eq!(api.retry_delay, Duration::from_millis(250));
        assert_eq!(config.grams_per_unit(), 10.0);
        assert_eq!(config.calculator.rounding, Rounding::None);
        assert_eq!(config.debounce_ms(), 150);
        assert_eq!(config.data_dir(), "/tmp/sugar");
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.food_api_endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.grams_per_unit(), 12.0);
        assert_eq!(config.debounce_ms(), 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SUGAR_LOG_TEST_ENDPOINT", "https://test.api.com/search");

        let toml_content = r#"
[food_api]
endpoint = "${SUGAR_LOG_TEST_ENDPOINT}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.food_api.endpoint, "https://test.api.com/search");

        std::env::remove_var("SUGAR_LOG_TEST_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = TomlConfig::from_toml_str("[food_api]\nendpoint = \"invalid-url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let bad_grams = TomlConfig::from_toml_str("[calculator]\ngrams_per_unit = 0.0\n").unwrap();
        assert!(matches!(
            bad_grams.validate(),
            Err(AppError::InvalidConfigValueError { field, .. }) if field == "calculator.grams_per_unit"
        ));

        assert!(TomlConfig::from_toml_str("[calculator]\nrounding = \"quarter\"\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndata_dir = \"./from-file\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.data_dir, "./from-file");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TomlConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigError { .. }));
    }
}
