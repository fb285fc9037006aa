use super::toml_config::TomlConfig;
use crate::adapters::food_api::FoodApiSettings;
use crate::core::bread_units::{BreadUnitCalculator, Rounding};
use crate::core::ConfigProvider;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "sugar-log")]
#[command(about = "Bread-unit calculator and blood glucose log")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Whose reading log to use
    #[arg(long, global = true, default_value = "local")]
    pub user: String,

    /// Override storage.data_dir
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Override food_api.endpoint
    #[arg(long, global = true)]
    pub food_api: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compute bread units for one or more foods
    Calc {
        /// Food as name:weight:carbs_per_100g[:fiber_per_100g], repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        #[arg(long)]
        grams_per_unit: Option<f64>,

        /// Print raw values instead of rounding to 0.5
        #[arg(long)]
        no_rounding: bool,
    },
    /// Search the food database
    Search {
        query: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Look up the first matching product and compute its bread units
    Lookup {
        query: String,

        /// Portion weight in grams
        #[arg(short, long)]
        weight: String,
    },
    /// Search as you type: one query per stdin line, debounced
    Suggest {
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override calculator.debounce_ms
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Manage blood glucose readings
    Reading {
        #[command(subcommand)]
        action: ReadingCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ReadingCommand {
    /// Record a reading in mg/dL
    Add {
        #[arg(long)]
        value: String,

        /// fasting, before-meal, after-meal, bedtime or random
        #[arg(short = 't', long = "type")]
        reading_type: Option<String>,

        #[arg(short, long, default_value = "")]
        notes: String,
    },
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    Delete {
        id: u64,
    },
    Stats,
    /// Write the log as CSV to a file or stdout
    Export {
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("user", &self.user)?;
        if let Some(dir) = &self.data_dir {
            validation::validate_path("data_dir", dir)?;
        }
        if let Some(endpoint) = &self.food_api {
            validation::validate_url("food_api", endpoint)?;
        }

        if let Command::Suggest {
            debounce_ms: Some(ms),
            ..
        } = &self.command
        {
            validation::validate_range("debounce_ms", *ms, 0, 10_000)?;
        }

        match &self.command {
            Command::Calc {
                grams_per_unit: Some(grams),
                ..
            } if !grams.is_finite() || *grams <= 0.0 => Err(AppError::InvalidConfigValueError {
                field: "grams_per_unit".to_string(),
                value: grams.to_string(),
                reason: "Must be a positive number of grams".to_string(),
            }),
            Command::Search { limit: Some(limit), .. }
            | Command::Suggest { limit: Some(limit), .. } => {
                validation::validate_positive_number("limit", *limit, 1)
            }
            Command::Reading {
                action: ReadingCommand::Export {
                    output: Some(output),
                },
            } => validation::validate_file_extensions("output", std::slice::from_ref(output), &["csv"]),
            _ => Ok(()),
        }
    }
}

/// CLI 參數 > TOML > 預設值
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub food_api: FoodApiSettings,
    pub grams_per_unit: f64,
    pub rounding: Rounding,
    pub debounce: Duration,
    pub data_dir: String,
    pub json_logs: bool,
    pub verbose: bool,
}

impl AppSettings {
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        file_config.validate()?;
        Ok(Self::merge(cli, &file_config))
    }

    pub fn merge(cli: &CliConfig, file_config: &TomlConfig) -> Self {
        let mut food_api = file_config.food_api_settings();
        if let Some(endpoint) = &cli.food_api {
            food_api.endpoint = endpoint.clone();
        }

        let (grams_per_unit, rounding) = match &cli.command {
            Command::Calc {
                grams_per_unit,
                no_rounding,
                ..
            } => (
                grams_per_unit.unwrap_or(file_config.calculator.grams_per_unit),
                if *no_rounding {
                    Rounding::None
                } else {
                    file_config.calculator.rounding
                },
            ),
            _ => (
                file_config.calculator.grams_per_unit,
                file_config.calculator.rounding,
            ),
        };

        let debounce_ms = match &cli.command {
            Command::Suggest {
                debounce_ms: Some(ms),
                ..
            } => *ms,
            _ => file_config.calculator.debounce_ms,
        };

        Self {
            food_api,
            grams_per_unit,
            rounding,
            debounce: Duration::from_millis(debounce_ms),
            data_dir: cli
                .data_dir
                .clone()
                .unwrap_or_else(|| file_config.storage.data_dir.clone()),
            json_logs: cli.json_logs || file_config.logging.json,
            verbose: cli.verbose || file_config.logging.verbose,
        }
    }

    pub fn calculator(&self) -> BreadUnitCalculator {
        BreadUnitCalculator::new(self.grams_per_unit, self.rounding)
    }
}

impl ConfigProvider for AppSettings {
    fn food_api_endpoint(&self) -> &str {
        &self.food_api.endpoint
    }

    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn grams_per_unit(&self) -> f64 {
        self.grams_per_unit
    }

    fn debounce_ms(&self) -> u64 {
        self.debounce.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;

    #[test]
    fn test_cli_overrides_toml() {
        let cli = CliConfig::parse_from([
            "sugar-log",
            "--data-dir",
            "/tmp/cli-dir",
            "calc",
            "--item",
            "bread:100:60",
            "--grams-per-unit",
            "10",
            "--no-rounding",
        ]);
        let file_config = TomlConfig::from_toml_str(
            "[storage]\ndata_dir = \"/tmp/toml-dir\"\n[calculator]\ngrams_per_unit = 12.0\n",
        )
        .unwrap();

        let settings = AppSettings::merge(&cli, &file_config);
        assert_eq!(settings.data_dir(), "/tmp/cli-dir");
        assert_eq!(settings.grams_per_unit(), 10.0);
        assert_eq!(settings.rounding, Rounding::None);
        assert_eq!(settings.debounce_ms(), 300);
    }

    #[test]
    fn test_debounce_from_toml_and_cli() {
        let file_config = TomlConfig::from_toml_str("[calculator]\ndebounce_ms = 120\n").unwrap();

        let from_toml = CliConfig::parse_from(["sugar-log", "suggest"]);
        let settings = AppSettings::merge(&from_toml, &file_config);
        assert_eq!(settings.debounce_ms(), 120);
        assert_eq!(settings.debounce, Duration::from_millis(120));

        let from_cli = CliConfig::parse_from(["sugar-log", "suggest", "--debounce-ms", "50"]);
        let settings = AppSettings::merge(&from_cli, &file_config);
        assert_eq!(settings.debounce_ms(), 50);

        let too_slow = CliConfig::parse_from(["sugar-log", "suggest", "--debounce-ms", "60000"]);
        assert!(too_slow.validate().is_err());
    }

    #[test]
    fn test_cli_validation() {
        let bad_grams =
            CliConfig::parse_from(["sugar-log", "calc", "-i", "x:1:1", "--grams-per-unit", "0"]);
        assert!(bad_grams.validate().is_err());

        let bad_export =
            CliConfig::parse_from(["sugar-log", "reading", "export", "--output", "out.txt"]);
        assert!(bad_export.validate().is_err());

        let ok = CliConfig::parse_from(["sugar-log", "--user", "alice", "reading", "stats"]);
        assert!(ok.validate().is_ok());
    }
}
