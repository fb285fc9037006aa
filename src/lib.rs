pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{AppSettings, CliConfig};
pub use config::cli::LocalStorage;

pub use crate::adapters::{FileReadingStore, FoodApiSettings, MemoryReadingStore, OpenFoodFactsClient};
pub use crate::core::bread_units::{
    compute_bread_units, raw_bread_units, round_to_half, total_bread_units, BreadUnitCalculator,
    Rounding, DEFAULT_GRAMS_PER_UNIT,
};
pub use crate::core::calculator::{CalculatorSession, RowUpdate};
pub use crate::core::readings::ReadingService;
pub use crate::core::search::{DebouncedSearch, SearchState};
pub use crate::utils::error::{AppError, Result};
