#[cfg(feature = "cli")]
pub mod args;
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{AppSettings, CliConfig, Command, ReadingCommand};

use crate::domain::model::FoodEntry;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{parse_non_negative, parse_positive};

/// 解析 `name:weight:carbs[:fiber]`，名稱本身可含冒號
pub fn parse_food_item(spec: &str) -> Result<FoodEntry> {
    let parts: Vec<&str> = spec.split(':').collect();
    let numeric_count = parts
        .iter()
        .rev()
        .take_while(|p| p.trim().parse::<f64>().is_ok())
        .count()
        .min(3);

    if numeric_count < 2 || parts.len() <= numeric_count {
        return Err(AppError::invalid_input(
            "item",
            spec,
            "expected name:weight:carbs_per_100g[:fiber_per_100g]",
        ));
    }

    let name_end = parts.len() - numeric_count;
    let name = parts[..name_end].join(":").trim().to_string();
    if name.is_empty() {
        return Err(AppError::invalid_input("item", spec, "food name is empty"));
    }

    let numbers = &parts[name_end..];
    let weight = parse_positive("weight", numbers[0])?;
    let carbs = parse_non_negative("carbs_per_100g", numbers[1])?;
    let fiber = match numbers.get(2) {
        Some(raw) => parse_non_negative("fiber_per_100g", raw)?,
        None => 0.0,
    };

    Ok(FoodEntry::new(name, weight, carbs).with_fiber(fiber))
}
