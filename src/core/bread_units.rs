//! 麵包單位 (ХЕ) 計算
//!
//! 1 單位 = 12 g 淨碳水 (碳水 - 膳食纖維)。
//! 每一列先算出未四捨五入的值，總和只在最後取到最近的 0.5。

use crate::domain::model::FoodEntry;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GRAMS_PER_UNIT: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// 取到最近的 0.5，0.25 -> 0.5
    #[default]
    Half,
    /// 不取整
    None,
}

impl Rounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::Half => round_to_half(value),
            Rounding::None => value,
        }
    }
}

/// Nearest 0.5; ties round up for non-negative input.
pub fn round_to_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// 未取整的單位數。纖維多於碳水時淨碳水以 0 計。
pub fn raw_bread_units(
    weight_grams: f64,
    carbs_per_100g: f64,
    fiber_per_100g: f64,
    grams_per_unit: f64,
) -> f64 {
    let net_carbs_per_100g = (carbs_per_100g - fiber_per_100g).max(0.0);
    let carbs_in_portion = net_carbs_per_100g * weight_grams / 100.0;
    carbs_in_portion / grams_per_unit
}

pub fn compute_bread_units(
    weight_grams: f64,
    carbs_per_100g: f64,
    fiber_per_100g: f64,
    grams_per_unit: f64,
) -> f64 {
    round_to_half(raw_bread_units(
        weight_grams,
        carbs_per_100g,
        fiber_per_100g,
        grams_per_unit,
    ))
}

pub fn total_bread_units(entries: &[FoodEntry]) -> f64 {
    BreadUnitCalculator::default().total(entries)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreadUnitCalculator {
    grams_per_unit: f64,
    rounding: Rounding,
}

impl Default for BreadUnitCalculator {
    fn default() -> Self {
        Self {
            grams_per_unit: DEFAULT_GRAMS_PER_UNIT,
            rounding: Rounding::Half,
        }
    }
}

impl BreadUnitCalculator {
    /// `grams_per_unit` must be positive; callers load it through a validated config.
    pub fn new(grams_per_unit: f64, rounding: Rounding) -> Self {
        Self {
            grams_per_unit,
            rounding,
        }
    }

    pub fn grams_per_unit(&self) -> f64 {
        self.grams_per_unit
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    pub fn raw(&self, entry: &FoodEntry) -> f64 {
        raw_bread_units(
            entry.weight_grams,
            entry.carbs_per_100g,
            entry.fiber_per_100g,
            self.grams_per_unit,
        )
    }

    pub fn entry_units(&self, entry: &FoodEntry) -> f64 {
        self.rounding.apply(self.raw(entry))
    }

    pub fn total(&self, entries: &[FoodEntry]) -> f64 {
        let sum: f64 = entries.iter().map(|e| self.raw(e)).sum();
        self.rounding.apply(sum)
    }
}
