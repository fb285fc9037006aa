use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AppError;

/// 計算器中的一列食物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub name: String,
    pub weight_grams: f64,
    pub carbs_per_100g: f64,
    #[serde(default)]
    pub fiber_per_100g: f64,
}

impl FoodEntry {
    pub fn new(name: impl Into<String>, weight_grams: f64, carbs_per_100g: f64) -> Self {
        Self {
            name: name.into(),
            weight_grams,
            carbs_per_100g,
            fiber_per_100g: 0.0,
        }
    }

    pub fn with_fiber(mut self, fiber_per_100g: f64) -> Self {
        self.fiber_per_100g = fiber_per_100g;
        self
    }
}

impl Default for FoodEntry {
    fn default() -> Self {
        Self::new("", 0.0, 0.0)
    }
}

/// Open Food Facts 的產品紀錄，只保留計算需要的欄位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub nutriments: Nutriments,
}

impl Product {
    pub fn carbs_per_100g(&self) -> f64 {
        self.nutriments.carbohydrates_100g.unwrap_or(0.0)
    }

    pub fn fiber_per_100g(&self) -> f64 {
        self.nutriments.fiber_100g.unwrap_or(0.0)
    }

    pub fn to_entry(&self, weight_grams: f64) -> FoodEntry {
        FoodEntry::new(self.product_name.clone(), weight_grams, self.carbs_per_100g())
            .with_fiber(self.fiber_per_100g())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutriments {
    #[serde(default, deserialize_with = "number_or_string")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub fiber_100g: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub products: Vec<Product>,
}

// Open Food Facts 有時把數值以字串回傳 ("12.5")，空字串視為缺值
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) if n.is_finite() => Ok(Some(n)),
        Some(Raw::Text(s)) => Ok(s.trim().parse::<f64>().ok().filter(|n| n.is_finite())),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingType {
    Fasting,
    BeforeMeal,
    AfterMeal,
    Bedtime,
    Random,
}

impl ReadingType {
    pub const ALL: [ReadingType; 5] = [
        ReadingType::Fasting,
        ReadingType::BeforeMeal,
        ReadingType::AfterMeal,
        ReadingType::Bedtime,
        ReadingType::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingType::Fasting => "fasting",
            ReadingType::BeforeMeal => "before-meal",
            ReadingType::AfterMeal => "after-meal",
            ReadingType::Bedtime => "bedtime",
            ReadingType::Random => "random",
        }
    }
}

impl fmt::Display for ReadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ReadingType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReadingType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| {
                AppError::invalid_input(
                    "reading type",
                    s,
                    "expected one of fasting, before-meal, after-meal, bedtime, random",
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    pub id: u64,
    pub glucose_mg_dl: f64,
    pub recorded_at: DateTime<Utc>,
    pub reading_type: ReadingType,
    #[serde(default)]
    pub notes: String,
}

/// 尚未存入的紀錄，由 `ReadingService::add` 補上 id 與時間
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub glucose_mg_dl: f64,
    pub reading_type: ReadingType,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> crate::utils::error::Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("user", &id, "user id cannot be empty"));
        }
        if trimmed.contains(['/', '\\', '\0']) || trimmed == "." || trimmed == ".." {
            return Err(AppError::invalid_input(
                "user",
                &id,
                "user id contains path characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
