use crate::domain::model::{GlucoseReading, NewReading, ReadingType};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::parse_positive;
use serde::Serialize;
use std::collections::BTreeMap;

/// mg/dL 與 mmol/L 的換算係數
pub const MG_DL_PER_MMOL: f64 = 18.0;

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn mg_dl_to_mmol(mg_dl: f64) -> f64 {
    round_to_tenth(mg_dl / MG_DL_PER_MMOL)
}

pub fn mmol_to_mg_dl(mmol: f64) -> f64 {
    mmol * MG_DL_PER_MMOL
}

/// 驗證表單輸入：數值必須 > 0，且必須選擇測量類型
pub fn validate_reading(value: &str, reading_type: Option<&str>, notes: &str) -> Result<NewReading> {
    let glucose_mg_dl = parse_positive("glucose", value)?;
    let reading_type = match reading_type.map(str::trim) {
        Some(t) if !t.is_empty() => t.parse::<ReadingType>()?,
        _ => {
            return Err(AppError::invalid_input(
                "reading type",
                "",
                "a reading type must be selected",
            ))
        }
    };

    Ok(NewReading {
        glucose_mg_dl,
        reading_type,
        notes: notes.trim().to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStats {
    pub count: usize,
    pub average_mmol: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingStats {
    pub count: usize,
    pub average_mmol: f64,
    pub min_mmol: Option<f64>,
    pub max_mmol: Option<f64>,
    pub by_type: BTreeMap<ReadingType, TypeStats>,
}

/// 平均值取每筆換算後 (已取到 0.1) 的 mmol/L 再平均
fn mean_mmol<'a>(readings: impl Iterator<Item = &'a GlucoseReading>) -> (usize, f64) {
    let (count, sum) = readings.fold((0usize, 0.0f64), |(n, s), r| {
        (n + 1, s + mg_dl_to_mmol(r.glucose_mg_dl))
    });
    if count == 0 {
        (0, 0.0)
    } else {
        (count, round_to_tenth(sum / count as f64))
    }
}

impl ReadingStats {
    pub fn from_readings(readings: &[GlucoseReading]) -> Self {
        let (count, average_mmol) = mean_mmol(readings.iter());

        let mmol_values = readings.iter().map(|r| mg_dl_to_mmol(r.glucose_mg_dl));
        let min_mmol = mmol_values.clone().reduce(f64::min);
        let max_mmol = mmol_values.reduce(f64::max);

        let mut by_type = BTreeMap::new();
        for reading_type in ReadingType::ALL {
            let (n, avg) = mean_mmol(readings.iter().filter(|r| r.reading_type == reading_type));
            if n > 0 {
                by_type.insert(
                    reading_type,
                    TypeStats {
                        count: n,
                        average_mmol: avg,
                    },
                );
            }
        }

        Self {
            count,
            average_mmol,
            min_mmol,
            max_mmol,
            by_type,
        }
    }
}
