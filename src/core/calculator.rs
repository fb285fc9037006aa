use crate::core::bread_units::BreadUnitCalculator;
use crate::domain::model::{FoodEntry, Product};
use crate::utils::error::{AppError, Result};

pub type RowId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorRow {
    pub id: RowId,
    pub entry: FoodEntry,
}

/// 部分更新，`None` 表示保留原值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowUpdate {
    pub name: Option<String>,
    pub weight_grams: Option<f64>,
    pub carbs_per_100g: Option<f64>,
    pub fiber_per_100g: Option<f64>,
}

impl RowUpdate {
    /// 表單輸入的重量字串，無法解析時視為 0
    pub fn weight_text(text: &str) -> Self {
        let weight = text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite() && *w >= 0.0)
            .unwrap_or(0.0);
        Self {
            weight_grams: Some(weight),
            ..Self::default()
        }
    }
}

/// 有序的計算列，每次讀取總和時重新計算
#[derive(Debug, Clone, Default)]
pub struct CalculatorSession {
    calculator: BreadUnitCalculator,
    rows: Vec<CalculatorRow>,
    next_id: RowId,
}

impl CalculatorSession {
    pub fn new(calculator: BreadUnitCalculator) -> Self {
        Self {
            calculator,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn rows(&self) -> &[CalculatorRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn add_row(&mut self) -> RowId {
        self.add_entry(FoodEntry::default())
    }

    pub fn add_entry(&mut self, entry: FoodEntry) -> RowId {
        // Default 派生出的 next_id 為 0，id 從 1 開始
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.rows.push(CalculatorRow { id, entry });
        tracing::debug!("Added calculator row {}", id);
        id
    }

    pub fn update_row(&mut self, id: RowId, update: RowUpdate) -> Result<()> {
        let row = self.row_mut(id)?;
        if let Some(name) = update.name {
            row.entry.name = name;
        }
        if let Some(weight) = update.weight_grams {
            row.entry.weight_grams = weight;
        }
        if let Some(carbs) = update.carbs_per_100g {
            row.entry.carbs_per_100g = carbs;
        }
        if let Some(fiber) = update.fiber_per_100g {
            row.entry.fiber_per_100g = fiber;
        }
        Ok(())
    }

    /// 選取查詢結果：帶入名稱與營養值，保留已輸入的重量
    pub fn apply_product(&mut self, id: RowId, product: &Product) -> Result<()> {
        self.update_row(
            id,
            RowUpdate {
                name: Some(product.product_name.clone()),
                weight_grams: None,
                carbs_per_100g: Some(product.carbs_per_100g()),
                fiber_per_100g: Some(product.fiber_per_100g()),
            },
        )
    }

    pub fn remove_row(&mut self, id: RowId) -> Result<FoodEntry> {
        let index = self
            .rows
            .iter()
            .position(|r| r.id == id)
            .ok_or(AppError::RowNotFound { id })?;
        tracing::debug!("Removed calculator row {}", id);
        Ok(self.rows.remove(index).entry)
    }

    pub fn row_units(&self, id: RowId) -> Result<f64> {
        let row = self
            .rows
            .iter()
            .find(|r| r.id == id)
            .ok_or(AppError::RowNotFound { id })?;
        Ok(self.calculator.entry_units(&row.entry))
    }

    pub fn entries(&self) -> Vec<FoodEntry> {
        self.rows.iter().map(|r| r.entry.clone()).collect()
    }

    pub fn total(&self) -> f64 {
        self.calculator.total(&self.entries())
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut CalculatorRow> {
        self.rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AppError::RowNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bread_units::Rounding;
    use crate::domain::model::Nutriments;

    fn session() -> CalculatorSession {
        CalculatorSession::new(BreadUnitCalculator::default())
    }

    #[test]
    fn test_total_follows_rows() {
        let mut session = session();
        assert_eq!(session.total(), 0.0);

        let bread = session.add_entry(FoodEntry::new("bread", 100.0, 60.0));
        assert_eq!(session.total(), 5.0);

        let rice = session.add_entry(FoodEntry::new("rice", 50.0, 60.0));
        assert_eq!(session.total(), 7.5);

        session.remove_row(bread).unwrap();
        assert_eq!(session.total(), 2.5);

        session
            .update_row(
                rice,
                RowUpdate {
                    weight_grams: Some(200.0),
                    ..RowUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(session.total(), 10.0);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut session = session();
        let a = session.add_row();
        session.remove_row(a).unwrap();
        let b = session.add_row();
        assert_ne!(a, b);
        assert_eq!(session.rows().len(), 1);
    }

    #[test]
    fn test_default_session_starts_at_one() {
        let mut session = CalculatorSession::default();
        assert_eq!(session.add_row(), 1);
    }

    #[test]
    fn test_unknown_row() {
        let mut session = session();
        assert!(matches!(
            session.remove_row(42),
            Err(AppError::RowNotFound { id: 42 })
        ));
        assert!(session.update_row(42, RowUpdate::default()).is_err());
        assert!(session.row_units(42).is_err());
    }

    #[test]
    fn test_apply_product_keeps_weight() {
        let mut session = session();
        let id = session.add_row();
        session.update_row(id, RowUpdate::weight_text("150")).unwrap();

        let product = Product {
            code: "1".to_string(),
            product_name: "Oatmeal".to_string(),
            nutriments: Nutriments {
                carbohydrates_100g: Some(66.0),
                fiber_100g: Some(10.0),
            },
        };
        session.apply_product(id, &product).unwrap();

        let row = &session.rows()[0];
        assert_eq!(row.entry.name, "Oatmeal");
        assert_eq!(row.entry.weight_grams, 150.0);
        // 56 * 1.5 / 12 = 7.0
        assert_eq!(session.row_units(id).unwrap(), 7.0);
    }

    #[test]
    fn test_unparseable_weight_counts_as_zero() {
        let mut session = session();
        let id = session.add_entry(FoodEntry::new("bread", 100.0, 60.0));
        session.update_row(id, RowUpdate::weight_text("abc")).unwrap();
        assert_eq!(session.total(), 0.0);
    }

    #[test]
    fn test_row_units_without_rounding() {
        let mut session = CalculatorSession::new(BreadUnitCalculator::new(12.0, Rounding::None));
        let id = session.add_entry(FoodEntry::new("milk", 200.0, 4.7));
        let units = session.row_units(id).unwrap();
        assert!((units - 0.7833333333).abs() < 1e-6);
    }
}
