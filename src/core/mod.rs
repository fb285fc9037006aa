pub mod bread_units;
pub mod calculator;
pub mod glucose;
pub mod readings;
pub mod search;

pub use crate::domain::model::{FoodEntry, GlucoseReading, NewReading, Product, ReadingType, UserId};
pub use crate::domain::ports::{ConfigProvider, FoodLookup, ReadingStore, Storage};
pub use crate::utils::error::Result;
