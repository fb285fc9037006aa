// Adapters layer: concrete implementations for external systems (food API, reading stores).

pub mod food_api;
pub mod store;

pub use food_api::{FoodApiSettings, OpenFoodFactsClient};
pub use store::{FileReadingStore, MemoryReadingStore};
