use crate::domain::model::{GlucoseReading, NewReading, Product, UserId};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn food_api_endpoint(&self) -> &str;
    fn data_dir(&self) -> &str;
    fn grams_per_unit(&self) -> f64;
    fn debounce_ms(&self) -> u64;
}

/// 食物資料庫查詢
#[async_trait]
pub trait FoodLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Product>>;

    async fn first_match(&self, query: &str) -> Result<Product> {
        self.search(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ProductNotFound {
                query: query.to_string(),
            })
    }
}

/// 血糖紀錄的持久化，依使用者分開
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn create(
        &self,
        user: &UserId,
        reading: NewReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<GlucoseReading>;
    async fn list(&self, user: &UserId) -> Result<Vec<GlucoseReading>>;
    async fn delete(&self, user: &UserId, id: u64) -> Result<()>;
}
