use crate::domain::model::{GlucoseReading, NewReading, UserId};
use crate::domain::ports::{ReadingStore, Storage};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

fn next_id(readings: &[GlucoseReading]) -> u64 {
    readings.iter().map(|r| r.id).max().unwrap_or(0) + 1
}

fn build_reading(id: u64, reading: NewReading, recorded_at: DateTime<Utc>) -> GlucoseReading {
    GlucoseReading {
        id,
        glucose_mg_dl: reading.glucose_mg_dl,
        recorded_at,
        reading_type: reading.reading_type,
        notes: reading.notes,
    }
}

/// 每位使用者一個 JSON 檔：`readings/<user>.json`
pub struct FileReadingStore<S: Storage> {
    storage: S,
    // 讀-改-寫 需要序列化
    write_lock: Mutex<()>,
}

impl<S: Storage> FileReadingStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(user: &UserId) -> String {
        format!("readings/{}.json", user.as_str())
    }

    async fn load(&self, user: &UserId) -> Result<Vec<GlucoseReading>> {
        match self.storage.read_file(&Self::path_for(user)).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(AppError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No reading log yet for {}", user);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, user: &UserId, readings: &[GlucoseReading]) -> Result<()> {
        let data = serde_json::to_vec_pretty(readings)?;
        tracing::debug!("Writing {} readings ({} bytes) for {}", readings.len(), data.len(), user);
        self.storage.write_file(&Self::path_for(user), &data).await
    }
}

#[async_trait]
impl<S: Storage> ReadingStore for FileReadingStore<S> {
    async fn create(
        &self,
        user: &UserId,
        reading: NewReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<GlucoseReading> {
        let _guard = self.write_lock.lock().await;
        let mut readings = self.load(user).await?;
        let created = build_reading(next_id(&readings), reading, recorded_at);
        readings.push(created.clone());
        self.save(user, &readings).await?;
        Ok(created)
    }

    async fn list(&self, user: &UserId) -> Result<Vec<GlucoseReading>> {
        self.load(user).await
    }

    async fn delete(&self, user: &UserId, id: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut readings = self.load(user).await?;
        let before = readings.len();
        readings.retain(|r| r.id != id);
        if readings.len() == before {
            return Err(AppError::RecordNotFound { id });
        }
        self.save(user, &readings).await
    }
}

#[derive(Default)]
pub struct MemoryReadingStore {
    readings: Mutex<HashMap<UserId, Vec<GlucoseReading>>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn create(
        &self,
        user: &UserId,
        reading: NewReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<GlucoseReading> {
        let mut all = self.readings.lock().await;
        let readings = all.entry(user.clone()).or_default();
        let created = build_reading(next_id(readings), reading, recorded_at);
        readings.push(created.clone());
        Ok(created)
    }

    async fn list(&self, user: &UserId) -> Result<Vec<GlucoseReading>> {
        let all = self.readings.lock().await;
        Ok(all.get(user).cloned().unwrap_or_default())
    }

    async fn delete(&self, user: &UserId, id: u64) -> Result<()> {
        let mut all = self.readings.lock().await;
        let readings = all
            .get_mut(user)
            .ok_or(AppError::RecordNotFound { id })?;
        let index = readings
            .iter()
            .position(|r| r.id == id)
            .ok_or(AppError::RecordNotFound { id })?;
        readings.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ReadingType;
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AppError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn reading(mg: f64) -> NewReading {
        NewReading {
            glucose_mg_dl: mg,
            reading_type: ReadingType::Random,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_file_store_writes_json_per_user() {
        let storage = MockStorage::new();
        let store = FileReadingStore::new(storage.clone());
        let user = UserId::new("alice").unwrap();

        assert!(store.list(&user).await.unwrap().is_empty());

        let created = store.create(&user, reading(110.0), Utc::now()).await.unwrap();
        assert_eq!(created.id, 1);

        let raw = storage.get_file("readings/alice.json").await.unwrap();
        let saved: Vec<GlucoseReading> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(saved, vec![created]);
    }

    #[tokio::test]
    async fn test_file_store_ids_after_delete() {
        let store = FileReadingStore::new(MockStorage::new());
        let user = UserId::new("alice").unwrap();

        let a = store.create(&user, reading(100.0), Utc::now()).await.unwrap();
        let b = store.create(&user, reading(120.0), Utc::now()).await.unwrap();
        store.delete(&user, a.id).await.unwrap();

        let c = store.create(&user, reading(130.0), Utc::now()).await.unwrap();
        assert_eq!(c.id, b.id + 1);
        assert!(matches!(
            store.delete(&user, a.id).await,
            Err(AppError::RecordNotFound { id }) if id == a.id
        ));
    }

    #[tokio::test]
    async fn test_corrupt_log_is_an_error() {
        let storage = MockStorage::new();
        storage
            .write_file("readings/alice.json", b"not json")
            .await
            .unwrap();
        let store = FileReadingStore::new(storage);
        let user = UserId::new("alice").unwrap();

        assert!(matches!(
            store.list(&user).await,
            Err(AppError::SerializationError(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_delete_unknown_user() {
        let store = MemoryReadingStore::new();
        let user = UserId::new("nobody").unwrap();
        assert!(store.delete(&user, 1).await.is_err());
    }
}
