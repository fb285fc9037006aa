use crate::core::glucose::{mg_dl_to_mmol, ReadingStats};
use crate::domain::model::{GlucoseReading, NewReading, UserId};
use crate::domain::ports::ReadingStore;
use crate::utils::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ReadingService<S: ReadingStore> {
    store: S,
    clock: Clock,
}

impl<S: ReadingStore> ReadingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(Utc::now),
        }
    }

    /// 測試時可注入固定時間
    pub fn with_clock(store: S, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub async fn add(&self, user: &UserId, reading: NewReading) -> Result<GlucoseReading> {
        if !reading.glucose_mg_dl.is_finite() || reading.glucose_mg_dl <= 0.0 {
            return Err(AppError::invalid_input(
                "glucose",
                reading.glucose_mg_dl,
                "must be greater than zero",
            ));
        }

        let recorded_at = (self.clock)();
        let created = self.store.create(user, reading, recorded_at).await?;
        tracing::info!(
            "📝 Saved reading {} for {}: {} mmol/L ({})",
            created.id,
            user,
            mg_dl_to_mmol(created.glucose_mg_dl),
            created.reading_type
        );
        Ok(created)
    }

    /// 最新的在前
    pub async fn list(&self, user: &UserId) -> Result<Vec<GlucoseReading>> {
        let mut readings = self.store.list(user).await?;
        readings.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(readings)
    }

    pub async fn delete(&self, user: &UserId, id: u64) -> Result<()> {
        self.store.delete(user, id).await?;
        tracing::info!("🗑️ Deleted reading {} for {}", id, user);
        Ok(())
    }

    pub async fn stats(&self, user: &UserId) -> Result<ReadingStats> {
        let readings = self.store.list(user).await?;
        Ok(ReadingStats::from_readings(&readings))
    }

    pub async fn export_csv(&self, user: &UserId) -> Result<String> {
        let readings = self.list(user).await?;
        readings_to_csv(&readings)
    }
}

pub fn readings_to_csv(readings: &[GlucoseReading]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "recorded_at",
        "reading_type",
        "glucose_mg_dl",
        "glucose_mmol",
        "notes",
    ])?;

    for reading in readings {
        writer.write_record([
            reading.id.to_string(),
            reading
                .recorded_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            reading.reading_type.to_string(),
            reading.glucose_mg_dl.to_string(),
            mg_dl_to_mmol(reading.glucose_mg_dl).to_string(),
            reading.notes.clone(),
        ])?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| AppError::IoError(e.into_error()))?;
    String::from_utf8(data).map_err(|e| AppError::ConfigError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryReadingStore;
    use crate::domain::model::ReadingType;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicI64, Ordering};

    fn ticking_clock() -> Clock {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let minutes = Arc::new(AtomicI64::new(0));
        Arc::new(move || start + Duration::minutes(minutes.fetch_add(30, Ordering::SeqCst)))
    }

    fn new_reading(mg: f64, reading_type: ReadingType, notes: &str) -> NewReading {
        NewReading {
            glucose_mg_dl: mg,
            reading_type,
            notes: notes.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_list_delete() {
        let service = ReadingService::with_clock(MemoryReadingStore::new(), ticking_clock());
        let user = UserId::new("alice").unwrap();

        let first = service
            .add(&user, new_reading(90.0, ReadingType::Fasting, ""))
            .await
            .unwrap();
        let second = service
            .add(&user, new_reading(160.0, ReadingType::AfterMeal, "pasta"))
            .await
            .unwrap();

        let listed = service.list(&user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        service.delete(&user, first.id).await.unwrap();
        assert_eq!(service.list(&user).await.unwrap().len(), 1);

        assert!(matches!(
            service.delete(&user, first.id).await,
            Err(AppError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_readings_are_per_user() {
        let service = ReadingService::new(MemoryReadingStore::new());
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();

        service
            .add(&alice, new_reading(100.0, ReadingType::Random, ""))
            .await
            .unwrap();

        assert!(service.list(&bob).await.unwrap().is_empty());
        assert_eq!(service.stats(&alice).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive() {
        let service = ReadingService::new(MemoryReadingStore::new());
        let user = UserId::new("alice").unwrap();
        let result = service
            .add(&user, new_reading(0.0, ReadingType::Fasting, ""))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let service = ReadingService::with_clock(MemoryReadingStore::new(), ticking_clock());
        let user = UserId::new("alice").unwrap();
        service
            .add(&user, new_reading(100.0, ReadingType::BeforeMeal, "coffee, no sugar"))
            .await
            .unwrap();

        let csv = service.export_csv(&user).await.unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,recorded_at,reading_type,glucose_mg_dl,glucose_mmol,notes")
        );
        assert_eq!(
            lines.next(),
            Some("1,2024-03-01T08:00:00Z,before-meal,100,5.6,\"coffee, no sugar\"")
        );
    }
}
