use anyhow::Result;
use sugar_log::core::glucose::validate_reading;
use sugar_log::domain::model::{ReadingType, UserId};
use sugar_log::{AppError, FileReadingStore, LocalStorage, ReadingService};
use tempfile::TempDir;

fn service(dir: &TempDir) -> ReadingService<FileReadingStore<LocalStorage>> {
    ReadingService::new(FileReadingStore::new(LocalStorage::new(dir.path())))
}

#[tokio::test]
async fn test_log_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let user = UserId::new("alice")?;

    {
        let service = service(&dir);
        service
            .add(&user, validate_reading("95", Some("fasting"), "")?)
            .await?;
        service
            .add(&user, validate_reading("150", Some("after-meal"), "porridge")?)
            .await?;
    }

    let reopened = service(&dir);
    let readings = reopened.list(&user).await?;
    assert_eq!(readings.len(), 2);
    assert!(dir.path().join("readings/alice.json").exists());

    let stats = reopened.stats(&user).await?;
    assert_eq!(stats.count, 2);
    // (5.3 + 8.3) / 2 = 6.8
    assert_eq!(stats.average_mmol, 6.8);
    assert_eq!(stats.by_type[&ReadingType::AfterMeal].count, 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_and_export() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir);
    let user = UserId::new("bob")?;

    let kept = service
        .add(&user, validate_reading("110", Some("bedtime"), "")?)
        .await?;
    let dropped = service
        .add(&user, validate_reading("200", Some("random"), "cake")?)
        .await?;

    service.delete(&user, dropped.id).await?;
    let err = service.delete(&user, dropped.id).await.unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound { .. }));

    let csv = service.export_csv(&user).await?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(&format!("{},", kept.id)));
    assert!(lines[1].contains(",bedtime,110,6.1,"));
    Ok(())
}

#[tokio::test]
async fn test_users_do_not_share_logs() -> Result<()> {
    let dir = TempDir::new()?;
    let service = service(&dir);
    let alice = UserId::new("alice")?;
    let bob = UserId::new("bob")?;

    service
        .add(&alice, validate_reading("100", Some("random"), "")?)
        .await?;

    assert!(service.list(&bob).await?.is_empty());
    assert_eq!(service.stats(&bob).await?.average_mmol, 0.0);
    Ok(())
}
