use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use sugar_log::config::{parse_food_item, Command, ReadingCommand};
use sugar_log::core::glucose::{mg_dl_to_mmol, validate_reading};
use sugar_log::domain::model::UserId;
use sugar_log::domain::ports::{ConfigProvider, FoodLookup};
use sugar_log::utils::error::{AppError, ErrorSeverity};
use sugar_log::utils::validation::{parse_positive, Validate};
use sugar_log::utils::logger;
use sugar_log::{
    AppSettings, CalculatorSession, CliConfig, DebouncedSearch, FileReadingStore, LocalStorage,
    OpenFoodFactsClient, ReadingService, Result, SearchState,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let settings = AppSettings::resolve(&cli);
    let (json_logs, verbose) = match &settings {
        Ok(s) => (s.json_logs, s.verbose),
        Err(_) => (cli.json_logs, cli.verbose),
    };

    // 初始化日誌
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting sugar-log");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    let settings = match settings.and_then(|s| cli.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    tracing::debug!(
        "Food API: {}, data dir: {}, {} g per unit, debounce {} ms",
        settings.food_api_endpoint(),
        settings.data_dir(),
        settings.grams_per_unit(),
        settings.debounce_ms()
    );

    if let Err(e) = run(&cli, &settings).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &AppError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 4,      // 查無資料
        ErrorSeverity::Medium => 2,   // 可重試
        ErrorSeverity::High => 1,     // 輸入或設定錯誤
        ErrorSeverity::Critical => 3, // 儲存錯誤
    }
}

async fn run(cli: &CliConfig, settings: &AppSettings) -> Result<()> {
    match &cli.command {
        Command::Calc { items, .. } => {
            let mut session = CalculatorSession::new(settings.calculator());
            for item in items {
                session.add_entry(parse_food_item(item)?);
            }

            for row in session.rows() {
                println!(
                    "{:<24} {:>7.1} g  {:>6.2} XE",
                    row.entry.name,
                    row.entry.weight_grams,
                    session.row_units(row.id)?
                );
            }
            println!("Total: {} XE", session.total());
        }
        Command::Search { query, limit } => {
            let client = OpenFoodFactsClient::new(settings.food_api.clone())?;
            let products = client.search(query).await?;
            let limit = limit.unwrap_or(settings.food_api.page_size);

            if products.is_empty() {
                println!("No products found for '{}'", query);
            }
            for product in products.iter().take(limit) {
                println!(
                    "{:<16} {:<40} carbs {:>6.1} g  fiber {:>5.1} g",
                    product.code,
                    product.product_name,
                    product.carbs_per_100g(),
                    product.fiber_per_100g()
                );
            }
        }
        Command::Lookup { query, weight } => {
            let weight = parse_positive("weight", weight)?;
            let client = OpenFoodFactsClient::new(settings.food_api.clone())?;
            let product = client.first_match(query).await?;
            let entry = product.to_entry(weight);
            let units = settings.calculator().entry_units(&entry);

            println!(
                "{} ({} g, {} g carbs / {} g fiber per 100 g): {} XE",
                entry.name, entry.weight_grams, entry.carbs_per_100g, entry.fiber_per_100g, units
            );
        }
        Command::Suggest { limit, .. } => {
            let client = OpenFoodFactsClient::new(settings.food_api.clone())?;
            let search = DebouncedSearch::new(
                Arc::new(client),
                Duration::from_millis(settings.debounce_ms()),
            );
            let limit = limit.unwrap_or(settings.food_api.page_size);
            run_suggest(&search, limit).await?;
        }
        Command::Reading { action } => {
            let user = UserId::new(cli.user.clone())?;
            let store = FileReadingStore::new(LocalStorage::new(&settings.data_dir));
            let service = ReadingService::new(store);
            run_reading(&service, &user, action).await?;
        }
    }

    Ok(())
}

/// 每行 stdin 視為一次輸入變更；EOF 後等最後一個查詢完成
async fn run_suggest(search: &DebouncedSearch<OpenFoodFactsClient>, limit: usize) -> Result<()> {
    let mut rx = search.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => match line? {
                Some(query) => search.submit(&query),
                None => {
                    input_open = false;
                    if search.current().settled {
                        break;
                    }
                }
            },
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if state.settled && !state.query.is_empty() {
                    print_suggestions(&state, limit);
                }
                if !input_open && state.settled {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn print_suggestions(state: &SearchState, limit: usize) {
    println!("🔎 {}", state.query);
    if let Some(error) = &state.error {
        println!("  ⚠️ {}", error);
    } else if state.suggestions.is_empty() {
        println!("  (no matches)");
    }
    for product in state.suggestions.iter().take(limit) {
        println!(
            "  {:<40} carbs {:>6.1} g  fiber {:>5.1} g",
            product.product_name,
            product.carbs_per_100g(),
            product.fiber_per_100g()
        );
    }
}

async fn run_reading(
    service: &ReadingService<FileReadingStore<LocalStorage>>,
    user: &UserId,
    action: &ReadingCommand,
) -> Result<()> {
    match action {
        ReadingCommand::Add {
            value,
            reading_type,
            notes,
        } => {
            let reading = validate_reading(value, reading_type.as_deref(), notes)?;
            let saved = service.add(user, reading).await?;
            println!(
                "✅ Saved reading #{}: {} mmol/L",
                saved.id,
                mg_dl_to_mmol(saved.glucose_mg_dl)
            );
        }
        ReadingCommand::List { limit } => {
            let readings = service.list(user).await?;
            if readings.is_empty() {
                println!("No readings.");
            }
            for r in readings.iter().take(limit.unwrap_or(usize::MAX)) {
                let notes = if r.notes.is_empty() {
                    String::new()
                } else {
                    format!("  {}", r.notes)
                };
                println!(
                    "#{:<5} {}  {:>5.1} mmol/L  {:<11}{}",
                    r.id,
                    r.recorded_at.format("%Y-%m-%d %H:%M"),
                    mg_dl_to_mmol(r.glucose_mg_dl),
                    r.reading_type,
                    notes
                );
            }
        }
        ReadingCommand::Delete { id } => {
            service.delete(user, *id).await?;
            println!("🗑️ Reading #{} deleted", id);
        }
        ReadingCommand::Stats => {
            let stats = service.stats(user).await?;
            println!("Readings:      {}", stats.count);
            println!("Average:       {} mmol/L", stats.average_mmol);
            if let (Some(min), Some(max)) = (stats.min_mmol, stats.max_mmol) {
                println!("Range:         {} - {} mmol/L", min, max);
            }
            for (reading_type, type_stats) in &stats.by_type {
                println!(
                    "  {:<12} {:>3} readings, avg {} mmol/L",
                    reading_type.as_str(),
                    type_stats.count,
                    type_stats.average_mmol
                );
            }
        }
        ReadingCommand::Export { output } => {
            let csv = service.export_csv(user).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(path, csv).await?;
                    tracing::info!("📁 Exported readings to {}", path);
                    println!("📁 Output saved to: {}", path);
                }
                None => print!("{}", csv),
            }
        }
    }
    Ok(())
}
