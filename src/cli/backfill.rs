use super::ui;
use crate::backfill::BackfillImporter;
use crate::core::config::AppConfig;
use crate::core::{ProviderCapability, RateError};
use crate::resolver::RateResolver;
use anyhow::Result;
use tracing::info;

/// Imports the configured window. An already stored rate means a previous
/// run covered the window, which is reported as success.
pub async fn run(resolver: &RateResolver, config: &AppConfig) -> Result<()> {
    let pair = resolver
        .get_or_create_pair(&config.pair.from, &config.pair.to, config.pair.amount)
        .await?;
    let source = resolver
        .get_or_create_source(config.backfill_source())
        .await?;

    let window = &config.backfill;
    let today_only = window.start_offset_days == 0 && window.end_offset_days == 0;
    if resolver.capability(&source)? == ProviderCapability::TodayOnly && !today_only {
        anyhow::bail!(
            "Backfill source {} only quotes today's rate; set its provider capability to \
             any_date or choose another backfill.source",
            source.name
        );
    }

    let total = (window.end_offset_days - window.start_offset_days + 1).max(0) as u64;
    let pb = ui::new_progress_bar(total, true);
    pb.set_message(format!("Importing {} rates...", source.name));

    let importer = BackfillImporter::new(resolver, window.on_conflict);
    let result = importer
        .backfill_window(
            &pair,
            &source,
            window.start_offset_days,
            window.end_offset_days,
            &|| pb.inc(1),
        )
        .await;
    pb.finish_and_clear();

    match result {
        Ok(summary) => {
            println!(
                "Import complete: {} added, {} already stored",
                summary.inserted, summary.skipped
            );
            Ok(())
        }
        Err(RateError::RateExists { source_name, date }) => {
            info!(source = %source_name, %date, "Rate already stored, nothing to do");
            println!("Import complete: {source_name} rates already up to date");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
