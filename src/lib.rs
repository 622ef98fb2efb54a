pub mod backfill;
pub mod cli;
pub mod core;
pub mod providers;
pub mod report;
pub mod resolver;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{Clock, RateStore, SystemClock};
use crate::providers::{OpenExchangeRatesProvider, VisaProvider};
use crate::resolver::RateResolver;
use crate::store::DiskRateStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Report,
    Backfill,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ratewatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    let data_path = config.default_data_path()?.join("rates");
    debug!("Using rate store at {}", data_path.display());
    let store = Arc::new(DiskRateStore::open(&data_path)?);
    let resolver = build_resolver(&config, store, Arc::new(SystemClock))?;

    match command {
        AppCommand::Report => cli::report::run(&resolver, &config).await,
        AppCommand::Backfill => cli::backfill::run(&resolver, &config).await,
    }
}

/// Wires the configured providers to their source names.
pub fn build_resolver(
    config: &AppConfig,
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
) -> Result<RateResolver> {
    let mut resolver = RateResolver::new(store, clock);

    if let Some(oxr) = &config.providers.openexchangerates {
        resolver = resolver.with_provider(
            &config.sources.historical,
            Arc::new(OpenExchangeRatesProvider::new(oxr)?),
        );
    }
    if let Some(visa) = &config.providers.visa {
        resolver = resolver.with_provider(&config.sources.card, Arc::new(VisaProvider::new(visa)?));
    }

    Ok(resolver)
}
