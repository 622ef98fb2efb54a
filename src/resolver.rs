//! Resolves rates from the store, falling back to the source's provider.

use crate::core::error::{RateError, Result, StoreError};
use crate::core::{
    Clock, ProviderCapability, RateKey, RatePair, RateProvider, RateSource, RateStore,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RateResolver {
    store: Arc<dyn RateStore>,
    providers: HashMap<String, Arc<dyn RateProvider>>,
    clock: Arc<dyn Clock>,
}

impl RateResolver {
    pub fn new(store: Arc<dyn RateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            providers: HashMap::new(),
            clock,
        }
    }

    /// Registers the provider answering for the source named `source_name`.
    pub fn with_provider(mut self, source_name: &str, provider: Arc<dyn RateProvider>) -> Self {
        self.providers.insert(source_name.to_string(), provider);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn get_or_create_pair(&self, from: &str, to: &str, amount: f64) -> Result<RatePair> {
        if let Some(pair) = self.store.find_pair(from, to, amount).await? {
            return Ok(pair);
        }

        match self.store.insert_pair(from, to, amount).await {
            Ok(pair) => {
                info!(%pair, "Created rate pair");
                Ok(pair)
            }
            // Lost an insert race; the winner's record is the identity.
            Err(StoreError::Conflict(_)) => self
                .store
                .find_pair(from, to, amount)
                .await?
                .ok_or_else(|| {
                    StoreError::Backend(format!("Pair {from}/{to}/{amount} vanished after conflict"))
                        .into()
                }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_or_create_source(&self, name: &str) -> Result<RateSource> {
        if let Some(source) = self.store.find_source(name).await? {
            return Ok(source);
        }

        match self.store.insert_source(name).await {
            Ok(source) => {
                info!(source = %name, "Created rate source");
                Ok(source)
            }
            Err(StoreError::Conflict(_)) => {
                self.store.find_source(name).await?.ok_or_else(|| {
                    StoreError::Backend(format!("Source {name} vanished after conflict")).into()
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the rate for `date`, from the store when present, otherwise
    /// from the source's provider.
    ///
    /// Rates for today (or later) are returned without being stored since
    /// they keep changing until the day closes.
    pub async fn resolve_rate(
        &self,
        pair: &RatePair,
        source: &RateSource,
        date: NaiveDate,
    ) -> Result<f64> {
        let key = RateKey::new(pair, source, date);
        if let Some(stored) = self.store.find_rate(&key).await? {
            debug!(source = %source.name, %date, "Rate cache HIT");
            return Ok(stored.value);
        }
        debug!(source = %source.name, %date, "Rate cache MISS");

        let value = self.fetch(pair, source, date).await?;

        if date >= self.today() {
            debug!(source = %source.name, %date, "Not caching provisional rate");
            return Ok(value);
        }

        match self.store.insert_rate(&key, value).await {
            Ok(stored) => {
                info!(source = %source.name, %date, value, "Cached rate");
                Ok(stored.value)
            }
            // Someone stored this key first; keep a single value per key.
            Err(StoreError::Conflict(_)) => match self.store.find_rate(&key).await? {
                Some(stored) => Ok(stored.value),
                None => Err(StoreError::Backend(format!("Rate {key} vanished after conflict")).into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Capability of the provider registered for `source`.
    pub fn capability(&self, source: &RateSource) -> Result<ProviderCapability> {
        self.providers
            .get(&source.name)
            .map(|provider| provider.capability())
            .ok_or_else(|| RateError::UnknownSource(source.name.clone()))
    }

    /// Date of the newest stored rate for the pair and source.
    pub async fn most_recent_date(&self, pair: &RatePair, source: &RateSource) -> Result<NaiveDate> {
        self.store
            .find_most_recent_rate(pair.id, source.id)
            .await?
            .map(|rate| rate.date)
            .ok_or_else(|| RateError::NoRatesFound(source.name.clone()))
    }

    /// Stores a rate, failing with `RateExists` if one is already stored
    /// for the same pair, source and date.
    pub async fn add_rate_value(
        &self,
        pair: &RatePair,
        source: &RateSource,
        date: NaiveDate,
        value: f64,
    ) -> Result<()> {
        let key = RateKey::new(pair, source, date);
        match self.store.insert_rate(&key, value).await {
            Ok(_) => {
                info!(source = %source.name, %date, value, "Added rate");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => Err(RateError::RateExists {
                source_name: source.name.clone(),
                date,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches from the source's provider after checking it can answer for
    /// `date`. Nothing is stored.
    pub(crate) async fn fetch(
        &self,
        pair: &RatePair,
        source: &RateSource,
        date: NaiveDate,
    ) -> Result<f64> {
        let provider = self
            .providers
            .get(&source.name)
            .ok_or_else(|| RateError::UnknownSource(source.name.clone()))?;

        if !provider.capability().supports(date, self.today()) {
            return Err(RateError::UnsupportedDate {
                source_name: source.name.clone(),
                date,
            });
        }

        let value = provider
            .fetch_rate(pair, date)
            .await
            .map_err(RateError::Provider)?;

        if !value.is_finite() || value <= 0.0 {
            return Err(RateError::InvalidRate {
                source_name: source.name.clone(),
                date,
                value,
            });
        }
        Ok(value)
    }
}
