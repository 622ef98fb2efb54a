use crate::core::error::StoreError;
use crate::core::model::{RateKey, RatePair, RateSource, RateValue};
use crate::core::store::{RateStore, pair_key};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    pairs: HashMap<String, RatePair>,
    sources: HashMap<String, RateSource>,
    rates: BTreeMap<RateKey, RateValue>,
}

/// In-memory rate store, used for tests and dry runs.
#[derive(Default)]
pub struct MemoryRateStore {
    inner: Mutex<Tables>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rate values held, across all pairs and sources.
    pub async fn rate_count(&self) -> usize {
        self.inner.lock().await.rates.len()
    }

    /// Number of pairs held.
    pub async fn pair_count(&self) -> usize {
        self.inner.lock().await.pairs.len()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn find_pair(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<Option<RatePair>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables.pairs.get(&pair_key(from, to, amount)).cloned())
    }

    async fn insert_pair(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<RatePair, StoreError> {
        let key = pair_key(from, to, amount);
        let mut tables = self.inner.lock().await;
        if tables.pairs.contains_key(&key) {
            return Err(StoreError::Conflict(format!("pair {key}")));
        }
        let pair = RatePair {
            id: Uuid::new_v4(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
        };
        debug!("Store PUT pair {}", key);
        tables.pairs.insert(key, pair.clone());
        Ok(pair)
    }

    async fn find_source(&self, name: &str) -> Result<Option<RateSource>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables.sources.get(name).cloned())
    }

    async fn insert_source(&self, name: &str) -> Result<RateSource, StoreError> {
        let mut tables = self.inner.lock().await;
        if tables.sources.contains_key(name) {
            return Err(StoreError::Conflict(format!("source {name}")));
        }
        let source = RateSource {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        debug!("Store PUT source {}", name);
        tables.sources.insert(name.to_string(), source.clone());
        Ok(source)
    }

    async fn find_rate(&self, key: &RateKey) -> Result<Option<RateValue>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables.rates.get(key).cloned())
    }

    async fn insert_rate(&self, key: &RateKey, value: f64) -> Result<RateValue, StoreError> {
        let mut tables = self.inner.lock().await;
        if tables.rates.contains_key(key) {
            return Err(StoreError::Conflict(format!("rate {key}")));
        }
        let rate = RateValue {
            id: Uuid::new_v4(),
            rate_pair_id: key.rate_pair_id,
            rate_source_id: key.rate_source_id,
            date: key.date,
            value,
        };
        debug!("Store PUT rate {}", key);
        tables.rates.insert(rate.key(), rate.clone());
        Ok(rate)
    }

    async fn find_most_recent_rate(
        &self,
        rate_pair_id: Uuid,
        rate_source_id: Uuid,
    ) -> Result<Option<RateValue>, StoreError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .rates
            .values()
            .filter(|r| r.rate_pair_id == rate_pair_id && r.rate_source_id == rate_source_id)
            .max_by_key(|r| r.date)
            .cloned())
    }
}
