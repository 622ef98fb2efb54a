use crate::core::error::StoreError;
use crate::core::model::{RateKey, RatePair, RateSource, RateValue};
use crate::core::store::{RateStore, pair_key};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

impl From<fjall::Error> for StoreError {
    fn from(err: fjall::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Rate store persisted with fjall.
///
/// Rates are keyed `{pair_id}/{source_id}/{YYYY-MM-DD}`, so the last entry
/// under a `{pair_id}/{source_id}/` prefix is the most recent date.
pub struct DiskRateStore {
    keyspace: Keyspace,
    pairs: PartitionHandle,
    sources: PartitionHandle,
    rates: PartitionHandle,
    // Serializes check-then-insert across all partitions.
    write_lock: Mutex<()>,
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(|e| {
            StoreError::Backend(format!("Failed to create {}: {e}", path.display()))
        })?;

        let keyspace = fjall::Config::new(path).open()?;
        let pairs = keyspace.open_partition("pairs", PartitionCreateOptions::default())?;
        let sources = keyspace.open_partition("sources", PartitionCreateOptions::default())?;
        let rates = keyspace.open_partition("rates", PartitionCreateOptions::default())?;
        debug!("Opened rate store at {}", path.display());

        Ok(Self {
            keyspace,
            pairs,
            sources,
            rates,
            write_lock: Mutex::new(()),
        })
    }

    fn get_record<T: DeserializeOwned>(
        partition: &PartitionHandle,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        match partition.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn insert_record<T: Serialize>(
        &self,
        partition: &PartitionHandle,
        key: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if partition.contains_key(key)? {
            return Err(StoreError::Conflict(key.to_string()));
        }
        partition.insert(key, serde_json::to_vec(record)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Store PUT {}", key);
        Ok(())
    }
}

#[async_trait]
impl RateStore for DiskRateStore {
    async fn find_pair(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<Option<RatePair>, StoreError> {
        Self::get_record(&self.pairs, &pair_key(from, to, amount))
    }

    async fn insert_pair(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<RatePair, StoreError> {
        let pair = RatePair {
            id: Uuid::new_v4(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
        };
        self.insert_record(&self.pairs, &pair_key(from, to, amount), &pair)?;
        Ok(pair)
    }

    async fn find_source(&self, name: &str) -> Result<Option<RateSource>, StoreError> {
        Self::get_record(&self.sources, name)
    }

    async fn insert_source(&self, name: &str) -> Result<RateSource, StoreError> {
        let source = RateSource {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.insert_record(&self.sources, name, &source)?;
        Ok(source)
    }

    async fn find_rate(&self, key: &RateKey) -> Result<Option<RateValue>, StoreError> {
        Self::get_record(&self.rates, &key.to_string())
    }

    async fn insert_rate(&self, key: &RateKey, value: f64) -> Result<RateValue, StoreError> {
        let rate = RateValue {
            id: Uuid::new_v4(),
            rate_pair_id: key.rate_pair_id,
            rate_source_id: key.rate_source_id,
            date: key.date,
            value,
        };
        self.insert_record(&self.rates, &rate.key().to_string(), &rate)?;
        Ok(rate)
    }

    async fn find_most_recent_rate(
        &self,
        rate_pair_id: Uuid,
        rate_source_id: Uuid,
    ) -> Result<Option<RateValue>, StoreError> {
        let prefix = format!("{rate_pair_id}/{rate_source_id}/");
        match self.rates.prefix(prefix).next_back() {
            Some(entry) => {
                let (_key, bytes) = entry?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            None => Ok(None),
        }
    }
}
