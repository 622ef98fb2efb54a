//! Persistent store abstractions

use crate::core::error::StoreError;
use crate::core::model::{RateKey, RatePair, RateSource, RateValue};
use async_trait::async_trait;
use uuid::Uuid;

/// Keyed store of pairs, sources and rate values.
///
/// Lookups return `Ok(None)` when nothing matches. Inserts fail with
/// `StoreError::Conflict` when the unique key is already taken; the check
/// and the write happen atomically inside the store.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn find_pair(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<Option<RatePair>, StoreError>;

    async fn insert_pair(&self, from: &str, to: &str, amount: f64)
    -> Result<RatePair, StoreError>;

    async fn find_source(&self, name: &str) -> Result<Option<RateSource>, StoreError>;

    async fn insert_source(&self, name: &str) -> Result<RateSource, StoreError>;

    async fn find_rate(&self, key: &RateKey) -> Result<Option<RateValue>, StoreError>;

    async fn insert_rate(&self, key: &RateKey, value: f64) -> Result<RateValue, StoreError>;

    /// Returns the stored value with the newest date for the pair and source.
    async fn find_most_recent_rate(
        &self,
        rate_pair_id: Uuid,
        rate_source_id: Uuid,
    ) -> Result<Option<RateValue>, StoreError>;
}

/// Canonical key of a pair, shared by store implementations.
pub(crate) fn pair_key(from: &str, to: &str, amount: f64) -> String {
    format!("{from}/{to}/{amount}")
}
