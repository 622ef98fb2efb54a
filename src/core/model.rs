//! Records held by the rate store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// A named rate provider, e.g. `openexchangerates.org`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSource {
    pub id: Uuid,
    pub name: String,
}

/// A conversion identity, unique by `(from, to, amount)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePair {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl Display for RatePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} to {}", self.amount, self.from, self.to)
    }
}

/// A stored rate for one pair, source and calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateValue {
    pub id: Uuid,
    pub rate_pair_id: Uuid,
    pub rate_source_id: Uuid,
    pub date: NaiveDate,
    pub value: f64,
}

impl RateValue {
    pub fn key(&self) -> RateKey {
        RateKey {
            rate_pair_id: self.rate_pair_id,
            rate_source_id: self.rate_source_id,
            date: self.date,
        }
    }
}

/// Unique key of a `RateValue`. At most one value is ever stored per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateKey {
    pub rate_pair_id: Uuid,
    pub rate_source_id: Uuid,
    pub date: NaiveDate,
}

impl RateKey {
    pub fn new(pair: &RatePair, source: &RateSource, date: NaiveDate) -> Self {
        Self {
            rate_pair_id: pair.id,
            rate_source_id: source.id,
            date,
        }
    }
}

impl Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.rate_pair_id,
            self.rate_source_id,
            self.date.format("%Y-%m-%d")
        )
    }
}
