//! Rate provider abstractions

use crate::core::model::RatePair;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which dates a provider can answer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCapability {
    /// Arbitrary past dates.
    #[default]
    AnyDate,
    /// Only the current calendar day.
    TodayOnly,
}

impl ProviderCapability {
    pub fn supports(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            ProviderCapability::AnyDate => true,
            ProviderCapability::TodayOnly => date == today,
        }
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    fn capability(&self) -> ProviderCapability;

    /// Fetches the rate of `pair` for `date`. The returned value is the
    /// amount of `pair.to` received for `pair.amount` of `pair.from`.
    async fn fetch_rate(&self, pair: &RatePair, date: NaiveDate) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_supports() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();

        assert!(ProviderCapability::AnyDate.supports(yesterday, today));
        assert!(ProviderCapability::AnyDate.supports(today, today));
        assert!(ProviderCapability::TodayOnly.supports(today, today));
        assert!(!ProviderCapability::TodayOnly.supports(yesterday, today));
    }

    #[test]
    fn test_capability_deserialization() {
        let cap: ProviderCapability = serde_yaml::from_str("today_only").unwrap();
        assert_eq!(cap, ProviderCapability::TodayOnly);
        let cap: ProviderCapability = serde_yaml::from_str("any_date").unwrap();
        assert_eq!(cap, ProviderCapability::AnyDate);
    }
}
