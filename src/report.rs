//! Day-by-day comparison of the card-network rate against the historical
//! rate, anchored at the most recent stored card-network rate.

use crate::core::config::{PairConfig, ReportWindow};
use crate::core::error::Result;
use crate::core::{RatePair, RateSource};
use crate::resolver::RateResolver;
use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct DailyComparison {
    pub date: NaiveDate,
    pub historical_rate: f64,
    pub card_rate: f64,
    pub deviation_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AverageComparison {
    pub historical_rate: f64,
    pub card_rate: f64,
    pub deviation_pct: f64,
}

#[derive(Debug, Clone)]
pub struct RateComparison {
    pub pair: RatePair,
    pub historical_source: String,
    pub card_source: String,
    pub anchor: NaiveDate,
    pub requested_days: u32,
    pub days: Vec<DailyComparison>,
    /// `None` when no day could be compared.
    pub average: Option<AverageComparison>,
}

impl RateComparison {
    /// True when the card-network series stopped before the window ended.
    pub fn is_truncated(&self) -> bool {
        self.days.len() < self.requested_days as usize
    }
}

/// Percentage by which `card_rate` deviates from `reference_rate`.
pub fn deviation_pct(card_rate: f64, reference_rate: f64) -> f64 {
    card_rate / reference_rate * 100.0 - 100.0
}

pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

impl ReportWindow {
    /// Consecutive days of the window, oldest first.
    pub fn dates(&self, anchor: NaiveDate) -> Vec<NaiveDate> {
        let end = if self.end_offset_days < 0 {
            anchor.checked_sub_days(Days::new(self.end_offset_days.unsigned_abs()))
        } else {
            anchor.checked_add_days(Days::new(self.end_offset_days as u64))
        };
        let Some(end) = end else {
            return Vec::new();
        };

        let mut dates: Vec<NaiveDate> = (0..self.days as u64)
            .map_while(|back| end.checked_sub_days(Days::new(back)))
            .collect();
        dates.reverse();
        dates
    }
}

/// Compares `card` against `historical` over `window`.
///
/// A card-network rate that cannot be resolved ends the series early; the
/// comparison is returned with the days collected so far. A historical
/// rate that cannot be resolved is an error.
pub async fn compare_sources(
    resolver: &RateResolver,
    pair: &RatePair,
    historical: &RateSource,
    card: &RateSource,
    window: &ReportWindow,
) -> Result<RateComparison> {
    let anchor = resolver.most_recent_date(pair, card).await?;
    debug!(%anchor, card = %card.name, "Anchoring report window");

    let mut days = Vec::new();
    for date in window.dates(anchor) {
        let card_rate = match resolver.resolve_rate(pair, card, date).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!(%date, error = %e, "Stopping report at unresolved card rate");
                break;
            }
        };
        let historical_rate = resolver.resolve_rate(pair, historical, date).await?;

        days.push(DailyComparison {
            date,
            historical_rate,
            card_rate,
            deviation_pct: deviation_pct(card_rate, historical_rate),
        });
    }

    let historical_rates: Vec<f64> = days.iter().map(|d| d.historical_rate).collect();
    let card_rates: Vec<f64> = days.iter().map(|d| d.card_rate).collect();
    let average = average(&historical_rates)
        .zip(average(&card_rates))
        .map(|(historical_rate, card_rate)| AverageComparison {
            historical_rate,
            card_rate,
            deviation_pct: deviation_pct(card_rate, historical_rate),
        });

    Ok(RateComparison {
        pair: pair.clone(),
        historical_source: historical.name.clone(),
        card_source: card.name.clone(),
        anchor,
        requested_days: window.days,
        days,
        average,
    })
}

/// Resolves the configured pair and sources, then compares them.
pub async fn compare_named_sources(
    resolver: &RateResolver,
    pair: &PairConfig,
    historical: &str,
    card: &str,
    window: &ReportWindow,
) -> Result<RateComparison> {
    let pair = resolver
        .get_or_create_pair(&pair.from, &pair.to, pair.amount)
        .await?;
    let historical = resolver.get_or_create_source(historical).await?;
    let card = resolver.get_or_create_source(card).await?;
    compare_sources(resolver, &pair, &historical, &card, window).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FixedClock, ProviderCapability, RateError};
    use crate::resolver::test_utils::MockProvider;
    use crate::store::MemoryRateStore;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    #[test]
    fn test_deviation_pct() {
        assert!((deviation_pct(1.365, 1.35) - 1.111_111).abs() < 1e-5);
        assert!((deviation_pct(1.35, 1.35)).abs() < 1e-12);
        assert!(deviation_pct(1.30, 1.35) < 0.0);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[]), None);
        assert_eq!(average(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_window_ending_at_anchor() {
        let window = ReportWindow {
            days: 3,
            end_offset_days: 0,
        };
        assert_eq!(window.dates(day(10)), vec![day(8), day(9), day(10)]);
    }

    #[test]
    fn test_window_ending_before_anchor() {
        let window = ReportWindow {
            days: 31,
            end_offset_days: -1,
        };
        let dates = window.dates(day(30));
        assert_eq!(dates.len(), 31);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
        assert_eq!(dates[30], day(29));
    }

    #[test]
    fn test_empty_window() {
        let window = ReportWindow {
            days: 0,
            end_offset_days: 0,
        };
        assert!(window.dates(day(10)).is_empty());
    }

    async fn setup(
        card_provider: MockProvider,
        historical_provider: MockProvider,
    ) -> (RateResolver, RatePair, RateSource, RateSource) {
        let store = Arc::new(MemoryRateStore::new());
        let resolver = RateResolver::new(store, Arc::new(FixedClock(day(20))))
            .with_provider("visa.com", Arc::new(card_provider))
            .with_provider("openexchangerates.org", Arc::new(historical_provider));
        let pair = resolver.get_or_create_pair("USD", "CAD", 1.0).await.unwrap();
        let card = resolver.get_or_create_source("visa.com").await.unwrap();
        let historical = resolver
            .get_or_create_source("openexchangerates.org")
            .await
            .unwrap();
        (resolver, pair, historical, card)
    }

    #[tokio::test]
    async fn test_full_window() {
        let (resolver, pair, historical, card) = setup(
            MockProvider::new(ProviderCapability::TodayOnly),
            MockProvider::new(ProviderCapability::AnyDate).with_sequence(&[1.30, 1.32]),
        )
        .await;
        resolver
            .add_rate_value(&pair, &card, day(4), 1.33)
            .await
            .unwrap();
        resolver
            .add_rate_value(&pair, &card, day(5), 1.34)
            .await
            .unwrap();

        let window = ReportWindow {
            days: 2,
            end_offset_days: 0,
        };
        let report = compare_sources(&resolver, &pair, &historical, &card, &window)
            .await
            .unwrap();

        assert_eq!(report.anchor, day(5));
        assert!(!report.is_truncated());
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.days[0].date, day(4));
        assert_eq!(report.days[0].card_rate, 1.33);
        assert_eq!(report.days[0].historical_rate, 1.30);
        assert!((report.days[0].deviation_pct - deviation_pct(1.33, 1.30)).abs() < 1e-12);

        let avg = report.average.unwrap();
        assert!((avg.historical_rate - 1.31).abs() < 1e-12);
        assert!((avg.card_rate - 1.335).abs() < 1e-12);
        assert!((avg.deviation_pct - deviation_pct(1.335, 1.31)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_card_failure_truncates_window() {
        let (resolver, pair, historical, card) = setup(
            MockProvider::new(ProviderCapability::TodayOnly),
            MockProvider::new(ProviderCapability::AnyDate).with_sequence(&[1.3; 5]),
        )
        .await;
        // Day 3 of the window is missing and cannot be fetched
        for d in [1, 2, 4, 5] {
            resolver
                .add_rate_value(&pair, &card, day(d), 1.33)
                .await
                .unwrap();
        }

        let window = ReportWindow {
            days: 5,
            end_offset_days: 0,
        };
        let report = compare_sources(&resolver, &pair, &historical, &card, &window)
            .await
            .unwrap();

        assert_eq!(report.days.len(), 2);
        assert_eq!(report.days[1].date, day(2));
        assert!(report.is_truncated());
        assert!(report.average.is_some());
    }

    #[tokio::test]
    async fn test_historical_failure_is_an_error() {
        let (resolver, pair, historical, card) = setup(
            MockProvider::new(ProviderCapability::TodayOnly),
            MockProvider::new(ProviderCapability::AnyDate),
        )
        .await;
        resolver
            .add_rate_value(&pair, &card, day(5), 1.33)
            .await
            .unwrap();

        let window = ReportWindow {
            days: 1,
            end_offset_days: 0,
        };
        let result = compare_sources(&resolver, &pair, &historical, &card, &window).await;
        assert!(matches!(result, Err(RateError::Provider(_))));
    }

    #[tokio::test]
    async fn test_no_card_rates() {
        let (resolver, pair, historical, card) = setup(
            MockProvider::new(ProviderCapability::TodayOnly),
            MockProvider::new(ProviderCapability::AnyDate),
        )
        .await;

        let result = compare_sources(
            &resolver,
            &pair,
            &historical,
            &card,
            &ReportWindow::default(),
        )
        .await;
        assert!(matches!(result, Err(RateError::NoRatesFound(ref name)) if name == "visa.com"));
    }

    #[tokio::test]
    async fn test_first_day_failure_has_no_average() {
        let (resolver, pair, historical, card) = setup(
            MockProvider::new(ProviderCapability::TodayOnly),
            MockProvider::new(ProviderCapability::AnyDate),
        )
        .await;
        resolver
            .add_rate_value(&pair, &card, day(5), 1.33)
            .await
            .unwrap();

        let window = ReportWindow {
            days: 3,
            end_offset_days: 0,
        };
        let report = compare_sources(&resolver, &pair, &historical, &card, &window)
            .await
            .unwrap();
        assert!(report.days.is_empty());
        assert!(report.average.is_none());
    }
}
