//! Imports a window of past rates into the store.

use crate::core::config::ConflictPolicy;
use crate::core::error::{RateError, Result};
use crate::core::{RatePair, RateSource};
use crate::resolver::RateResolver;
use chrono::{Days, NaiveDate};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub inserted: usize,
    pub skipped: usize,
}

pub struct BackfillImporter<'a> {
    resolver: &'a RateResolver,
    on_conflict: ConflictPolicy,
}

impl<'a> BackfillImporter<'a> {
    pub fn new(resolver: &'a RateResolver, on_conflict: ConflictPolicy) -> Self {
        Self {
            resolver,
            on_conflict,
        }
    }

    /// Days covered by `start_offset_days..=end_offset_days` relative to
    /// `today`, oldest first.
    pub fn window_dates(
        today: NaiveDate,
        start_offset_days: i64,
        end_offset_days: i64,
    ) -> Result<Vec<NaiveDate>> {
        if start_offset_days > end_offset_days {
            return Err(RateError::InvalidWindow {
                start: start_offset_days,
                end: end_offset_days,
            });
        }
        (start_offset_days..=end_offset_days)
            .map(|offset| {
                offset_date(today, offset).ok_or(RateError::InvalidWindow {
                    start: start_offset_days,
                    end: end_offset_days,
                })
            })
            .collect()
    }

    /// Fetches and strictly inserts one rate per day of the window.
    ///
    /// Every day is fetched from the provider, stored rates are not
    /// consulted first. With `ConflictPolicy::Abort` the first error of any
    /// kind, including `RateExists`, ends the run; with `Skip` an existing
    /// rate is counted and the run continues.
    pub async fn backfill_window(
        &self,
        pair: &RatePair,
        source: &RateSource,
        start_offset_days: i64,
        end_offset_days: i64,
        progress_callback: &(dyn Fn() + Sync),
    ) -> Result<BackfillSummary> {
        let dates =
            Self::window_dates(self.resolver.today(), start_offset_days, end_offset_days)?;
        info!(
            source = %source.name,
            from = %dates[0],
            to = %dates[dates.len() - 1],
            "Starting backfill"
        );

        let mut summary = BackfillSummary::default();
        for date in dates {
            let value = self.resolver.fetch(pair, source, date).await?;
            match self
                .resolver
                .add_rate_value(pair, source, date, value)
                .await
            {
                Ok(()) => summary.inserted += 1,
                Err(RateError::RateExists { .. }) if self.on_conflict == ConflictPolicy::Skip => {
                    debug!(source = %source.name, %date, "Rate already stored, skipping");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            progress_callback();
        }

        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Backfill complete"
        );
        Ok(summary)
    }
}

fn offset_date(date: NaiveDate, offset: i64) -> Option<NaiveDate> {
    let days = Days::new(offset.unsigned_abs());
    if offset < 0 {
        date.checked_sub_days(days)
    } else {
        date.checked_add_days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FixedClock, ProviderCapability, RateKey, RateStore};
    use crate::resolver::test_utils::MockProvider;
    use crate::store::MemoryRateStore;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn setup(provider: Arc<MockProvider>) -> (Arc<MemoryRateStore>, RateResolver) {
        let store = Arc::new(MemoryRateStore::new());
        let resolver = RateResolver::new(store.clone(), Arc::new(FixedClock(today())))
            .with_provider("visa.com", provider);
        (store, resolver)
    }

    #[test]
    fn test_window_dates_ascending() {
        let dates = BackfillImporter::window_dates(today(), -3, -1).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 27).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            ]
        );
    }

    #[test]
    fn test_window_dates_rejects_inverted_window() {
        let result = BackfillImporter::window_dates(today(), -1, -3);
        assert!(matches!(
            result,
            Err(RateError::InvalidWindow { start: -1, end: -3 })
        ));
    }

    #[tokio::test]
    async fn test_backfill_then_rerun_conflicts() {
        let provider = Arc::new(
            MockProvider::new(ProviderCapability::AnyDate).with_sequence(&[1.31, 1.32, 1.33, 1.34]),
        );
        let (store, resolver) = setup(provider.clone());
        let pair = resolver.get_or_create_pair("USD", "CAD", 1.0).await.unwrap();
        let source = resolver.get_or_create_source("visa.com").await.unwrap();
        let importer = BackfillImporter::new(&resolver, ConflictPolicy::Abort);

        let summary = importer
            .backfill_window(&pair, &source, -3, -1, &|| ())
            .await
            .unwrap();
        assert_eq!(summary.inserted, 3);
        assert_eq!(store.rate_count().await, 3);

        let stored = store
            .find_rate(&RateKey::new(
                &pair,
                &source,
                NaiveDate::from_ymd_opt(2024, 2, 27).unwrap(),
            ))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.value, 1.31);

        let rerun = importer
            .backfill_window(&pair, &source, -3, -1, &|| ())
            .await;
        assert!(matches!(rerun, Err(RateError::RateExists { .. })));
        assert_eq!(store.rate_count().await, 3);
        // Halted after the first duplicate
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_backfill_skip_fills_gaps() {
        let provider =
            Arc::new(MockProvider::new(ProviderCapability::AnyDate).with_sequence(&[1.3; 5]));
        let (store, resolver) = setup(provider);
        let pair = resolver.get_or_create_pair("USD", "CAD", 1.0).await.unwrap();
        let source = resolver.get_or_create_source("visa.com").await.unwrap();
        resolver
            .add_rate_value(
                &pair,
                &source,
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                1.29,
            )
            .await
            .unwrap();

        let progress = std::sync::atomic::AtomicUsize::new(0);
        let importer = BackfillImporter::new(&resolver, ConflictPolicy::Skip);
        let summary = importer
            .backfill_window(&pair, &source, -3, -1, &|| {
                progress.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(
            summary,
            BackfillSummary {
                inserted: 2,
                skipped: 1
            }
        );
        assert_eq!(store.rate_count().await, 3);
        assert_eq!(progress.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_backfill_halts_on_provider_error() {
        let provider =
            Arc::new(MockProvider::new(ProviderCapability::AnyDate).with_sequence(&[1.3]));
        let (store, resolver) = setup(provider);
        let pair = resolver.get_or_create_pair("USD", "CAD", 1.0).await.unwrap();
        let source = resolver.get_or_create_source("visa.com").await.unwrap();

        let importer = BackfillImporter::new(&resolver, ConflictPolicy::Skip);
        let result = importer
            .backfill_window(&pair, &source, -3, -1, &|| ())
            .await;

        assert!(matches!(result, Err(RateError::Provider(_))));
        assert_eq!(store.rate_count().await, 1);
    }

    #[tokio::test]
    async fn test_backfill_today_only_source_fails() {
        let provider =
            Arc::new(MockProvider::new(ProviderCapability::TodayOnly).with_sequence(&[1.3]));
        let (store, resolver) = setup(provider.clone());
        let pair = resolver.get_or_create_pair("USD", "CAD", 1.0).await.unwrap();
        let source = resolver.get_or_create_source("visa.com").await.unwrap();

        let importer = BackfillImporter::new(&resolver, ConflictPolicy::Abort);
        let result = importer
            .backfill_window(&pair, &source, -2, -1, &|| ())
            .await;

        assert!(matches!(result, Err(RateError::UnsupportedDate { .. })));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.rate_count().await, 0);
    }
}
