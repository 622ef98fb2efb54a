use crate::core::config::OpenExchangeRatesConfig;
use crate::core::{ProviderCapability, RatePair, RateProvider};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Historical daily rates from openexchangerates.org.
pub struct OpenExchangeRatesProvider {
    base_url: String,
    app_id: String,
    client: reqwest::Client,
}

impl OpenExchangeRatesProvider {
    pub fn new(config: &OpenExchangeRatesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ratewatch/1.0")
            .build()?;
        Ok(OpenExchangeRatesProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    base: String,
    rates: HashMap<String, f64>,
}

impl HistoricalResponse {
    /// Rate of one unit of `currency` expressed in the response base.
    fn base_rate(&self, currency: &str) -> Option<f64> {
        if currency == self.base {
            return Some(1.0);
        }
        self.rates.get(currency).copied()
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn capability(&self) -> ProviderCapability {
        ProviderCapability::AnyDate
    }

    #[instrument(
        name = "OxrRateFetch",
        skip(self, pair),
        fields(from = %pair.from, to = %pair.to)
    )]
    async fn fetch_rate(&self, pair: &RatePair, date: NaiveDate) -> Result<f64> {
        let url = format!(
            "{}/api/historical/{}.json?app_id={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            self.app_id
        );
        debug!("Requesting historical rates for {}", date);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for date: {}", e, date))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for historical rates on {}",
                response.status(),
                date
            ));
        }

        let text = response.text().await?;
        let data: HistoricalResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", date, e))?;

        let from_rate = data
            .base_rate(&pair.from)
            .ok_or_else(|| anyhow!("No rate found for {} on {}", pair.from, date))?;
        let to_rate = data
            .base_rate(&pair.to)
            .ok_or_else(|| anyhow!("No rate found for {} on {}", pair.to, date))?;

        let rate = to_rate / from_rate * pair.amount;
        debug!(rate, "Received historical rate");
        Ok(rate)
    }
}
