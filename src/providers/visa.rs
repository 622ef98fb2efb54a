use crate::core::config::VisaConfig;
use crate::core::{ProviderCapability, RatePair, RateProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const FX_RATES_PATH: &str = "/forexrates/v1/foreignexchangerates";

/// ISO 4217 numeric code, as the Visa API expects.
fn numeric_currency_code(code: &str) -> Option<&'static str> {
    let numeric = match code {
        "AUD" => "036",
        "CAD" => "124",
        "CHF" => "756",
        "CNY" => "156",
        "EUR" => "978",
        "GBP" => "826",
        "HKD" => "344",
        "INR" => "356",
        "JPY" => "392",
        "MXN" => "484",
        "NZD" => "554",
        "SEK" => "752",
        "SGD" => "702",
        "USD" => "840",
        _ => return None,
    };
    Some(numeric)
}

/// Card-network rates from Visa's foreign exchange rates API.
pub struct VisaProvider {
    base_url: String,
    user_pass: String,
    capability: ProviderCapability,
    client: reqwest::Client,
}

impl VisaProvider {
    pub fn new(config: &VisaConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("ratewatch/1.0");
        if let Some(identity_path) = &config.client_identity {
            let pem = std::fs::read(identity_path).with_context(|| {
                format!(
                    "Failed to read Visa client identity: {}",
                    identity_path.display()
                )
            })?;
            let identity = reqwest::Identity::from_pem(&pem).with_context(|| {
                format!("Invalid Visa client identity: {}", identity_path.display())
            })?;
            builder = builder.identity(identity);
        }

        Ok(VisaProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_pass: config.user_pass.clone(),
            capability: config.capability,
            client: builder.build()?,
        })
    }

    fn is_sandbox(&self) -> bool {
        reqwest::Url::parse(&self.base_url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.contains("sandbox")))
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRateRequest {
    destination_currency_code: &'static str,
    source_currency_code: &'static str,
    source_amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRateResponse {
    conversion_rate: String,
}

#[async_trait]
impl RateProvider for VisaProvider {
    fn capability(&self) -> ProviderCapability {
        self.capability
    }

    #[instrument(
        name = "VisaRateFetch",
        skip(self, pair),
        fields(from = %pair.from, to = %pair.to)
    )]
    async fn fetch_rate(&self, pair: &RatePair, date: NaiveDate) -> Result<f64> {
        let request = ExchangeRateRequest {
            destination_currency_code: numeric_currency_code(&pair.to)
                .ok_or_else(|| anyhow!("Unsupported currency: {}", pair.to))?,
            source_currency_code: numeric_currency_code(&pair.from)
                .ok_or_else(|| anyhow!("Unsupported currency: {}", pair.from))?,
            source_amount: pair.amount.to_string(),
            date: match self.capability {
                ProviderCapability::AnyDate => Some(date.format("%Y-%m-%d").to_string()),
                ProviderCapability::TodayOnly => None,
            },
        };

        let url = format!("{}{}", self.base_url, FX_RATES_PATH);
        debug!("Requesting card rate from {}", url);

        let (user, pass) = self
            .user_pass
            .split_once(':')
            .unwrap_or((self.user_pass.as_str(), ""));
        let response = self
            .client
            .post(&url)
            .basic_auth(user, Some(pass))
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for date: {}", e, date))?;

        if !response.status().is_success() {
            return Err(anyhow!("Bad HTTP response: {}", response.status()));
        }

        let text = response.text().await?;
        let data: ExchangeRateResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", date, e))?;
        let rate: f64 = data
            .conversion_rate
            .trim()
            .parse()
            .with_context(|| format!("Invalid conversion rate: {}", data.conversion_rate))?;

        // The sandbox answers with placeholder rates
        if self.is_sandbox() && rate <= 1.0 {
            return Err(anyhow!("Fake rate {} returned from Visa API sandbox", rate));
        }

        debug!(rate, "Received card rate");
        Ok(rate)
    }
}
