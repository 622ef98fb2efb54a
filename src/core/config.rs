use crate::core::provider::ProviderCapability;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PairConfig {
    pub from: String,
    pub to: String,
    #[serde(default = "default_amount")]
    pub amount: f64,
}

fn default_amount() -> f64 {
    1.0
}

impl Default for PairConfig {
    fn default() -> Self {
        PairConfig {
            from: "USD".to_string(),
            to: "CAD".to_string(),
            amount: default_amount(),
        }
    }
}

/// Names of the two compared sources, as stored in the rate store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourcesConfig {
    pub historical: String,
    pub card: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            historical: "openexchangerates.org".to_string(),
            card: "visa.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenExchangeRatesConfig {
    pub base_url: String,
    #[serde(default)]
    pub app_id: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisaConfig {
    pub base_url: String,
    /// `user:password` for HTTP basic auth.
    #[serde(default)]
    pub user_pass: String,
    #[serde(default = "default_visa_capability")]
    pub capability: ProviderCapability,
    /// PEM file holding the client certificate and private key.
    #[serde(default)]
    pub client_identity: Option<PathBuf>,
}

fn default_visa_capability() -> ProviderCapability {
    ProviderCapability::AnyDate
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openexchangerates: Option<OpenExchangeRatesConfig>,
    pub visa: Option<VisaConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            openexchangerates: Some(OpenExchangeRatesConfig {
                base_url: "https://openexchangerates.org".to_string(),
                app_id: String::new(),
            }),
            visa: Some(VisaConfig {
                base_url: "https://sandbox.api.visa.com".to_string(),
                user_pass: String::new(),
                capability: default_visa_capability(),
                client_identity: None,
            }),
        }
    }
}

/// Bounds of the report window relative to the anchor date.
///
/// The window covers `days` consecutive days, the last one being
/// `anchor + end_offset_days`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub days: u32,
    #[serde(default)]
    pub end_offset_days: i64,
}

impl Default for ReportWindow {
    fn default() -> Self {
        ReportWindow {
            days: 30,
            end_offset_days: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Stop at the first rate that is already stored.
    #[default]
    Abort,
    /// Count already stored rates and move on to the next day.
    Skip,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackfillConfig {
    /// Source to import; defaults to the card source.
    pub source: Option<String>,
    pub start_offset_days: i64,
    pub end_offset_days: i64,
    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        BackfillConfig {
            source: None,
            start_offset_days: -31,
            end_offset_days: -1,
            on_conflict: ConflictPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pair: PairConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub report: ReportWindow,
    #[serde(default)]
    pub backfill: BackfillConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "ratewatch", "ratewatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "ratewatch", "ratewatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Name of the source the backfill command imports.
    pub fn backfill_source(&self) -> &str {
        self.backfill.source.as_deref().unwrap_or(&self.sources.card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
pair:
  from: "EUR"
  to: "GBP"
  amount: 100
sources:
  historical: "oxr"
  card: "visa"
providers:
  openexchangerates:
    base_url: "http://example.com/oxr"
    app_id: "abc123"
  visa:
    base_url: "http://example.com/visa"
    user_pass: "user:pass"
    capability: any_date
    client_identity: "/etc/ratewatch/visa.pem"
report:
  days: 31
  end_offset_days: -1
backfill:
  source: "visa"
  start_offset_days: -10
  end_offset_days: -2
  on_conflict: skip
data_path: "/tmp/ratewatch"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.pair.from, "EUR");
        assert_eq!(config.pair.to, "GBP");
        assert_eq!(config.pair.amount, 100.0);
        assert_eq!(config.sources.historical, "oxr");
        assert_eq!(config.sources.card, "visa");

        let oxr = config.providers.openexchangerates.unwrap();
        assert_eq!(oxr.base_url, "http://example.com/oxr");
        assert_eq!(oxr.app_id, "abc123");

        let visa = config.providers.visa.unwrap();
        assert_eq!(visa.capability, ProviderCapability::AnyDate);
        assert_eq!(visa.user_pass, "user:pass");
        assert_eq!(
            visa.client_identity,
            Some(PathBuf::from("/etc/ratewatch/visa.pem"))
        );

        assert_eq!(
            config.report,
            ReportWindow {
                days: 31,
                end_offset_days: -1
            }
        );
        assert_eq!(config.backfill.start_offset_days, -10);
        assert_eq!(config.backfill.end_offset_days, -2);
        assert_eq!(config.backfill.on_conflict, ConflictPolicy::Skip);
        assert_eq!(config.data_path.as_deref(), Some("/tmp/ratewatch"));
    }

    #[test]
    fn test_config_defaults() {
        let yaml_str = r#"
providers:
  visa:
    base_url: "http://example.com/visa"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");

        assert_eq!(config.pair, PairConfig::default());
        assert_eq!(config.sources, SourcesConfig::default());
        assert!(config.providers.openexchangerates.is_none());
        // Visa is the default backfill source, so it must accept past dates
        let visa = config.providers.visa.as_ref().unwrap();
        assert_eq!(visa.capability, ProviderCapability::AnyDate);
        assert!(visa.client_identity.is_none());
        assert_eq!(config.report, ReportWindow::default());
        assert_eq!(config.backfill, BackfillConfig::default());
        assert_eq!(config.backfill.on_conflict, ConflictPolicy::Abort);
        assert_eq!(config.backfill_source(), "visa.com");
    }
}
