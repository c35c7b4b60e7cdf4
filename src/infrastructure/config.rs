use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use secrecy::{ExposeSecret, Secret, SecretString};
use serde::Deserialize;
use std::env;
use std::time::Duration;

fn empty_secret() -> SecretString {
  Secret::new(String::new())
}

fn default_crm_base_url() -> String {
  "https://api.hubapi.com".to_string()
}

fn default_page_size() -> u32 {
  100
}

fn default_invoice_folder() -> String {
  "/invoices".to_string()
}

fn default_billing_base_url() -> String {
  "https://api.mijnwefact.nl/v2/".to_string()
}

fn default_invoice_code_prefix() -> String {
  "hs".to_string()
}

fn default_db_url() -> String {
  "sqlite:///tmp/hubspot-wefact.db".to_string()
}

fn default_db_max_connections() -> u32 {
  1
}

fn default_db_connect_timeout() -> u64 {
  5
}

fn default_http_timeout() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  3
}

fn default_backoff_millis() -> u64 {
  1000
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub crm: CrmConfig,
  #[serde(default)]
  pub billing: BillingConfig,
  #[serde(default)]
  pub database: DatabaseConfig,
  #[serde(default)]
  pub http: HttpConfig,
}

/// CRM (HubSpot) connection
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
  #[serde(default = "default_crm_base_url")]
  pub base_url: String,
  /// Private app access token
  #[serde(default = "empty_secret")]
  pub access_token: SecretString,
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// File manager folder receiving invoice PDFs
  #[serde(default = "default_invoice_folder")]
  pub invoice_folder: String,
}

impl Default for CrmConfig {
  fn default() -> Self {
    Self {
      base_url: default_crm_base_url(),
      access_token: empty_secret(),
      page_size: default_page_size(),
      invoice_folder: default_invoice_folder(),
    }
  }
}

/// Billing system (WeFact) connection
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
  #[serde(default = "default_billing_base_url")]
  pub base_url: String,
  #[serde(default = "empty_secret")]
  pub api_key: SecretString,
  #[serde(default = "default_invoice_code_prefix")]
  pub invoice_code_prefix: String,
  #[serde(default)]
  pub update_existing_debtors: bool,
}

impl Default for BillingConfig {
  fn default() -> Self {
    Self {
      base_url: default_billing_base_url(),
      api_key: empty_secret(),
      invoice_code_prefix: default_invoice_code_prefix(),
      update_existing_debtors: false,
    }
  }
}

/// Dedup store
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
  #[serde(default = "default_db_url")]
  pub url: String,
  #[serde(default = "default_db_max_connections")]
  pub max_connections: u32,
  #[serde(default = "default_db_connect_timeout")]
  pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      url: default_db_url(),
      max_connections: default_db_max_connections(),
      connect_timeout_seconds: default_db_connect_timeout(),
    }
  }
}

/// Outbound HTTP behaviour shared by both gateways
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  #[serde(default = "default_http_timeout")]
  pub timeout_seconds: u64,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_backoff_millis")]
  pub backoff_millis: u64,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_seconds: default_http_timeout(),
      max_retries: default_max_retries(),
      backoff_millis: default_backoff_millis(),
    }
  }
}

impl HttpConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }

  pub fn backoff(&self) -> Duration {
    Duration::from_millis(self.backoff_millis)
  }
}

impl Config {
  /// Load configuration from files and environment variables
  ///
  /// Configuration is loaded in the following order (later sources override earlier ones):
  /// 1. config/default.toml (if exists)
  /// 2. config/{RUN_MODE}.toml (if exists, RUN_MODE defaults to `development`)
  /// 3. config/local.toml (if exists)
  /// 4. Environment variables with BILLSYNC_ prefix
  /// 5. `HUBSPOT_ACCESS_TOKEN` and `WEFACT_API_KEY`
  ///
  /// # Environment Variables
  ///
  /// Environment variables use the BILLSYNC_ prefix and are separated by double underscores:
  /// - `BILLSYNC_CRM__ACCESS_TOKEN=pat-eu1-...`
  /// - `BILLSYNC_CRM__PAGE_SIZE=50`
  /// - `BILLSYNC_BILLING__API_KEY=...`
  /// - `BILLSYNC_BILLING__UPDATE_EXISTING_DEBTORS=true`
  /// - `BILLSYNC_DATABASE__URL=sqlite:///var/lib/billsync/processed.db`
  /// - `BILLSYNC_HTTP__MAX_RETRIES=5`
  ///
  /// Call [`Config::validate`] before using the credentials.
  pub fn load() -> Result<Self, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    let config = ConfigBuilder::builder()
      .add_source(File::with_name("config/default").required(false))
      .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
      // Add optional local configuration (for local development overrides)
      .add_source(File::with_name("config/local").required(false))
      .add_source(
        Environment::with_prefix("BILLSYNC")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .set_override_option("crm.access_token", env::var("HUBSPOT_ACCESS_TOKEN").ok())?
      .set_override_option("billing.api_key", env::var("WEFACT_API_KEY").ok())?
      .build()?;

    config.try_deserialize()
  }

  /// Rejects a configuration without CRM or billing credentials.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.crm.access_token.expose_secret().trim().is_empty() {
      return Err(ConfigError::Message(
        "crm.access_token is not set (HUBSPOT_ACCESS_TOKEN)".to_string(),
      ));
    }
    if self.billing.api_key.expose_secret().trim().is_empty() {
      return Err(ConfigError::Message(
        "billing.api_key is not set (WEFACT_API_KEY)".to_string(),
      ));
    }
    if self.crm.page_size == 0 {
      return Err(ConfigError::Message(
        "crm.page_size must be positive".to_string(),
      ));
    }
    Ok(())
  }
}
