use anyhow::Context;
use chrono::Local;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billsync::{
  application::sync::{ProcessInvoiceUseCase, SyncInvoicesCommand, SyncInvoicesUseCase},
  domain::billing::{BillingOptions, BillingService},
  infrastructure::{
    billing::WeFactClient, config::Config, crm::HubSpotClient,
    persistence::sqlite::SqliteProcessedInvoiceRepository,
  },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialize environment variables from .env file
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billsync=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  tracing::info!("Starting invoice synchronization");

  let config = Config::load().context("Failed to load configuration")?;
  config.validate().context("Invalid configuration")?;
  tracing::info!("Configuration loaded successfully");

  tracing::info!("Opening dedup store: {}", config.database.url);
  let connect_options = SqliteConnectOptions::from_str(&config.database.url)
    .with_context(|| format!("Invalid database URL {}", config.database.url))?
    .create_if_missing(true);

  let db_pool = tokio::time::timeout(
    Duration::from_secs(config.database.connect_timeout_seconds),
    SqlitePoolOptions::new()
      .max_connections(config.database.max_connections)
      .connect_with(connect_options),
  )
  .await
  .map_err(|_| {
    anyhow::anyhow!(
      "Database connection timed out after {} seconds",
      config.database.connect_timeout_seconds
    )
  })?
  .context("Failed to open dedup store")?;

  sqlx::migrate!("./migrations")
    .run(&db_pool)
    .await
    .context("Failed to run database migrations")?;
  tracing::info!("Database migrations completed");

  let crm = Arc::new(HubSpotClient::new(&config.crm, &config.http)?);
  let billing_gateway = Arc::new(WeFactClient::new(&config.billing, &config.http)?);
  let billing = Arc::new(BillingService::new(
    billing_gateway,
    BillingOptions {
      invoice_code_prefix: config.billing.invoice_code_prefix.clone(),
      update_existing_debtors: config.billing.update_existing_debtors,
    },
  ));
  let processed = Arc::new(SqliteProcessedInvoiceRepository::new(db_pool.clone()));

  let process_invoice = ProcessInvoiceUseCase::new(crm.clone(), billing, processed);
  let sync_invoices = SyncInvoicesUseCase::new(crm, process_invoice);

  let result = sync_invoices
    .execute(SyncInvoicesCommand {
      today: Local::now().date_naive(),
    })
    .await;

  db_pool.close().await;

  match result {
    Ok(report) => {
      tracing::info!("Synchronization finished: {}", report);
      Ok(())
    }
    Err(e) => {
      tracing::error!("Synchronization aborted: {}", e);
      Err(e.into())
    }
  }
}
