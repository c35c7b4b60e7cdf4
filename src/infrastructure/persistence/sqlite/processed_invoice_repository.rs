use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::invoice::{
  InvoiceError, InvoiceNumber, ProcessedInvoice, ProcessedInvoiceKey, ProcessedInvoiceRepository,
};

/// SQLite implementation of ProcessedInvoiceRepository
pub struct SqliteProcessedInvoiceRepository {
  pool: SqlitePool,
}

impl SqliteProcessedInvoiceRepository {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ProcessedInvoiceRepository for SqliteProcessedInvoiceRepository {
  async fn exists(&self, key: &ProcessedInvoiceKey) -> Result<bool, InvoiceError> {
    let found = sqlx::query_scalar::<_, i64>(
      r#"
            SELECT 1
            FROM processed_invoices
            WHERE invoice_number = ? AND status = ?
            "#,
    )
    .bind(key.number.value())
    .bind(key.status.as_str())
    .fetch_optional(&self.pool)
    .await?;

    Ok(found.is_some())
  }

  async fn record(&self, processed: ProcessedInvoice) -> Result<(), InvoiceError> {
    let mut tx = self.pool.begin().await?;

    let result = sqlx::query(
      r#"
            INSERT INTO processed_invoices (
                invoice_number,
                status,
                crm_invoice_id,
                billing_invoice_code,
                processed_at
            )
            VALUES (?, ?, ?, ?, ?)
            "#,
    )
    .bind(processed.key.number.value())
    .bind(processed.key.status.as_str())
    .bind(&processed.crm_invoice_id)
    .bind(&processed.billing_invoice_code)
    .bind(processed.processed_at)
    .execute(&mut *tx)
    .await;

    match result {
      Ok(_) => {
        tx.commit().await?;
        Ok(())
      }
      Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
        tx.rollback().await?;
        Err(InvoiceError::AlreadyRecorded(processed.key))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn find_billing_code(
    &self,
    number: &InvoiceNumber,
  ) -> Result<Option<String>, InvoiceError> {
    let code = sqlx::query_scalar::<_, String>(
      r#"
            SELECT billing_invoice_code
            FROM processed_invoices
            WHERE invoice_number = ? AND billing_invoice_code IS NOT NULL
            ORDER BY processed_at DESC, rowid DESC
            LIMIT 1
            "#,
    )
    .bind(number.value())
    .fetch_optional(&self.pool)
    .await?;

    Ok(code)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::invoice::InvoiceStatus;
  use chrono::{Duration, Utc};
  use sqlx::sqlite::SqlitePoolOptions;

  async fn setup_test_db() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .expect("Failed to run migrations");

    pool
  }

  fn key(number: &str, status: InvoiceStatus) -> ProcessedInvoiceKey {
    ProcessedInvoiceKey::new(InvoiceNumber::new(number.to_string()).unwrap(), status)
  }

  #[tokio::test]
  async fn test_record_and_exists() {
    let repo = SqliteProcessedInvoiceRepository::new(setup_test_db().await);
    let open = key("INV-1001", InvoiceStatus::Open);

    assert!(!repo.exists(&open).await.unwrap());

    repo
      .record(ProcessedInvoice::new(
        open.clone(),
        "501".to_string(),
        Some("hs202610001".to_string()),
      ))
      .await
      .unwrap();

    assert!(repo.exists(&open).await.unwrap());
    assert!(
      !repo
        .exists(&key("INV-1001", InvoiceStatus::Paid))
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn test_duplicate_key_is_rejected() {
    let pool = setup_test_db().await;
    let repo = SqliteProcessedInvoiceRepository::new(pool.clone());
    let open = key("INV-1002", InvoiceStatus::Open);

    repo
      .record(ProcessedInvoice::new(open.clone(), "502".to_string(), None))
      .await
      .unwrap();
    let result = repo
      .record(ProcessedInvoice::new(open.clone(), "502".to_string(), None))
      .await;

    assert!(matches!(result, Err(InvoiceError::AlreadyRecorded(k)) if k == open));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed_invoices")
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(count, 1);
  }

  #[tokio::test]
  async fn test_find_billing_code_returns_latest_code() {
    let repo = SqliteProcessedInvoiceRepository::new(setup_test_db().await);
    let number = InvoiceNumber::new("INV-1003".to_string()).unwrap();

    assert_eq!(repo.find_billing_code(&number).await.unwrap(), None);

    let mut open = ProcessedInvoice::new(
      key("INV-1003", InvoiceStatus::Open),
      "503".to_string(),
      Some("hs202609001".to_string()),
    );
    open.processed_at = Utc::now() - Duration::days(30);
    repo.record(open).await.unwrap();

    let paid = ProcessedInvoice::new(
      key("INV-1003", InvoiceStatus::Paid),
      "503".to_string(),
      Some("hs202610004".to_string()),
    );
    repo.record(paid).await.unwrap();

    assert_eq!(
      repo.find_billing_code(&number).await.unwrap().as_deref(),
      Some("hs202610004")
    );
  }

  #[tokio::test]
  async fn test_find_billing_code_skips_records_without_code() {
    let repo = SqliteProcessedInvoiceRepository::new(setup_test_db().await);
    let number = InvoiceNumber::new("INV-1004".to_string()).unwrap();

    let mut open = ProcessedInvoice::new(
      key("INV-1004", InvoiceStatus::Open),
      "504".to_string(),
      Some("hs202610002".to_string()),
    );
    open.processed_at = Utc::now() - Duration::days(1);
    repo.record(open).await.unwrap();
    repo
      .record(ProcessedInvoice::new(
        key("INV-1004", InvoiceStatus::Paid),
        "504".to_string(),
        None,
      ))
      .await
      .unwrap();

    assert_eq!(
      repo.find_billing_code(&number).await.unwrap().as_deref(),
      Some("hs202610002")
    );
  }

  #[tokio::test]
  async fn test_closed_pool_surfaces_database_error() {
    let pool = setup_test_db().await;
    let repo = SqliteProcessedInvoiceRepository::new(pool.clone());
    pool.close().await;

    let result = repo.exists(&key("INV-1005", InvoiceStatus::Open)).await;
    assert!(matches!(result, Err(InvoiceError::Database(_))));
  }
}
