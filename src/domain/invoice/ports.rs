use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::InvoiceError;
use super::value_objects::{InvoiceNumber, ProcessedInvoiceKey};

/// A completed invoice-state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedInvoice {
  pub key: ProcessedInvoiceKey,
  pub crm_invoice_id: String,
  pub billing_invoice_code: Option<String>,
  pub processed_at: DateTime<Utc>,
}

impl ProcessedInvoice {
  pub fn new(
    key: ProcessedInvoiceKey,
    crm_invoice_id: String,
    billing_invoice_code: Option<String>,
  ) -> Self {
    Self {
      key,
      crm_invoice_id,
      billing_invoice_code,
      processed_at: Utc::now(),
    }
  }
}

/// Dedup store of (invoice number, status) pairs that were already processed.
#[async_trait]
pub trait ProcessedInvoiceRepository: Send + Sync {
  async fn exists(&self, key: &ProcessedInvoiceKey) -> Result<bool, InvoiceError>;

  /// Persists the record; a duplicate key fails with [`InvoiceError::AlreadyRecorded`].
  async fn record(&self, processed: ProcessedInvoice) -> Result<(), InvoiceError>;

  /// Latest billing invoice code recorded for the invoice number, under any status.
  async fn find_billing_code(&self, number: &InvoiceNumber)
  -> Result<Option<String>, InvoiceError>;
}
