use thiserror::Error;

use crate::domain::crm::CrmError;
use crate::domain::invoice::InvoiceError;

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("Failed to list invoices: {0}")]
  ListInvoices(#[source] CrmError),

  #[error("Failed to load tax rates: {0}")]
  TaxRates(#[source] CrmError),

  #[error("Dedup store unavailable: {0}")]
  Store(#[from] InvoiceError),
}
