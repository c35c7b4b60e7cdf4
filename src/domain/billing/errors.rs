use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
  #[error("Billing request failed: {0}")]
  Transport(String),

  #[error("Billing system returned status {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Billing system rejected {controller} {action}: {}", .errors.join("; "))]
  Rejected {
    controller: String,
    action: String,
    errors: Vec<String>,
  },

  #[error("Invalid billing response: {0}")]
  InvalidResponse(String),
}

/// Failures of the generate and mark-paid operations. Any of these leaves the
/// invoice unrecorded so a later run retries it.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("invoice already exists: {0}")]
  AlreadyExists(String),

  #[error("debtor {relation_number} could not be resolved: {source}")]
  UnresolvedDebtor {
    relation_number: String,
    source: BillingError,
  },

  #[error("product {sku} could not be saved: {source}")]
  Product { sku: String, source: BillingError },

  #[error("error processing invoice {code}: {source}")]
  Invoice { code: String, source: BillingError },

  #[error("invoice {0} was not found in the billing system")]
  NotFound(String),

  #[error("invoice {code} could not be marked as paid: {source}")]
  MarkPaid { code: String, source: BillingError },

  #[error("invoice {code} could not be downloaded: {source}")]
  Download { code: String, source: BillingError },

  #[error("invoice {code} PDF is not valid base64: {source}")]
  InvalidPdf {
    code: String,
    source: base64::DecodeError,
  },

  #[error(transparent)]
  Billing(#[from] BillingError),
}
