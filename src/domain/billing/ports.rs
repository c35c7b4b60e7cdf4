use async_trait::async_trait;

use super::entities::{BillingPayload, BillingRecord, EncodedPdf, Lookup};
use super::errors::BillingError;
use super::value_objects::EntityKind;

/// Request/response operations against the billing system.
///
/// "Not found" is a regular [`Lookup::NotFound`] value; `Err` is reserved for
/// transport failures and rejected requests.
#[async_trait]
pub trait BillingGateway: Send + Sync {
  async fn show(&self, kind: EntityKind, code: &str) -> Result<Lookup<BillingRecord>, BillingError>;

  async fn add(&self, payload: &BillingPayload) -> Result<BillingRecord, BillingError>;

  async fn edit(&self, payload: &BillingPayload) -> Result<BillingRecord, BillingError>;

  async fn download(&self, invoice_code: &str) -> Result<EncodedPdf, BillingError>;

  async fn mark_as_paid(&self, invoice_code: &str) -> Result<BillingRecord, BillingError>;
}
