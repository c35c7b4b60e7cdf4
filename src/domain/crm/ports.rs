use async_trait::async_trait;

use super::entities::{CrmObject, ObjectType, Page, UploadedFile};
use super::errors::CrmError;
use crate::domain::invoice::TaxRates;

/// Typed operations the sync pipeline needs from the CRM.
#[async_trait]
pub trait CrmGateway: Send + Sync {
  /// Fetches one page of invoices starting after the opaque `after` cursor.
  async fn list_invoices(&self, after: Option<&str>) -> Result<Page<CrmObject>, CrmError>;

  /// Returns ids of objects of type `to` associated with the invoice.
  ///
  /// Fails with [`CrmError::Association`] when the batch call reports item-level errors.
  async fn get_associated(&self, invoice_id: &str, to: ObjectType)
  -> Result<Vec<String>, CrmError>;

  async fn get_entity(
    &self,
    object_type: ObjectType,
    id: &str,
    fields: &[&str],
  ) -> Result<CrmObject, CrmError>;

  async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<UploadedFile, CrmError>;

  async fn create_note(&self, company_id: &str, body: &str, file_id: &str)
  -> Result<(), CrmError>;

  async fn create_task(&self, company_id: &str, title: &str, body: &str) -> Result<(), CrmError>;

  async fn get_tax_rates(&self) -> Result<TaxRates, CrmError>;
}
