use chrono::NaiveDate;
use std::sync::Arc;

use super::entities::{BillingPayload, DebtorPayload, InvoicePayload, Lookup, ProductPayload};
use super::errors::GenerationError;
use super::ports::BillingGateway;
use super::value_objects::{BillingInvoiceStatus, EntityKind, InvoiceCode};
use crate::domain::invoice::{Company, Invoice, InvoiceNumber, LineItem};

#[derive(Debug, Clone)]
pub struct BillingOptions {
  pub invoice_code_prefix: String,
  /// Edit existing debtors with the current company details instead of leaving them untouched.
  pub update_existing_debtors: bool,
}

impl Default for BillingOptions {
  fn default() -> Self {
    Self {
      invoice_code_prefix: "hs".to_string(),
      update_existing_debtors: false,
    }
  }
}

/// Successful generate or mark-paid result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingOutcome {
  pub invoice_code: InvoiceCode,
  pub pdf: Vec<u8>,
}

/// Drives the billing system: debtor, product and invoice upserts plus PDF retrieval.
pub struct BillingService {
  gateway: Arc<dyn BillingGateway>,
  options: BillingOptions,
}

impl BillingService {
  pub fn new(gateway: Arc<dyn BillingGateway>, options: BillingOptions) -> Self {
    Self { gateway, options }
  }

  pub fn invoice_code(&self, number: &InvoiceNumber, date: NaiveDate) -> InvoiceCode {
    InvoiceCode::new(&self.options.invoice_code_prefix, date, number)
  }

  /// Creates the billing invoice for an open CRM invoice and returns its PDF.
  ///
  /// Aborts before any upsert when the invoice code already exists. Every
  /// later failure short-circuits the remaining steps.
  pub async fn generate_invoice(
    &self,
    invoice: &Invoice,
    company: &Company,
    today: NaiveDate,
  ) -> Result<BillingOutcome, GenerationError> {
    let code = self.invoice_code(&invoice.number, today);

    if self.gateway.show(EntityKind::Invoice, code.value()).await?.is_found() {
      return Err(GenerationError::AlreadyExists(code.to_string()));
    }

    self.upsert_debtor(company).await?;

    for item in &invoice.line_items {
      self.upsert_product(item).await?;
    }

    let payload = BillingPayload::Invoice(InvoicePayload::new(&code, invoice, company));
    self
      .gateway
      .add(&payload)
      .await
      .map_err(|source| GenerationError::Invoice {
        code: code.to_string(),
        source,
      })?;

    tracing::info!(
      "Billing invoice {} created for debtor {} with {} line(s)",
      code,
      company.relation_number,
      invoice.line_items.len()
    );

    let pdf = self.download_pdf(&code).await?;
    Ok(BillingOutcome {
      invoice_code: code,
      pdf,
    })
  }

  /// Marks an existing billing invoice as paid and returns its PDF.
  pub async fn mark_invoice_paid(
    &self,
    code: &InvoiceCode,
  ) -> Result<BillingOutcome, GenerationError> {
    let record = match self.gateway.show(EntityKind::Invoice, code.value()).await? {
      Lookup::Found(record) => record,
      Lookup::NotFound => return Err(GenerationError::NotFound(code.to_string())),
    };

    if record.invoice_status() == Some(BillingInvoiceStatus::Paid) {
      tracing::info!("Billing invoice {} is already marked as paid", code);
    } else {
      self
        .gateway
        .mark_as_paid(code.value())
        .await
        .map_err(|source| GenerationError::MarkPaid {
          code: code.to_string(),
          source,
        })?;
      tracing::info!("Billing invoice {} marked as paid", code);
    }

    let pdf = self.download_pdf(code).await?;
    Ok(BillingOutcome {
      invoice_code: code.clone(),
      pdf,
    })
  }

  async fn upsert_debtor(&self, company: &Company) -> Result<(), GenerationError> {
    let relation_number = company.relation_number.value();
    let payload = BillingPayload::Debtor(DebtorPayload::from_company(company));

    match self.gateway.show(EntityKind::Debtor, relation_number).await? {
      Lookup::NotFound => {
        self
          .gateway
          .add(&payload)
          .await
          .map_err(|source| GenerationError::UnresolvedDebtor {
            relation_number: relation_number.to_string(),
            source,
          })?;
        tracing::info!("Debtor {} created", relation_number);
      }
      Lookup::Found(_) if self.options.update_existing_debtors => {
        // The debtor exists, so a failed refresh does not block the invoice
        match self.gateway.edit(&payload).await {
          Ok(_) => tracing::info!("Debtor {} updated", relation_number),
          Err(e) => tracing::warn!("Debtor {} could not be updated: {}", relation_number, e),
        }
      }
      Lookup::Found(_) => {
        tracing::debug!("Debtor {} already exists", relation_number);
      }
    }

    Ok(())
  }

  async fn upsert_product(&self, item: &LineItem) -> Result<(), GenerationError> {
    let sku = item.sku.value();
    let payload = BillingPayload::Product(ProductPayload::from_line_item(item));

    let result = match self.gateway.show(EntityKind::Product, sku).await? {
      Lookup::NotFound => self.gateway.add(&payload).await,
      Lookup::Found(_) => self.gateway.edit(&payload).await,
    };

    result.map_err(|source| GenerationError::Product {
      sku: sku.to_string(),
      source,
    })?;
    tracing::debug!("Product {} saved", sku);
    Ok(())
  }

  async fn download_pdf(&self, code: &InvoiceCode) -> Result<Vec<u8>, GenerationError> {
    let encoded = self
      .gateway
      .download(code.value())
      .await
      .map_err(|source| GenerationError::Download {
        code: code.to_string(),
        source,
      })?;

    encoded.decode().map_err(|source| GenerationError::InvalidPdf {
      code: code.to_string(),
      source,
    })
  }
}
