use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::Instrument;

use super::errors::SyncError;
use super::fetch_invoice_details::{FetchInvoiceDetailsUseCase, InvoiceDetails};
use crate::domain::billing::{BillingOutcome, BillingService, GenerationError, InvoiceCode};
use crate::domain::crm::{CrmError, CrmGateway, CrmObject};
use crate::domain::invoice::{
  Company, Invoice, InvoiceError, InvoiceStatus, LineItemReconciler, ProcessedInvoice,
  ProcessedInvoiceRepository,
};

/// Per-run state shared by every invoice.
pub struct SyncContext {
  pub today: NaiveDate,
  pub reconciler: LineItemReconciler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  MarkPaid,
  Generate,
  Skip,
}

pub fn route(status: &InvoiceStatus) -> Route {
  match status {
    InvoiceStatus::Paid => Route::MarkPaid,
    InvoiceStatus::Open => Route::Generate,
    InvoiceStatus::Other(_) => Route::Skip,
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  AlreadyProcessed,
  UnsupportedStatus(String),
  Validation(Vec<String>),
  UnresolvedDebtor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceOutcome {
  Recorded { invoice_code: String },
  Skipped(SkipReason),
  Failed(String),
}

const TOTALS_TOLERANCE: Decimal = dec!(0.01);

/// Runs one CRM invoice through validation, dedup, billing and bookkeeping.
///
/// Everything that goes wrong for a single invoice ends up in the returned
/// [`InvoiceOutcome`]; only a failing dedup store is returned as `Err`.
pub struct ProcessInvoiceUseCase {
  crm: Arc<dyn CrmGateway>,
  fetch_details: FetchInvoiceDetailsUseCase,
  billing: Arc<BillingService>,
  processed: Arc<dyn ProcessedInvoiceRepository>,
}

impl ProcessInvoiceUseCase {
  pub fn new(
    crm: Arc<dyn CrmGateway>,
    billing: Arc<BillingService>,
    processed: Arc<dyn ProcessedInvoiceRepository>,
  ) -> Self {
    Self {
      fetch_details: FetchInvoiceDetailsUseCase::new(crm.clone()),
      crm,
      billing,
      processed,
    }
  }

  pub async fn execute(
    &self,
    context: &SyncContext,
    object: &CrmObject,
  ) -> Result<InvoiceOutcome, SyncError> {
    let invoice = match Invoice::from_crm(object) {
      Ok(invoice) => invoice,
      Err(e) => {
        tracing::warn!("Skipping CRM invoice {}: {}", object.id, e);
        return Ok(InvoiceOutcome::Skipped(SkipReason::Validation(vec![
          e.to_string(),
        ])));
      }
    };

    let span = tracing::info_span!(
      "invoice",
      number = %invoice.number,
      crm_id = %invoice.id,
      status = %invoice.status
    );
    self.process(context, invoice).instrument(span).await
  }

  async fn process(
    &self,
    context: &SyncContext,
    invoice: Invoice,
  ) -> Result<InvoiceOutcome, SyncError> {
    let route = route(&invoice.status);
    if route == Route::Skip {
      tracing::info!("Status {} is not synchronized", invoice.status);
      return Ok(InvoiceOutcome::Skipped(SkipReason::UnsupportedStatus(
        invoice.status.to_string(),
      )));
    }

    let key = invoice.dedup_key();
    if self.processed.exists(&key).await? {
      tracing::info!("Invoice {} was already processed", key);
      return Ok(InvoiceOutcome::Skipped(SkipReason::AlreadyProcessed));
    }

    let details = match self.fetch_details.execute(invoice, &context.reconciler).await {
      Ok(details) => details,
      Err(e) => {
        tracing::error!("Failed to retrieve invoice details: {}", e);
        return Ok(InvoiceOutcome::Failed(e.to_string()));
      }
    };

    let InvoiceDetails {
      invoice,
      company,
      errors,
      ..
    } = details;
    let company = match company {
      Some(company) if errors.is_empty() => company,
      company => {
        tracing::warn!("Invoice is skipped: {}", errors.join("; "));
        match &company {
          Some(company) => {
            self
              .open_task(
                company,
                &format!("Invoice {} could not be synchronized", invoice.number),
                &errors.join("\n"),
              )
              .await
          }
          None => tracing::warn!("No company to open a task on"),
        }
        return Ok(InvoiceOutcome::Skipped(SkipReason::Validation(errors)));
      }
    };

    match invoice.totals() {
      Some(totals) if totals.differs_from(invoice.amount_billed, TOTALS_TOLERANCE) => {
        tracing::warn!(
          "Line item total {} does not match billed amount {}",
          totals.grand_total.round_dp(2),
          invoice.amount_billed
        );
      }
      Some(_) => {}
      None => tracing::warn!("Line item totals are out of range, skipping totals check"),
    }

    let result = match route {
      Route::MarkPaid => {
        let code = self.paid_invoice_code(context, &invoice).await?;
        self.billing.mark_invoice_paid(&code).await
      }
      _ => {
        self
          .billing
          .generate_invoice(&invoice, &company, context.today)
          .await
      }
    };

    let outcome = match result {
      Ok(outcome) => outcome,
      Err(GenerationError::UnresolvedDebtor {
        relation_number,
        source,
      }) => {
        tracing::warn!("Debtor {} could not be resolved: {}", relation_number, source);
        self
          .open_task(
            &company,
            &format!("Debtor {} could not be created", relation_number),
            &format!(
              "Invoice {} was not sent to the billing system.\n{}",
              invoice.number, source
            ),
          )
          .await;
        return Ok(InvoiceOutcome::Skipped(SkipReason::UnresolvedDebtor(
          relation_number,
        )));
      }
      Err(e) => {
        tracing::error!("Billing failed: {}", e);
        return Ok(InvoiceOutcome::Failed(e.to_string()));
      }
    };

    self.attach_pdf(&invoice, &company, &outcome).await;

    let invoice_code = outcome.invoice_code.to_string();
    let record = ProcessedInvoice::new(key, invoice.id.clone(), Some(invoice_code.clone()));
    match self.processed.record(record).await {
      Ok(()) => {}
      Err(InvoiceError::AlreadyRecorded(key)) => {
        tracing::warn!("Invoice {} was recorded concurrently", key);
      }
      Err(e) => return Err(e.into()),
    }

    tracing::info!("Invoice recorded as {}", invoice_code);
    Ok(InvoiceOutcome::Recorded { invoice_code })
  }

  async fn paid_invoice_code(
    &self,
    context: &SyncContext,
    invoice: &Invoice,
  ) -> Result<InvoiceCode, SyncError> {
    Ok(match self.processed.find_billing_code(&invoice.number).await? {
      Some(code) => InvoiceCode::from_recorded(code),
      None => self.billing.invoice_code(&invoice.number, context.today),
    })
  }

  /// Uploads the PDF and notes it on the company. Billing already succeeded,
  /// so failures here are logged and the invoice is still recorded.
  async fn attach_pdf(&self, invoice: &Invoice, company: &Company, outcome: &BillingOutcome) {
    let result: Result<(), CrmError> = async {
      let file = self
        .crm
        .upload_file(&format!("{}.pdf", invoice.number), outcome.pdf.clone())
        .await?;
      let body = format!(
        "Invoice {} ({}) is {} in the billing system",
        invoice.number, outcome.invoice_code, invoice.status
      );
      self.crm.create_note(&company.id, &body, &file.id).await
    }
    .await;

    match result {
      Ok(()) => tracing::info!("PDF attached to company {}", company.display_name()),
      Err(e) => tracing::error!("Failed to attach PDF to company {}: {}", company.id, e),
    }
  }

  async fn open_task(&self, company: &Company, title: &str, body: &str) {
    if let Err(e) = self.crm.create_task(&company.id, title, body).await {
      tracing::error!("Failed to create task on company {}: {}", company.id, e);
    }
  }
}
