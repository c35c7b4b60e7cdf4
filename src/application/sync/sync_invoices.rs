use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

use super::errors::SyncError;
use super::process_invoice::{InvoiceOutcome, ProcessInvoiceUseCase, SyncContext};
use crate::domain::crm::CrmGateway;
use crate::domain::invoice::LineItemReconciler;

#[derive(Debug, Clone)]
pub struct SyncInvoicesCommand {
  /// Date used for new billing invoice codes.
  pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub pages: usize,
  pub recorded: usize,
  pub skipped: usize,
  pub failed: usize,
}

impl SyncReport {
  fn count(&mut self, outcome: &InvoiceOutcome) {
    match outcome {
      InvoiceOutcome::Recorded { .. } => self.recorded += 1,
      InvoiceOutcome::Skipped(_) => self.skipped += 1,
      InvoiceOutcome::Failed(_) => self.failed += 1,
    }
  }

  pub fn invoices(&self) -> usize {
    self.recorded + self.skipped + self.failed
  }
}

impl fmt::Display for SyncReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} invoice(s) on {} page(s): {} recorded, {} skipped, {} failed",
      self.invoices(),
      self.pages,
      self.recorded,
      self.skipped,
      self.failed
    )
  }
}

/// Pages through every CRM invoice and processes them one at a time.
pub struct SyncInvoicesUseCase {
  crm: Arc<dyn CrmGateway>,
  process_invoice: ProcessInvoiceUseCase,
}

impl SyncInvoicesUseCase {
  pub fn new(crm: Arc<dyn CrmGateway>, process_invoice: ProcessInvoiceUseCase) -> Self {
    Self {
      crm,
      process_invoice,
    }
  }

  pub async fn execute(&self, command: SyncInvoicesCommand) -> Result<SyncReport, SyncError> {
    let tax_rates = self.crm.get_tax_rates().await.map_err(SyncError::TaxRates)?;
    tracing::info!("Loaded {} tax rate(s)", tax_rates.len());

    let context = SyncContext {
      today: command.today,
      reconciler: LineItemReconciler::new(tax_rates),
    };

    let mut report = SyncReport::default();
    let mut cursor: Option<String> = None;

    loop {
      let page = self
        .crm
        .list_invoices(cursor.as_deref())
        .await
        .map_err(SyncError::ListInvoices)?;
      report.pages += 1;
      tracing::info!(
        "Retrieved {} invoice(s) on page {}",
        page.results.len(),
        report.pages
      );

      for object in &page.results {
        let outcome = self.process_invoice.execute(&context, object).await?;
        report.count(&outcome);
      }

      match page.next_cursor {
        Some(next) => cursor = Some(next),
        None => break,
      }
    }

    Ok(report)
  }
}
