use chrono::NaiveDate;
use std::fmt;

use crate::domain::invoice::InvoiceNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  Debtor,
  Product,
  Invoice,
}

impl EntityKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      EntityKind::Debtor => "debtor",
      EntityKind::Product => "product",
      EntityKind::Invoice => "invoice",
    }
  }

  /// Field holding the entity's code in billing records.
  pub fn code_field(&self) -> &'static str {
    match self {
      EntityKind::Debtor => "DebtorCode",
      EntityKind::Product => "ProductCode",
      EntityKind::Invoice => "InvoiceCode",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// Invoice status codes used by the billing system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingInvoiceStatus {
  Concept,
  Sent,
  PartiallyPaid,
  Paid,
  CreditInvoice,
  Expired,
}

impl BillingInvoiceStatus {
  pub fn code(&self) -> u8 {
    match self {
      BillingInvoiceStatus::Concept => 0,
      BillingInvoiceStatus::Sent => 2,
      BillingInvoiceStatus::PartiallyPaid => 3,
      BillingInvoiceStatus::Paid => 4,
      BillingInvoiceStatus::CreditInvoice => 8,
      BillingInvoiceStatus::Expired => 9,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(BillingInvoiceStatus::Concept),
      2 => Some(BillingInvoiceStatus::Sent),
      3 => Some(BillingInvoiceStatus::PartiallyPaid),
      4 => Some(BillingInvoiceStatus::Paid),
      8 => Some(BillingInvoiceStatus::CreditInvoice),
      9 => Some(BillingInvoiceStatus::Expired),
      _ => None,
    }
  }
}

/// Billing-side invoice code: `<prefix>_<YYYYMMDD>_<crm invoice number>`.
///
/// The prefix keeps synced invoices apart from manually created ones and the
/// date makes a second run on the same day collide with the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceCode(String);

impl InvoiceCode {
  pub fn new(prefix: &str, date: NaiveDate, number: &InvoiceNumber) -> Self {
    Self(format!("{}_{}_{}", prefix, date.format("%Y%m%d"), number))
  }

  pub fn from_recorded(code: String) -> Self {
    Self(code)
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for InvoiceCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}
