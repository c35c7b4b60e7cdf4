use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid invoice number: {0}")]
  InvalidInvoiceNumber(String),
  #[error("Invalid SKU: {0}")]
  InvalidSku(String),
}

// Invoice Number - human readable number assigned by the CRM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 100 {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot exceed 100 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for InvoiceNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Invoice Status as reported by the CRM
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
  Open,
  Paid,
  Other(String),
}

impl InvoiceStatus {
  pub fn as_str(&self) -> &str {
    match self {
      InvoiceStatus::Open => "open",
      InvoiceStatus::Paid => "paid",
      InvoiceStatus::Other(status) => status,
    }
  }
}

impl From<&str> for InvoiceStatus {
  fn from(s: &str) -> Self {
    let status = s.trim().to_lowercase();
    match status.as_str() {
      "open" => InvoiceStatus::Open,
      "paid" => InvoiceStatus::Paid,
      _ => InvoiceStatus::Other(status),
    }
  }
}

impl FromStr for InvoiceStatus {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(s))
  }
}

impl fmt::Display for InvoiceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// SKU - product code shared between the CRM line item and the billing product
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidSku(
        "SKU cannot be empty".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Sku {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// External customer identifier joining a CRM company to a billing debtor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationNumber(String);

impl RelationNumber {
  /// Uses the relation number when it is set and non-blank, the CRM company id otherwise.
  pub fn resolve(relation_number: Option<&str>, company_id: &str) -> Self {
    relation_number
      .map(str::trim)
      .filter(|value| !value.is_empty())
      .map(|value| Self(value.to_string()))
      .unwrap_or_else(|| Self(company_id.trim().to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RelationNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Dedup key: the same invoice may be processed once per status
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessedInvoiceKey {
  pub number: InvoiceNumber,
  pub status: InvoiceStatus,
}

impl ProcessedInvoiceKey {
  pub fn new(number: InvoiceNumber, status: InvoiceStatus) -> Self {
    Self { number, status }
  }
}

impl fmt::Display for ProcessedInvoiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.number, self.status)
  }
}
