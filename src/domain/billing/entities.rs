use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value_objects::{BillingInvoiceStatus, EntityKind, InvoiceCode};
use crate::domain::invoice::{Company, Invoice, LineItem};

/// Discriminated result of a `show` probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
  Found(T),
  NotFound,
}

impl<T> Lookup<T> {
  pub fn is_found(&self) -> bool {
    matches!(self, Lookup::Found(_))
  }
}

/// A record as returned by the billing system.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BillingRecord(pub Map<String, Value>);

impl BillingRecord {
  /// Field value as text; numbers are rendered, null and missing fields are `None`.
  pub fn text(&self, field: &str) -> Option<String> {
    match self.0.get(field)? {
      Value::String(value) => Some(value.clone()),
      Value::Number(value) => Some(value.to_string()),
      Value::Bool(value) => Some(value.to_string()),
      _ => None,
    }
  }

  pub fn invoice_status(&self) -> Option<BillingInvoiceStatus> {
    self
      .text("Status")
      .and_then(|status| status.trim().parse::<u8>().ok())
      .and_then(BillingInvoiceStatus::from_code)
  }
}

/// Base64 encoded PDF as delivered by the billing system's download action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPdf(pub String);

impl EncodedPdf {
  pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(self.0.trim())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DebtorPayload {
  pub debtor_code: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub zip_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email_address: Option<String>,
}

impl DebtorPayload {
  pub fn from_company(company: &Company) -> Self {
    Self {
      debtor_code: company.relation_number.value().to_string(),
      company_name: company.name.clone(),
      address: company.address.clone(),
      zip_code: company.zip.clone(),
      city: company.city.clone(),
      email_address: company.email.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductPayload {
  pub product_code: String,
  pub product_name: String,
  pub product_key_phrase: String,
  pub price_excl: Decimal,
}

impl ProductPayload {
  pub fn from_line_item(item: &LineItem) -> Self {
    Self {
      product_code: item.sku.value().to_string(),
      product_name: item.name.clone(),
      product_key_phrase: item.name.clone(),
      price_excl: item.price,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvoiceLinePayload {
  pub product_code: String,
  pub description: String,
  pub number: u32,
  pub price_excl: Decimal,
  pub tax_percentage: Decimal,
  pub discount_percentage: Decimal,
}

impl InvoiceLinePayload {
  pub fn from_line_item(item: &LineItem) -> Self {
    Self {
      product_code: item.sku.value().to_string(),
      description: item.name.clone(),
      number: item.quantity,
      price_excl: item.price,
      tax_percentage: item.effective_tax_percentage,
      discount_percentage: item.discount_percentage,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
  pub key: String,
  pub value: String,
}

pub const CUSTOM_FIELD_SUBJECT: &str = "veld_betreft";
pub const CUSTOM_FIELD_REFERENCE: &str = "veld_referentie";
pub const CUSTOM_FIELD_ORGANIZATION: &str = "veld_organisatie";
pub const CUSTOM_FIELD_ATTENTION_TO: &str = "veld_ter_attentie_van";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvoicePayload {
  pub invoice_code: String,
  pub status: u8,
  pub debtor_code: String,
  pub date: NaiveDate,
  pub term: i64,
  pub invoice_lines: Vec<InvoiceLinePayload>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub custom_fields: Vec<CustomField>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub zip_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
}

impl InvoicePayload {
  pub fn new(code: &InvoiceCode, invoice: &Invoice, company: &Company) -> Self {
    let custom_fields = [
      (CUSTOM_FIELD_SUBJECT, &invoice.subject),
      (CUSTOM_FIELD_REFERENCE, &invoice.reference),
      (CUSTOM_FIELD_ORGANIZATION, &invoice.organization),
      (CUSTOM_FIELD_ATTENTION_TO, &invoice.attention_to),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
      value.as_ref().map(|value| CustomField {
        key: key.to_string(),
        value: value.clone(),
      })
    })
    .collect();

    Self {
      invoice_code: code.value().to_string(),
      status: BillingInvoiceStatus::Sent.code(),
      debtor_code: company.relation_number.value().to_string(),
      date: invoice.invoice_date,
      term: invoice.payment_term_days(),
      invoice_lines: invoice
        .line_items
        .iter()
        .map(InvoiceLinePayload::from_line_item)
        .collect(),
      custom_fields,
      comment: invoice.annotation.clone(),
      address: invoice.address.street.clone(),
      zip_code: invoice.address.zip_code.clone(),
      city: invoice.address.city.clone(),
      country: invoice.address.country.clone(),
    }
  }
}

/// Payload for `add` and `edit`; serializes to the bare record fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BillingPayload {
  Debtor(DebtorPayload),
  Product(ProductPayload),
  Invoice(InvoicePayload),
}

impl BillingPayload {
  pub fn kind(&self) -> EntityKind {
    match self {
      BillingPayload::Debtor(_) => EntityKind::Debtor,
      BillingPayload::Product(_) => EntityKind::Product,
      BillingPayload::Invoice(_) => EntityKind::Invoice,
    }
  }

  pub fn code(&self) -> &str {
    match self {
      BillingPayload::Debtor(debtor) => &debtor.debtor_code,
      BillingPayload::Product(product) => &product.product_code,
      BillingPayload::Invoice(invoice) => &invoice.invoice_code,
    }
  }
}
