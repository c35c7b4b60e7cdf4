use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::errors::InvoiceError;
use super::value_objects::{
  InvoiceNumber, InvoiceStatus, ProcessedInvoiceKey, RelationNumber, Sku,
};
use crate::domain::crm::CrmObject;
use crate::domain::crm::properties::{company, contact, invoice};

// Invoice - CRM invoice snapshot, built fresh for every page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
  pub id: String,
  pub number: InvoiceNumber,
  pub status: InvoiceStatus,
  pub invoice_date: NaiveDate,
  pub due_date: NaiveDate,
  pub amount_billed: Decimal,
  pub line_items: Vec<LineItem>,
  /// Free-text annotation copied from the associated contact.
  pub annotation: Option<String>,
  pub subject: Option<String>,
  pub reference: Option<String>,
  pub organization: Option<String>,
  pub attention_to: Option<String>,
  pub address: InvoiceAddress,
}

impl Invoice {
  pub fn from_crm(object: &CrmObject) -> Result<Self, InvoiceError> {
    let number = InvoiceNumber::new(required(object, invoice::NUMBER)?.to_string())?;
    let status = InvoiceStatus::from(required(object, invoice::STATUS)?);
    let amount_billed = match object.property(invoice::AMOUNT_BILLED) {
      Some(value) => parse_decimal(object, invoice::AMOUNT_BILLED, value)?,
      None => Decimal::ZERO,
    };

    Ok(Self {
      id: object.id.clone(),
      number,
      status,
      invoice_date: parse_date(object, invoice::INVOICE_DATE)?,
      due_date: parse_date(object, invoice::DUE_DATE)?,
      amount_billed,
      line_items: Vec::new(),
      annotation: None,
      subject: object.owned_property(invoice::SUBJECT),
      reference: object.owned_property(invoice::REFERENCE),
      organization: object.owned_property(invoice::ORGANIZATION),
      attention_to: object.owned_property(invoice::ATTENTION_TO),
      address: InvoiceAddress {
        street: object.owned_property(invoice::ADDRESS),
        zip_code: object.owned_property(invoice::ZIP_CODE),
        city: object.owned_property(invoice::CITY),
        country: object.owned_property(invoice::COUNTRY),
      },
    })
  }

  pub fn dedup_key(&self) -> ProcessedInvoiceKey {
    ProcessedInvoiceKey::new(self.number.clone(), self.status.clone())
  }

  /// Payment term in days between invoice date and due date.
  pub fn payment_term_days(&self) -> i64 {
    (self.due_date - self.invoice_date).num_days()
  }

  pub fn totals(&self) -> Option<InvoiceTotals> {
    InvoiceTotals::calculate(&self.line_items)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvoiceAddress {
  pub street: Option<String>,
  pub zip_code: Option<String>,
  pub city: Option<String>,
  pub country: Option<String>,
}

impl InvoiceAddress {
  pub fn is_empty(&self) -> bool {
    self.street.is_none() && self.zip_code.is_none() && self.city.is_none() && self.country.is_none()
  }
}

// Company - read-only snapshot of the company associated with an invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
  pub id: String,
  pub relation_number: RelationNumber,
  pub name: Option<String>,
  pub address: Option<String>,
  pub zip: Option<String>,
  pub city: Option<String>,
  pub email: Option<String>,
}

impl Company {
  /// Builds the snapshot; a missing or blank relation number falls back to the CRM id.
  pub fn from_crm(object: &CrmObject) -> Self {
    Self {
      id: object.id.clone(),
      relation_number: RelationNumber::resolve(
        object.property(company::RELATION_NUMBER),
        &object.id,
      ),
      name: object.owned_property(company::NAME),
      address: object.owned_property(company::ADDRESS),
      zip: object.owned_property(company::ZIP),
      city: object.owned_property(company::CITY),
      email: object.owned_property(company::EMAIL),
    }
  }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(self.relation_number.value())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
  pub id: String,
  pub last_name: Option<String>,
  pub invoice_annotation: Option<String>,
}

impl Contact {
  pub fn from_crm(object: &CrmObject) -> Self {
    Self {
      id: object.id.clone(),
      last_name: object.owned_property(contact::LAST_NAME),
      invoice_annotation: object.owned_property(contact::INVOICE_ANNOTATION),
    }
  }
}

// Line Item - validated, immutable for the rest of the processing pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
  pub id: String,
  pub sku: Sku,
  pub name: String,
  pub quantity: u32,
  pub price: Decimal,
  pub amount: Decimal,
  pub tax_rate_group_id: Option<String>,
  /// Upstream tax fraction normalized to a percentage.
  pub tax_percentage: Decimal,
  /// Tax percentage resolved through the tax rate table.
  pub effective_tax_percentage: Decimal,
  pub discount_amount: Decimal,
  pub discount_percentage: Decimal,
}

// Arithmetic is checked; `None` means the amounts do not fit a Decimal
impl LineItem {
  pub fn gross(&self) -> Option<Decimal> {
    Decimal::from(self.quantity).checked_mul(self.price)
  }

  pub fn net(&self) -> Option<Decimal> {
    self.gross()?.checked_sub(self.discount_amount)
  }

  pub fn tax_amount(&self) -> Option<Decimal> {
    self
      .net()?
      .checked_mul(self.effective_tax_percentage)?
      .checked_div(Decimal::ONE_HUNDRED)
  }
}

// Invoice Totals - Calculated, not persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceTotals {
  pub subtotal: Decimal,
  pub total_tax: Decimal,
  pub grand_total: Decimal,
}

impl InvoiceTotals {
  /// `None` when a line item or a running total overflows.
  pub fn calculate(line_items: &[LineItem]) -> Option<Self> {
    let mut subtotal = Decimal::ZERO;
    let mut total_tax = Decimal::ZERO;
    for item in line_items {
      subtotal = subtotal.checked_add(item.net()?)?;
      total_tax = total_tax.checked_add(item.tax_amount()?)?;
    }

    Some(Self {
      subtotal,
      total_tax,
      grand_total: subtotal.checked_add(total_tax)?,
    })
  }

  /// True when the grand total deviates from `billed` by more than `tolerance`.
  pub fn differs_from(&self, billed: Decimal, tolerance: Decimal) -> bool {
    (self.grand_total.round_dp(2) - billed).abs() > tolerance
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
  pub id: String,
  pub name: String,
  pub percentage: Decimal,
  pub label: Option<String>,
}

/// Tax rates keyed by tax group id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaxRates(HashMap<String, TaxRate>);

impl TaxRates {
  pub fn new(rates: impl IntoIterator<Item = TaxRate>) -> Self {
    Self(
      rates
        .into_iter()
        .map(|rate| (rate.id.clone(), rate))
        .collect(),
    )
  }

  pub fn get(&self, group_id: &str) -> Option<&TaxRate> {
    self.0.get(group_id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

fn required<'a>(object: &'a CrmObject, property: &'static str) -> Result<&'a str, InvoiceError> {
  object
    .property(property)
    .ok_or_else(|| InvoiceError::MissingProperty {
      id: object.id.clone(),
      property,
    })
}

fn parse_decimal(
  object: &CrmObject,
  property: &'static str,
  value: &str,
) -> Result<Decimal, InvoiceError> {
  Decimal::from_str(value).map_err(|_| InvoiceError::InvalidProperty {
    id: object.id.clone(),
    property,
    value: value.to_string(),
  })
}

fn parse_date(object: &CrmObject, property: &'static str) -> Result<NaiveDate, InvoiceError> {
  let value = required(object, property)?;

  DateTime::parse_from_rfc3339(value)
    .map(|datetime| datetime.date_naive())
    .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
    .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
    .map_err(|_| InvoiceError::InvalidProperty {
      id: object.id.clone(),
      property,
      value: value.to_string(),
    })
}
