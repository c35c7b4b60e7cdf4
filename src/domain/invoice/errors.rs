use rust_decimal::Decimal;
use thiserror::Error;

use super::value_objects::{ProcessedInvoiceKey, ValueObjectError};

#[derive(Debug, Error)]
pub enum InvoiceError {
  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Missing property '{property}' on CRM object {id}")]
  MissingProperty { id: String, property: &'static str },

  #[error("Invalid value '{value}' for property '{property}' on CRM object {id}")]
  InvalidProperty {
    id: String,
    property: &'static str,
    value: String,
  },

  #[error("Invoice {0} was already recorded")]
  AlreadyRecorded(ProcessedInvoiceKey),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Reasons a single line item is excluded from an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineItemError {
  #[error("SKU is not set on line item {line_item_id}, skipping invoice line item")]
  MissingSku { line_item_id: String },

  #[error("Invalid quantity '{value}' on line item {line_item_id}")]
  InvalidQuantity { line_item_id: String, value: String },

  #[error("Invalid {field} '{value}' on line item {line_item_id}")]
  InvalidNumber {
    line_item_id: String,
    field: &'static str,
    value: String,
  },

  #[error("Discount of {discount} on zero-value line item {line_item_id}")]
  DiscountOnZeroValue {
    line_item_id: String,
    discount: Decimal,
  },

  #[error("Amounts on line item {line_item_id} are out of range")]
  Overflow { line_item_id: String },
}
