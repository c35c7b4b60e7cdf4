pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{
  Company, Contact, Invoice, InvoiceAddress, InvoiceTotals, LineItem, TaxRate, TaxRates,
};
pub use errors::{InvoiceError, LineItemError};
pub use ports::{ProcessedInvoice, ProcessedInvoiceRepository};
pub use services::{LineItemReconciler, LineItemReconciliation};
pub use value_objects::{
  InvoiceNumber, InvoiceStatus, ProcessedInvoiceKey, RelationNumber, Sku, ValueObjectError,
};
