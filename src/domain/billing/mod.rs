pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{
  BillingPayload, BillingRecord, CustomField, DebtorPayload, EncodedPdf, InvoiceLinePayload,
  InvoicePayload, Lookup, ProductPayload,
};
pub use errors::{BillingError, GenerationError};
pub use ports::BillingGateway;
pub use services::{BillingOptions, BillingOutcome, BillingService};
pub use value_objects::{BillingInvoiceStatus, EntityKind, InvoiceCode};
