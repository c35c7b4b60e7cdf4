//! Domain layer
//!
//! CRM and billing ports, the invoice model and the reconciliation rules
//! that map one onto the other. No I/O happens here.

pub mod billing;
pub mod crm;
pub mod invoice;
