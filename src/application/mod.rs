//! Application layer
//!
//! Use cases that drive the CRM and billing ports through the invoice sync
//! pipeline. Every call is awaited in sequence; nothing runs concurrently.

pub mod sync;
