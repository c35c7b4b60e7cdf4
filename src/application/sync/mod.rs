pub mod errors;
pub mod fetch_invoice_details;
pub mod process_invoice;
pub mod sync_invoices;

pub use errors::SyncError;
pub use fetch_invoice_details::{FetchInvoiceDetailsUseCase, InvoiceDetails};
pub use process_invoice::{
  InvoiceOutcome, ProcessInvoiceUseCase, Route, SkipReason, SyncContext, route,
};
pub use sync_invoices::{SyncInvoicesCommand, SyncInvoicesUseCase, SyncReport};
