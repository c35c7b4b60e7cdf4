pub mod processed_invoice_repository;

pub use processed_invoice_repository::SqliteProcessedInvoiceRepository;
