pub mod billing;
pub mod config;
pub mod crm;
pub mod http;
pub mod persistence;
