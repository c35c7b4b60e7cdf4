use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
  #[error("CRM request failed: {0}")]
  Transport(String),

  #[error("CRM returned status {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Association lookup failed: {}", .0.join(" - "))]
  Association(Vec<String>),

  #[error("Invalid CRM response: {0}")]
  InvalidResponse(String),
}
