pub mod entities;
pub mod errors;
pub mod ports;
pub mod properties;

pub use entities::{CrmObject, ObjectType, Page, UploadedFile};
pub use errors::CrmError;
pub use ports::CrmGateway;
