pub mod wefact_client;

pub use wefact_client::WeFactClient;
