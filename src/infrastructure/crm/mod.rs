pub mod hubspot_client;

pub use hubspot_client::HubSpotClient;
