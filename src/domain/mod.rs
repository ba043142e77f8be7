pub mod builder;
pub mod errors;
pub mod inventory;
pub mod listing;
pub mod ports;
pub mod request;
pub mod session;
pub mod settings;
pub mod status;
