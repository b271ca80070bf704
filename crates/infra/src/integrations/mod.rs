//! External service integrations

pub mod rdstation;

pub use rdstation::RdStationClient;
