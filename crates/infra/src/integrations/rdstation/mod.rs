//! RD Station CRM integration

pub mod client;

pub use client::RdStationClient;
