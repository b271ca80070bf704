//! # dealsync Domain
//!
//! Business domain types for the CRM deal mirror.
//!
//! This crate contains:
//! - CRM wire types (deals, funnels, stages) and deal filters
//! - The persisted negotiation record and its derived status
//! - Configuration structures
//! - The shared error type and Result alias
//!
//! ## Architecture
//! - No dependencies on other dealsync crates
//! - Pure data and conversions, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
