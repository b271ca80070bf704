//! # dealsync App
//!
//! Process entry layer: wiring and logging setup.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Picks the store backend and run lock from configuration

pub mod context;
pub mod utils;

pub use context::AppContext;
