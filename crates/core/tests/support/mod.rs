//! Shared test helpers for `dealsync-core` integration tests.
//!
//! In-memory fakes for the ports plus deal/funnel fixtures, so tests can
//! focus on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod fixtures;
pub mod source;
pub mod store;
