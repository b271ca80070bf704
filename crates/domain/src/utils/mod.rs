//! Domain utilities

pub mod dates;
