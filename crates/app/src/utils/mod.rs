//! Process utilities

pub mod logging;
