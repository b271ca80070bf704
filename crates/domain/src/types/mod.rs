//! Domain types and models

pub mod crm;
pub mod filter;
pub mod negotiation;

pub use crm::{Deal, DealPage, DealStageRef, Funnel, Stage};
pub use filter::DealFilter;
pub use negotiation::{Negotiation, NegotiationStatus, ReconcileSummary};
