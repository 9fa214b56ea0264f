//! Core domain of the Greenlight approval platform.
//!
//! Everything here is pure: the chain engine, workflow configurations, the
//! SLA calendar, entities, configuration and the error taxonomy. Persistence
//! and delivery live in sibling crates.

pub mod chain;
pub mod config;
pub mod domain;
pub mod errors;
pub mod resolve;
pub mod sla;
pub mod workflows;
