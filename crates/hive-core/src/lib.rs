//! hive-core — domain logic for the hive content-review service.
//!
//! This crate owns the document store, the data model, the rating
//! ledger and moderation services, and the change-feed notification
//! dispatcher.

pub mod core;
pub mod ids;
pub mod model;
pub mod notify;
pub mod store;
