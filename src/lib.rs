//! Atomic workflows over PostgreSQL.
//!
//! Two business workflows, each run inside one serializable transaction:
//!
//! - a bulk fund transfer debiting one bank account for many credit transfers
//! - a batch course enrollment bounded by course capacity
//!
//! Either every write of a workflow persists or none does, and concurrent
//! workflows cannot jointly break the balance or capacity invariants.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod scope;
pub mod services;
pub mod stores;
pub mod validation;
