//! Data models representing database entities and request payloads.

/// Bank account and bulk transfer models
pub mod account;
/// Course, student and enrollment models
pub mod class;
/// Credit transfer and transaction row models
pub mod transaction;
