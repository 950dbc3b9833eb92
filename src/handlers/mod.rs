//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body)
//! 2. Hands the decoded request to a workflow service
//! 3. Returns HTTP response (status code, JSON error body on failure)

/// Enrollment endpoint
pub mod enrollments;
/// Health check endpoint
pub mod health;
/// Bulk transfer endpoint
pub mod transfers;
