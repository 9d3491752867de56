//! Multi-tenant attendance ledger for a sports club: players, recurring
//! training templates, dated sessions, and per-player attendance and
//! confirmation records, each partition owned by one user account.
//!
//! The HTTP boundary, credential verification, and document rendering live
//! outside this crate; it exposes the repository, session resolution,
//! aggregation, and reporting operations they call into.

pub mod analytics;
pub mod db;
pub mod env;
pub mod error;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod schema;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod test;
