//! Business logic services.
//!
//! The reviewer assignment engine (eligibility, selection, lifecycle,
//! reassignment and reporting) plus the HTTP surface built on top of it.
//!
//! Engine functions take a `DbPool` and own their transaction boundaries.

pub mod api;
pub mod assignment;
pub mod eligibility;
pub mod pull_requests;
pub mod reassignment;
pub mod reports;
pub mod server;
pub mod teams;

pub use reassignment::{BulkDeactivateReport, FailedPair, Reassignment, Replacement};
