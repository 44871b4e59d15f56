//! PR Reviewer - reviewer assignment service for team pull requests.
//!
//! Assigns reviewers from the author's team when a pull request is opened,
//! replaces reviewers on request or when a whole team is deactivated, and
//! tracks the OPEN -> MERGED lifecycle. State lives in SQLite; every
//! mutation runs in one write transaction.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::AppError;
