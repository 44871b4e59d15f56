//! Data models for the application.
//!
//! These models represent the entities stored in the relational store and the
//! JSON payloads returned to callers.
//!
//! Row models derive Serialize for the HTTP layer and FromRow for SQLx queries.

pub mod pull_request;
pub mod reviewer_stat;
pub mod team;
pub mod user;

pub use pull_request::{PullRequest, PullRequestShort, PullRequestStatus};
pub use reviewer_stat::ReviewerStat;
pub use team::{Team, TeamMember};
pub use user::User;
