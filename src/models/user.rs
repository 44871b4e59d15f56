//! User model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user belonging to exactly one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    /// Inactive users are never picked as reviewers.
    pub is_active: bool,
}
