//! Team model.
//!
//! A team has no attributes beyond its name; membership is derived from the
//! `team_name` column of `users`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A member of a team as submitted on creation and returned on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// A team with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
}
