//! Reviewer statistics model.

use serde::Serialize;
use sqlx::FromRow;

/// Total number of review assignments ever created for a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ReviewerStat {
    pub user_id: String,
    pub review_count: i64,
}
