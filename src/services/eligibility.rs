//! Eligibility resolver.
//!
//! Computes the pool of users that may be assigned as reviewers: active
//! members of a team minus an exclusion set. Runs on the caller's transaction
//! so the pool is consistent with the write that follows.

use crate::error::AppError;
use sqlx::SqliteConnection;
use std::collections::HashSet;

/// Return every active member of `team_name` whose id is not in `exclude_ids`.
///
/// An empty result is a valid outcome; callers decide what it means.
/// Candidates are returned sorted by user id.
pub async fn resolve_candidates(
    conn: &mut SqliteConnection,
    team_name: &str,
    exclude_ids: &HashSet<&str>,
) -> Result<Vec<String>, AppError> {
    let active: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT user_id
        FROM users
        WHERE team_name = ? AND is_active = 1
        ORDER BY user_id
        "#,
    )
    .bind(team_name)
    .fetch_all(&mut *conn)
    .await?;

    Ok(active
        .into_iter()
        .map(|(user_id,)| user_id)
        .filter(|user_id| !exclude_ids.contains(user_id.as_str()))
        .collect())
}
