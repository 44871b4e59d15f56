//! Read-only reporting queries.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{PullRequestShort, ReviewerStat};

/// All pull requests, in any status, where `user_id` is currently a reviewer.
///
/// Unknown users simply have no pull requests.
pub async fn get_prs_for_reviewer(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<PullRequestShort>, AppError> {
    let prs = sqlx::query_as::<_, PullRequestShort>(
        r#"
        SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
        FROM pull_requests pr
        JOIN pr_reviewers r ON r.pull_request_id = pr.pull_request_id
        WHERE r.reviewer_id = ?
        ORDER BY pr.created_at, pr.pull_request_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(prs)
}

/// Number of review assignments ever created per reviewer, busiest first.
///
/// Counts come from the assignment log, so reviewers that were later
/// replaced still count.
pub async fn get_reviewer_stats(pool: &DbPool) -> Result<Vec<ReviewerStat>, AppError> {
    let stats = sqlx::query_as::<_, ReviewerStat>(
        r#"
        SELECT reviewer_id AS user_id, COUNT(*) AS review_count
        FROM review_assignment_log
        GROUP BY reviewer_id
        ORDER BY review_count DESC, user_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(stats)
}
