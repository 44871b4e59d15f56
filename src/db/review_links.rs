//! Reviewer assignment link queries.
//!
//! All helpers take the caller's connection so they run inside the
//! operation's transaction.

use crate::error::AppError;
use chrono::Utc;
use sqlx::SqliteConnection;

/// List the reviewers currently linked to a pull request, sorted by id.
pub async fn list_reviewers(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
) -> Result<Vec<String>, AppError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT reviewer_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY reviewer_id",
    )
    .bind(pull_request_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Link a reviewer and record the assignment in the append-only log.
pub async fn insert_link(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
    reviewer_id: &str,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO pr_reviewers (pull_request_id, reviewer_id) VALUES (?, ?)")
        .bind(pull_request_id)
        .bind(reviewer_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO review_assignment_log (pull_request_id, reviewer_id, assigned_at) VALUES (?, ?, ?)",
    )
    .bind(pull_request_id)
    .bind(reviewer_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Swap `old_reviewer_id` for `new_reviewer_id` on one pull request.
pub async fn replace_link(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
    old_reviewer_id: &str,
    new_reviewer_id: &str,
) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND reviewer_id = ?")
        .bind(pull_request_id)
        .bind(old_reviewer_id)
        .execute(&mut *conn)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::not_assigned(pull_request_id, old_reviewer_id));
    }

    insert_link(conn, pull_request_id, new_reviewer_id).await
}
