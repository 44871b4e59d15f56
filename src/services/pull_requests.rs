//! Pull request lifecycle: creation with automatic reviewer assignment, and
//! the one-way OPEN -> MERGED transition.

use crate::db::pool::{begin_write, DbPool};
use crate::db::review_links;
use crate::error::{is_unique_violation, AppError};
use crate::models::{PullRequest, PullRequestStatus};
use crate::services::assignment::{self, INITIAL_REVIEWER_COUNT};
use crate::services::eligibility;
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::HashSet;

/// Create an OPEN pull request and assign up to two reviewers from the
/// author's team.
///
/// Fewer than two reviewers (including none) is a normal outcome when the
/// team has too few other active members.
pub async fn create_pr(
    pool: &DbPool,
    pull_request_id: &str,
    pull_request_name: &str,
    author_id: &str,
) -> Result<PullRequest, AppError> {
    require("pull_request_id", pull_request_id)?;
    require("author_id", author_id)?;

    let mut tx = begin_write(pool).await?;

    let team_name = user_team(&mut tx, author_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("User", author_id))?;

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT pull_request_id FROM pull_requests WHERE pull_request_id = ?")
            .bind(pull_request_id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_some() {
        return Err(AppError::pr_exists(pull_request_id));
    }

    let exclude: HashSet<&str> = [author_id].into_iter().collect();
    let candidates = eligibility::resolve_candidates(&mut tx, &team_name, &exclude).await?;
    let mut reviewers =
        assignment::select_reviewers(candidates, INITIAL_REVIEWER_COUNT, &mut rand::thread_rng());
    reviewers.sort();

    let created_at = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(pull_request_id)
    .bind(pull_request_name)
    .bind(author_id)
    .bind(PullRequestStatus::Open)
    .bind(created_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::pr_exists(pull_request_id)
        } else {
            AppError::from(e)
        }
    })?;

    for reviewer_id in &reviewers {
        review_links::insert_link(&mut tx, pull_request_id, reviewer_id).await?;
    }

    tx.commit().await?;

    log::info!(
        "[pr] Created {} by {} with reviewers {:?}",
        pull_request_id,
        author_id,
        reviewers
    );

    Ok(PullRequest {
        pull_request_id: pull_request_id.to_string(),
        pull_request_name: pull_request_name.to_string(),
        author_id: author_id.to_string(),
        status: PullRequestStatus::Open,
        assigned_reviewers: reviewers,
        created_at,
        merged_at: None,
    })
}

/// Mark a pull request as merged.
///
/// Idempotent: merging an already merged pull request returns the stored
/// record unchanged, including its original `merged_at`.
pub async fn merge_pr(pool: &DbPool, pull_request_id: &str) -> Result<PullRequest, AppError> {
    require("pull_request_id", pull_request_id)?;

    let mut tx = begin_write(pool).await?;

    let pr = fetch_pull_request(&mut tx, pull_request_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("PullRequest", pull_request_id))?;

    if pr.status == PullRequestStatus::Merged {
        log::debug!("[pr] {} already merged", pull_request_id);
        return Ok(pr);
    }

    sqlx::query(
        "UPDATE pull_requests SET status = ?, merged_at = ? WHERE pull_request_id = ? AND status = ?",
    )
    .bind(PullRequestStatus::Merged)
    .bind(Utc::now())
    .bind(pull_request_id)
    .bind(PullRequestStatus::Open)
    .execute(&mut *tx)
    .await?;

    let merged = fetch_pull_request(&mut tx, pull_request_id)
        .await?
        .ok_or_else(|| AppError::internal("pull request vanished during merge"))?;

    tx.commit().await?;

    log::info!("[pr] {} is now {}", pull_request_id, merged.status);

    Ok(merged)
}

/// Load a pull request together with its current reviewers.
pub async fn fetch_pull_request(
    conn: &mut SqliteConnection,
    pull_request_id: &str,
) -> Result<Option<PullRequest>, AppError> {
    let pr: Option<PullRequest> = sqlx::query_as(
        r#"
        SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
        FROM pull_requests
        WHERE pull_request_id = ?
        "#,
    )
    .bind(pull_request_id)
    .fetch_optional(&mut *conn)
    .await?;

    match pr {
        Some(mut pr) => {
            pr.assigned_reviewers = review_links::list_reviewers(conn, pull_request_id).await?;
            Ok(Some(pr))
        }
        None => Ok(None),
    }
}

/// Team of a user, or `None` if the user is unknown.
pub(crate) async fn user_team(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<String>, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT team_name FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|(team_name,)| team_name))
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, pool::PoolSettings};
    use crate::models::{Team, TeamMember};
    use crate::services::teams;
    use tempfile::{tempdir, TempDir};

    async fn setup(members: &[(&str, bool)]) -> (TempDir, DbPool) {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("test.db"), PoolSettings::default())
            .await
            .unwrap();
        let team = Team {
            team_name: "core".to_string(),
            members: members
                .iter()
                .map(|(id, active)| TeamMember {
                    user_id: id.to_string(),
                    username: id.to_uppercase(),
                    is_active: *active,
                })
                .collect(),
        };
        teams::create_team(&pool, &team).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn test_create_assigns_two_reviewers_excluding_author() {
        let (_dir, pool) = setup(&[("a1", true), ("r1", true), ("r2", true), ("r3", true)]).await;

        let pr = create_pr(&pool, "pr-1", "Add cache", "a1").await.unwrap();

        assert_eq!(pr.status, PullRequestStatus::Open);
        assert_eq!(pr.assigned_reviewers.len(), 2);
        assert!(!pr.assigned_reviewers.contains(&"a1".to_string()));
        assert_ne!(pr.assigned_reviewers[0], pr.assigned_reviewers[1]);
        assert!(pr.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_inactive_members_are_never_assigned() {
        let (_dir, pool) = setup(&[("a1", true), ("r1", false), ("r2", true)]).await;

        let pr = create_pr(&pool, "pr-1", "Fix bug", "a1").await.unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["r2".to_string()]);
    }

    #[tokio::test]
    async fn test_solo_author_gets_no_reviewers() {
        let (_dir, pool) = setup(&[("a1", true)]).await;

        let pr = create_pr(&pool, "pr-1", "Solo", "a1").await.unwrap();
        assert!(pr.assigned_reviewers.is_empty());
    }

    #[tokio::test]
    async fn test_create_errors() {
        let (_dir, pool) = setup(&[("a1", true), ("r1", true)]).await;

        let err = create_pr(&pool, "pr-1", "X", "ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        create_pr(&pool, "pr-1", "X", "a1").await.unwrap();
        let err = create_pr(&pool, "pr-1", "X again", "a1").await.unwrap_err();
        assert!(matches!(err, AppError::PrExists { .. }));

        let err = create_pr(&pool, "", "X", "a1").await.unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_create_accepts_empty_name() {
        let (_dir, pool) = setup(&[("a1", true), ("r1", true)]).await;

        let pr = create_pr(&pool, "pr-1", "", "a1").await.unwrap();
        assert_eq!(pr.pull_request_name, "");

        let mut conn = pool.acquire().await.unwrap();
        let stored = fetch_pull_request(&mut conn, "pr-1").await.unwrap().unwrap();
        assert_eq!(stored.pull_request_name, "");
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let (_dir, pool) = setup(&[("a1", true), ("r1", true)]).await;
        create_pr(&pool, "pr-1", "X", "a1").await.unwrap();

        let first = merge_pr(&pool, "pr-1").await.unwrap();
        assert_eq!(first.status, PullRequestStatus::Merged);
        assert!(first.merged_at.is_some());
        assert_eq!(first.assigned_reviewers, vec!["r1".to_string()]);

        let second = merge_pr(&pool, "pr-1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_merge_unknown_pr() {
        let (_dir, pool) = setup(&[("a1", true)]).await;
        let err = merge_pr(&pool, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
