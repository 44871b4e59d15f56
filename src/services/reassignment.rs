//! Reviewer reassignment.
//!
//! Two entry points:
//! - [`reassign_reviewer`] swaps one reviewer on one open pull request.
//! - [`bulk_deactivate_team`] deactivates a whole team and cascades the
//!   replacement of its members on every open pull request they review.
//!
//! Both run in a single write transaction. Any store fault rolls back every
//! write, so a pull request is never left without its reviewer or with a
//! duplicate one.

use crate::db::pool::{begin_write, DbPool};
use crate::db::review_links;
use crate::error::AppError;
use crate::models::{PullRequest, PullRequestStatus};
use crate::services::assignment;
use crate::services::eligibility;
use crate::services::pull_requests::{fetch_pull_request, require, user_team};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::{BTreeMap, HashSet};

/// Result of a successful single reassignment.
#[derive(Debug, Clone, Serialize)]
pub struct Reassignment {
    pub pr: PullRequest,
    pub replaced_by: String,
}

/// One completed reviewer swap performed by the team cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub pull_request_id: String,
    pub old_reviewer_id: String,
    pub new_reviewer_id: String,
}

/// A (pull request, reviewer) pair the team cascade could not replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPair {
    pub pull_request_id: String,
    pub reviewer_id: String,
    pub reason: String,
}

/// Report returned by [`bulk_deactivate_team`].
///
/// `reassigned_prs_count` counts (pull request, reviewer) pairs detected as
/// needing replacement. Every detected pair ends up in exactly one of
/// `replacements` or `failed_pairs`, so the count always equals the sum of
/// their lengths. `reassign_failures` is the per pull request summary of
/// `failed_pairs`.
#[derive(Debug, Clone, Serialize)]
pub struct BulkDeactivateReport {
    pub team_name: String,
    pub deactivated_users: Vec<String>,
    pub reassigned_prs_count: usize,
    pub replacements: Vec<Replacement>,
    pub failed_pairs: Vec<FailedPair>,
    /// pull_request_id -> failure code
    pub reassign_failures: BTreeMap<String, String>,
}

/// Replace `old_reviewer_id` on an open pull request with a random eligible
/// member of the old reviewer's team.
///
/// Fails with `NotFound`, `PrMerged`, `NotAssigned` or `NoCandidate`.
pub async fn reassign_reviewer(
    pool: &DbPool,
    pull_request_id: &str,
    old_reviewer_id: &str,
) -> Result<Reassignment, AppError> {
    require("pull_request_id", pull_request_id)?;
    require("old_user_id", old_reviewer_id)?;

    let mut tx = begin_write(pool).await?;

    let pr = fetch_pull_request(&mut tx, pull_request_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("PullRequest", pull_request_id))?;

    if !pr.status.is_open() {
        return Err(AppError::pr_merged(pull_request_id));
    }

    if !pr.assigned_reviewers.iter().any(|r| r == old_reviewer_id) {
        return Err(AppError::not_assigned(pull_request_id, old_reviewer_id));
    }

    let team_name = user_team(&mut tx, old_reviewer_id)
        .await?
        .ok_or_else(|| AppError::not_found_with_id("User", old_reviewer_id))?;

    let new_reviewer_id = replace_reviewer(&mut tx, &pr, old_reviewer_id, &team_name).await?;

    let updated = fetch_pull_request(&mut tx, pull_request_id)
        .await?
        .ok_or_else(|| AppError::internal("pull request vanished during reassignment"))?;

    tx.commit().await?;

    log::info!(
        "[reassign] {}: {} -> {}",
        pull_request_id,
        old_reviewer_id,
        new_reviewer_id
    );

    Ok(Reassignment {
        pr: updated,
        replaced_by: new_reviewer_id,
    })
}

/// Deactivate every member of `team_name` and replace them on open pull
/// requests where they are reviewers.
///
/// Replacements are drawn from the active members of each pull request
/// author's team. Pairs without a candidate keep their stale link and are
/// reported in `reassign_failures`; the deactivation still commits.
pub async fn bulk_deactivate_team(
    pool: &DbPool,
    team_name: &str,
) -> Result<BulkDeactivateReport, AppError> {
    require("team_name", team_name)?;

    let mut tx = begin_write(pool).await?;

    let members: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM users WHERE team_name = ? ORDER BY user_id")
            .bind(team_name)
            .fetch_all(&mut *tx)
            .await?;
    if members.is_empty() {
        return Err(AppError::not_found_with_id("Team", team_name));
    }
    let deactivated_users: Vec<String> = members.into_iter().map(|(id,)| id).collect();

    sqlx::query("UPDATE users SET is_active = 0 WHERE team_name = ?")
        .bind(team_name)
        .execute(&mut *tx)
        .await?;

    let affected: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT pr.pull_request_id
        FROM pull_requests pr
        JOIN pr_reviewers r ON r.pull_request_id = pr.pull_request_id
        JOIN users u ON u.user_id = r.reviewer_id
        WHERE pr.status = ? AND u.team_name = ?
        ORDER BY pr.pull_request_id
        "#,
    )
    .bind(PullRequestStatus::Open)
    .bind(team_name)
    .fetch_all(&mut *tx)
    .await?;

    let mut report = BulkDeactivateReport {
        team_name: team_name.to_string(),
        deactivated_users,
        reassigned_prs_count: 0,
        replacements: Vec::new(),
        failed_pairs: Vec::new(),
        reassign_failures: BTreeMap::new(),
    };

    for (pull_request_id,) in affected {
        cascade_pull_request(&mut tx, team_name, &pull_request_id, &mut report).await?;
    }

    tx.commit().await?;

    log::info!(
        "[reassign] Deactivated team {} ({} users): {} reviewer slots affected, {} replaced, {} failed",
        team_name,
        report.deactivated_users.len(),
        report.reassigned_prs_count,
        report.replacements.len(),
        report.failed_pairs.len()
    );

    Ok(report)
}

/// Replace every deactivated member of `team_name` reviewing one pull request.
async fn cascade_pull_request(
    conn: &mut SqliteConnection,
    team_name: &str,
    pull_request_id: &str,
    report: &mut BulkDeactivateReport,
) -> Result<(), AppError> {
    let Some(pr) = fetch_pull_request(conn, pull_request_id).await? else {
        return Ok(());
    };

    let author_team = match user_team(conn, &pr.author_id).await? {
        Some(team) => team,
        None => {
            report
                .reassign_failures
                .insert(pull_request_id.to_string(), "NOT_FOUND".to_string());
            return Ok(());
        }
    };

    for reviewer_id in &pr.assigned_reviewers {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT team_name, is_active FROM users WHERE user_id = ?")
                .bind(reviewer_id)
                .fetch_optional(&mut *conn)
                .await?;

        match row {
            Some((team, is_active)) if team == team_name && !is_active => {}
            _ => continue,
        }

        report.reassigned_prs_count += 1;

        // Earlier swaps on this pull request changed the reviewer list
        let current = fetch_pull_request(conn, pull_request_id)
            .await?
            .ok_or_else(|| AppError::internal("pull request vanished during cascade"))?;

        match replace_reviewer(conn, &current, reviewer_id, &author_team).await {
            Ok(new_reviewer_id) => {
                log::debug!(
                    "[reassign] cascade {}: {} -> {}",
                    pull_request_id,
                    reviewer_id,
                    new_reviewer_id
                );
                report.replacements.push(Replacement {
                    pull_request_id: pull_request_id.to_string(),
                    old_reviewer_id: reviewer_id.clone(),
                    new_reviewer_id,
                });
            }
            Err(e) if !e.is_internal() => {
                log::warn!(
                    "[reassign] cascade {}: cannot replace {}: {}",
                    pull_request_id,
                    reviewer_id,
                    e
                );
                report.failed_pairs.push(FailedPair {
                    pull_request_id: pull_request_id.to_string(),
                    reviewer_id: reviewer_id.clone(),
                    reason: e.code().to_string(),
                });
                report
                    .reassign_failures
                    .insert(pull_request_id.to_string(), e.code().to_string());
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Pick a replacement for `old_reviewer_id` from `team_name` and rewrite the link.
///
/// The author, the old reviewer and everyone already on the pull request are
/// excluded from the pool.
async fn replace_reviewer(
    conn: &mut SqliteConnection,
    pr: &PullRequest,
    old_reviewer_id: &str,
    team_name: &str,
) -> Result<String, AppError> {
    let mut exclude: HashSet<&str> = pr.assigned_reviewers.iter().map(String::as_str).collect();
    exclude.insert(old_reviewer_id);
    exclude.insert(pr.author_id.as_str());

    let candidates = eligibility::resolve_candidates(conn, team_name, &exclude).await?;
    let new_reviewer_id = assignment::pick_replacement(&candidates, &mut rand::thread_rng())
        .ok_or_else(|| AppError::no_candidate(&pr.pull_request_id))?;

    review_links::replace_link(conn, &pr.pull_request_id, old_reviewer_id, &new_reviewer_id)
        .await?;

    Ok(new_reviewer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, pool::PoolSettings};
    use crate::models::{Team, TeamMember};
    use crate::services::{pull_requests, teams};
    use tempfile::{tempdir, TempDir};

    async fn setup() -> (TempDir, DbPool) {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("test.db"), PoolSettings::default())
            .await
            .unwrap();
        (dir, pool)
    }

    async fn add_team(pool: &DbPool, name: &str, ids: &[&str]) {
        let team = Team {
            team_name: name.to_string(),
            members: ids
                .iter()
                .map(|id| TeamMember {
                    user_id: id.to_string(),
                    username: id.to_uppercase(),
                    is_active: true,
                })
                .collect(),
        };
        teams::create_team(pool, &team).await.unwrap();
    }

    #[tokio::test]
    async fn test_reassign_replaces_with_remaining_member() {
        let (_dir, pool) = setup().await;
        add_team(&pool, "a", &["a1", "r1", "r2", "r3"]).await;

        let pr = pull_requests::create_pr(&pool, "pr1", "X", "a1").await.unwrap();
        let old = pr.assigned_reviewers[0].clone();
        let kept = pr.assigned_reviewers[1].clone();
        let spare = ["r1", "r2", "r3"]
            .into_iter()
            .find(|id| !pr.assigned_reviewers.iter().any(|r| r == id))
            .unwrap();

        let result = reassign_reviewer(&pool, "pr1", &old).await.unwrap();
        assert_eq!(result.replaced_by, spare);
        assert!(!result.pr.assigned_reviewers.contains(&old));
        assert!(result.pr.assigned_reviewers.contains(&kept));
        assert_eq!(result.pr.assigned_reviewers.len(), 2);

        let err = reassign_reviewer(&pool, "pr1", &old).await.unwrap_err();
        assert!(matches!(err, AppError::NotAssigned { .. }));
    }

    #[tokio::test]
    async fn test_reassign_without_candidate_leaves_links() {
        let (_dir, pool) = setup().await;
        add_team(&pool, "b", &["b1", "r1"]).await;
        pull_requests::create_pr(&pool, "pr2", "X", "b1").await.unwrap();

        let err = reassign_reviewer(&pool, "pr2", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::NoCandidate { .. }));

        let mut conn = pool.acquire().await.unwrap();
        let reviewers = review_links::list_reviewers(&mut conn, "pr2").await.unwrap();
        assert_eq!(reviewers, vec!["r1".to_string()]);
    }

    #[tokio::test]
    async fn test_reassign_merged_pr_fails() {
        let (_dir, pool) = setup().await;
        add_team(&pool, "a", &["a1", "r1", "r2", "r3"]).await;
        let pr = pull_requests::create_pr(&pool, "pr1", "X", "a1").await.unwrap();
        pull_requests::merge_pr(&pool, "pr1").await.unwrap();

        let err = reassign_reviewer(&pool, "pr1", &pr.assigned_reviewers[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PrMerged { .. }));

        let mut conn = pool.acquire().await.unwrap();
        let reviewers = review_links::list_reviewers(&mut conn, "pr1").await.unwrap();
        assert_eq!(reviewers, pr.assigned_reviewers);
    }

    #[tokio::test]
    async fn test_reassign_unknown_pr() {
        let (_dir, pool) = setup().await;
        let err = reassign_reviewer(&pool, "missing", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bulk_deactivate_unknown_team() {
        let (_dir, pool) = setup().await;
        let err = bulk_deactivate_team(&pool, "ghosts").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bulk_deactivate_replaces_from_author_team() {
        let (_dir, pool) = setup().await;
        add_team(&pool, "product", &["author", "p1", "p2", "p3"]).await;
        add_team(&pool, "infra", &["i1"]).await;

        // Put an infra member on the PR by moving them in and back out
        pull_requests::create_pr(&pool, "pr-x", "X", "author").await.unwrap();
        let pr = {
            let mut conn = pool.acquire().await.unwrap();
            fetch_pull_request(&mut conn, "pr-x").await.unwrap().unwrap()
        };
        let moved = pr.assigned_reviewers[0].clone();
        sqlx::query("UPDATE users SET team_name = 'infra' WHERE user_id = ?")
            .bind(&moved)
            .execute(&pool)
            .await
            .unwrap();

        let report = bulk_deactivate_team(&pool, "infra").await.unwrap();

        let mut expected_users = vec!["i1".to_string(), moved.clone()];
        expected_users.sort();
        assert_eq!(report.deactivated_users, expected_users);
        assert_eq!(report.reassigned_prs_count, 1);
        assert_eq!(report.replacements.len(), 1);
        assert!(report.reassign_failures.is_empty());
        assert!(report.failed_pairs.is_empty());

        let replacement = &report.replacements[0];
        assert_eq!(replacement.old_reviewer_id, moved);
        assert_ne!(replacement.new_reviewer_id, "author");
        assert!(!pr.assigned_reviewers.contains(&replacement.new_reviewer_id));
    }

    #[tokio::test]
    async fn test_bulk_deactivate_reports_every_failed_pair() {
        let (_dir, pool) = setup().await;
        add_team(&pool, "solo", &["s1", "s2", "s3"]).await;
        pull_requests::create_pr(&pool, "p", "X", "s1").await.unwrap();

        let report = bulk_deactivate_team(&pool, "solo").await.unwrap();
        assert_eq!(report.reassigned_prs_count, 2);
        assert!(report.replacements.is_empty());
        assert_eq!(
            report.failed_pairs,
            vec![
                FailedPair {
                    pull_request_id: "p".to_string(),
                    reviewer_id: "s2".to_string(),
                    reason: "NO_CANDIDATE".to_string(),
                },
                FailedPair {
                    pull_request_id: "p".to_string(),
                    reviewer_id: "s3".to_string(),
                    reason: "NO_CANDIDATE".to_string(),
                },
            ]
        );
        assert_eq!(report.reassign_failures.len(), 1);
        assert_eq!(
            report.reassigned_prs_count,
            report.replacements.len() + report.failed_pairs.len()
        );
    }

    #[tokio::test]
    async fn test_bulk_deactivate_records_failures_and_commits() {
        let (_dir, pool) = setup().await;
        add_team(&pool, "solo", &["s1", "s2"]).await;
        pull_requests::create_pr(&pool, "pr-s", "X", "s1").await.unwrap();

        let report = bulk_deactivate_team(&pool, "solo").await.unwrap();
        assert_eq!(report.deactivated_users, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(report.reassigned_prs_count, 1);
        assert!(report.replacements.is_empty());
        assert_eq!(report.failed_pairs.len(), 1);
        assert_eq!(
            report.reassign_failures.get("pr-s").map(String::as_str),
            Some("NO_CANDIDATE")
        );

        let team = teams::get_team(&pool, "solo").await.unwrap();
        assert!(team.members.iter().all(|m| !m.is_active));
    }
}
