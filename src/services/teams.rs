//! Team and user management.
//!
//! Teams are created together with their members. Users are upserted, so
//! submitting an existing user under a new team moves them.

use crate::db::pool::{begin_write, DbPool};
use crate::error::{is_unique_violation, AppError};
use crate::models::{Team, TeamMember, User};
use std::collections::HashSet;

/// Create a team and upsert its members in one transaction.
///
/// Fails with `TeamExists` if a team with this name is already present.
pub async fn create_team(pool: &DbPool, team: &Team) -> Result<Team, AppError> {
    validate_team(team)?;

    let mut tx = begin_write(pool).await?;

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT team_name FROM teams WHERE team_name = ?")
            .bind(&team.team_name)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_some() {
        return Err(AppError::team_exists(&team.team_name));
    }

    sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
        .bind(&team.team_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::team_exists(&team.team_name)
            } else {
                AppError::from(e)
            }
        })?;

    for member in &team.members {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(&member.user_id)
        .bind(&member.username)
        .bind(&team.team_name)
        .bind(member.is_active)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    log::info!(
        "[teams] Created team {} with {} members",
        team.team_name,
        team.members.len()
    );

    Ok(team.clone())
}

/// Look up a team and its members, sorted by user id.
///
/// A team without members is reported as not found.
pub async fn get_team(pool: &DbPool, team_name: &str) -> Result<Team, AppError> {
    let members: Vec<TeamMember> = sqlx::query_as(
        r#"
        SELECT user_id, username, is_active
        FROM users
        WHERE team_name = ?
        ORDER BY user_id
        "#,
    )
    .bind(team_name)
    .fetch_all(pool)
    .await?;

    if members.is_empty() {
        return Err(AppError::not_found_with_id("Team", team_name));
    }

    Ok(Team {
        team_name: team_name.to_string(),
        members,
    })
}

/// Toggle a user's active flag and return the updated user.
pub async fn set_user_active(
    pool: &DbPool,
    user_id: &str,
    is_active: bool,
) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as(
        r#"
        UPDATE users SET is_active = ?
        WHERE user_id = ?
        RETURNING user_id, username, team_name, is_active
        "#,
    )
    .bind(is_active)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let user = user.ok_or_else(|| AppError::not_found_with_id("User", user_id))?;

    log::info!("[teams] Set user {} active={}", user.user_id, user.is_active);

    Ok(user)
}

fn validate_team(team: &Team) -> Result<(), AppError> {
    if team.team_name.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            "team_name is required",
            "team_name",
        ));
    }

    let mut seen = HashSet::new();
    for member in &team.members {
        if member.user_id.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "member user_id is required",
                "members",
            ));
        }
        if !seen.insert(member.user_id.as_str()) {
            return Err(AppError::invalid_input_field(
                format!("duplicate member {}", member.user_id),
                "members",
            ));
        }
    }

    Ok(())
}
