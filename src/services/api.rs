//! REST API routes.
//!
//! Thin handlers: decode the request, call the engine operation, encode the
//! result. Every failure is rendered as `{"error": {"code", "message"}}` with
//! a status derived from the error's stable code.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{PullRequest, PullRequestShort, ReviewerStat, Team, User};
use crate::services::reassignment::BulkDeactivateReport;
use crate::services::{pull_requests, reassignment, reports, teams};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
}

// ── Error handling ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(AppError);

impl ApiErr {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::TeamExists { .. } | AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::PrExists { .. }
            | AppError::PrMerged { .. }
            | AppError::NotAssigned { .. }
            | AppError::NoCandidate { .. } => StatusCode::CONFLICT,
            AppError::Database { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store details stay in the log
        let message = if self.0.is_internal() {
            log::error!("[api] {}", self.0);
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    code: self.0.code(),
                    message,
                },
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid_input(format!(
            "invalid json: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiErr {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct TeamNameQuery {
    team_name: String,
}

#[derive(Deserialize)]
struct UserIdQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct TeamNameBody {
    team_name: String,
}

#[derive(Deserialize)]
struct SetIsActiveBody {
    user_id: String,
    is_active: bool,
}

#[derive(Deserialize)]
struct CreatePrBody {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
}

#[derive(Deserialize)]
struct MergePrBody {
    pull_request_id: String,
}

#[derive(Deserialize)]
struct ReassignBody {
    pull_request_id: String,
    old_user_id: String,
}

#[derive(Serialize)]
struct TeamResponse {
    team: Team,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

#[derive(Serialize)]
struct PrResponse {
    pr: PullRequest,
}

#[derive(Serialize)]
struct ReassignResponse {
    pr: PullRequest,
    replaced_by: String,
}

#[derive(Serialize)]
struct ReviewerPrsResponse {
    user_id: String,
    pull_requests: Vec<PullRequestShort>,
}

#[derive(Serialize)]
struct StatsResponse {
    stats: Vec<ReviewerStat>,
}

// ── Route builder ────────────────────────────────────────────────────────────

/// Build the API routes.
pub fn api_routes() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .route("/team/add", post(create_team))
        .route("/team/get", get(get_team))
        .route("/team/deactivate", post(bulk_deactivate))
        .route("/users/setIsActive", post(set_is_active))
        .route("/users/getReview", get(get_prs_for_reviewer))
        .route("/pullRequest/create", post(create_pr))
        .route("/pullRequest/merge", post(merge_pr))
        .route("/pullRequest/reassign", post(reassign))
        .route("/stats/reviewers", get(reviewer_stats))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// POST /team/add: create a team with its members.
async fn create_team(
    State(state): State<ApiState>,
    payload: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiErr> {
    let Json(team) = payload?;
    let team = teams::create_team(&state.db, &team).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

/// GET /team/get?team_name=X: team with members.
async fn get_team(
    State(state): State<ApiState>,
    query: Result<Query<TeamNameQuery>, QueryRejection>,
) -> Result<Json<Team>, ApiErr> {
    let Query(params) = query?;
    require("team_name", &params.team_name)?;
    Ok(Json(teams::get_team(&state.db, &params.team_name).await?))
}

/// POST /team/deactivate: deactivate a team and cascade reassignment.
async fn bulk_deactivate(
    State(state): State<ApiState>,
    payload: Result<Json<TeamNameBody>, JsonRejection>,
) -> Result<Json<BulkDeactivateReport>, ApiErr> {
    let Json(body) = payload?;
    let report = reassignment::bulk_deactivate_team(&state.db, &body.team_name).await?;
    Ok(Json(report))
}

/// POST /users/setIsActive: toggle a user's active flag.
async fn set_is_active(
    State(state): State<ApiState>,
    payload: Result<Json<SetIsActiveBody>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiErr> {
    let Json(body) = payload?;
    require("user_id", &body.user_id)?;
    let user = teams::set_user_active(&state.db, &body.user_id, body.is_active).await?;
    Ok(Json(UserResponse { user }))
}

/// GET /users/getReview?user_id=X: pull requests the user reviews.
async fn get_prs_for_reviewer(
    State(state): State<ApiState>,
    query: Result<Query<UserIdQuery>, QueryRejection>,
) -> Result<Json<ReviewerPrsResponse>, ApiErr> {
    let Query(params) = query?;
    require("user_id", &params.user_id)?;
    let pull_requests = reports::get_prs_for_reviewer(&state.db, &params.user_id).await?;
    Ok(Json(ReviewerPrsResponse {
        user_id: params.user_id,
        pull_requests,
    }))
}

/// POST /pullRequest/create: create a pull request with reviewers.
async fn create_pr(
    State(state): State<ApiState>,
    payload: Result<Json<CreatePrBody>, JsonRejection>,
) -> Result<(StatusCode, Json<PrResponse>), ApiErr> {
    let Json(body) = payload?;
    let pr = pull_requests::create_pr(
        &state.db,
        &body.pull_request_id,
        &body.pull_request_name,
        &body.author_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

/// POST /pullRequest/merge: merge a pull request (idempotent).
async fn merge_pr(
    State(state): State<ApiState>,
    payload: Result<Json<MergePrBody>, JsonRejection>,
) -> Result<Json<PrResponse>, ApiErr> {
    let Json(body) = payload?;
    let pr = pull_requests::merge_pr(&state.db, &body.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

/// POST /pullRequest/reassign: replace one reviewer.
async fn reassign(
    State(state): State<ApiState>,
    payload: Result<Json<ReassignBody>, JsonRejection>,
) -> Result<Json<ReassignResponse>, ApiErr> {
    let Json(body) = payload?;
    let result =
        reassignment::reassign_reviewer(&state.db, &body.pull_request_id, &body.old_user_id)
            .await?;
    Ok(Json(ReassignResponse {
        pr: result.pr,
        replaced_by: result.replaced_by,
    }))
}

/// GET /stats/reviewers: assignment counts per reviewer.
async fn reviewer_stats(State(state): State<ApiState>) -> Result<Json<StatsResponse>, ApiErr> {
    let stats = reports::get_reviewer_stats(&state.db).await?;
    Ok(Json(StatsResponse { stats }))
}

fn require(field: &str, value: &str) -> Result<(), ApiErr> {
    pull_requests::require(field, value).map_err(ApiErr::from)
}
