//! Application error types.
//!
//! Every engine operation returns `AppError`. Variants serialize to a
//! structured JSON object and each one carries a stable code that the HTTP
//! layer maps to a status independent of the message wording.

use serde::Serialize;
use thiserror::Error;

/// Coarse error taxonomy shared by all operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Referenced entity is absent.
    NotFound,
    /// Duplicate creation.
    AlreadyExists,
    /// Operation is illegal for the current pull request status.
    InvalidState,
    /// A precondition of the operation does not hold.
    PreconditionFailed,
    /// Malformed request input.
    InvalidInput,
    /// Store or transport fault.
    Internal,
}

/// Application-level errors returned by engine operations.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Requested resource not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// A team with this name already exists.
    #[error("Team already exists: {team_name}")]
    TeamExists { team_name: String },

    /// A pull request with this id already exists.
    #[error("Pull request already exists: {pull_request_id}")]
    PrExists { pull_request_id: String },

    /// The pull request is merged and its reviewers are frozen.
    #[error("Pull request is merged: {pull_request_id}")]
    PrMerged { pull_request_id: String },

    /// The reviewer is not assigned to the pull request.
    #[error("Reviewer {reviewer_id} is not assigned to {pull_request_id}")]
    NotAssigned {
        pull_request_id: String,
        reviewer_id: String,
    },

    /// No eligible replacement reviewer exists.
    #[error("No eligible candidate for {pull_request_id}")]
    NoCandidate { pull_request_id: String },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: None,
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn team_exists(team_name: impl Into<String>) -> Self {
        Self::TeamExists {
            team_name: team_name.into(),
        }
    }

    pub fn pr_exists(pull_request_id: impl Into<String>) -> Self {
        Self::PrExists {
            pull_request_id: pull_request_id.into(),
        }
    }

    pub fn pr_merged(pull_request_id: impl Into<String>) -> Self {
        Self::PrMerged {
            pull_request_id: pull_request_id.into(),
        }
    }

    pub fn not_assigned(pull_request_id: impl Into<String>, reviewer_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pull_request_id: pull_request_id.into(),
            reviewer_id: reviewer_id.into(),
        }
    }

    pub fn no_candidate(pull_request_id: impl Into<String>) -> Self {
        Self::NoCandidate {
            pull_request_id: pull_request_id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: None,
        }
    }

    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TeamExists { .. } | Self::PrExists { .. } => ErrorKind::AlreadyExists,
            Self::PrMerged { .. } => ErrorKind::InvalidState,
            Self::NotAssigned { .. } | Self::NoCandidate { .. } => ErrorKind::PreconditionFailed,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Database { .. } | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code, independent of the message wording.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::TeamExists { .. } => "TEAM_EXISTS",
            Self::PrExists { .. } => "PR_EXISTS",
            Self::PrMerged { .. } => "PR_MERGED",
            Self::NotAssigned { .. } => "NOT_ASSIGNED",
            Self::NoCandidate { .. } => "NO_CANDIDATE",
            Self::InvalidInput { .. } => "BAD_REQUEST",
            Self::Database { .. } | Self::Internal { .. } => "INTERNAL",
        }
    }

    /// Whether the error is a store/transport fault rather than a business outcome.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", err))
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::Sqlite(e) => Self::from(e),
            crate::db::DbError::Migration(message) => Self::database_with_op(message, "migrate"),
        }
    }
}

/// Whether a sqlx error is a UNIQUE / PRIMARY KEY constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
