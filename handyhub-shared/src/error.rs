/// Error type shared by every HandyHub component
///
/// Domain managers return `CoreResult<T>`. Store failures are classified once, in
/// `From<sqlx::Error>`, so a uniqueness race in one manager looks the same as a
/// uniqueness race in another.
///
/// | Variant | Conflict | Status |
/// |---|---|---|
/// | `NotFound` | no | 404 |
/// | `Forbidden` | no | 403 |
/// | `InvalidTransition` | yes | 409 |
/// | `ConstraintViolation` | yes | 409 |
/// | `ValidationFailure` | no | 422 |
/// | `StoreUnavailable` | no | 503 |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::authorization::AuthzError;

/// Result alias used across the domain managers
pub type CoreResult<T> = Result<T, CoreError>;

/// Which kind of declared store constraint rejected a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey => "foreign_key",
            ConstraintKind::Check => "check",
            ConstraintKind::NotNull => "not_null",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified domain error
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller lacks the role or ownership the operation needs
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Booking state machine refused the move
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A declared store constraint rejected the write
    #[error("Constraint violation ({kind}): {constraint}")]
    ConstraintViolation {
        kind: ConstraintKind,
        constraint: String,
    },

    /// Input failed validation before reaching the store
    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    /// The store could not be reached or failed unexpectedly
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        CoreError::ValidationFailure(reason.into())
    }

    /// Transition refused between two named states
    pub fn transition(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        CoreError::InvalidTransition(format!("cannot move from {} to {}", from, to))
    }

    /// Conflicts are failures caused by current state rather than by the request itself
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidTransition(_) | CoreError::ConstraintViolation { .. }
        )
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            CoreError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            }
        )
    }

    /// Conventional HTTP status for the caller layer
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::NotFound { .. } => 404,
            CoreError::Forbidden(_) => 403,
            CoreError::InvalidTransition(_) | CoreError::ConstraintViolation { .. } => 409,
            CoreError::ValidationFailure(_) => 422,
            CoreError::StoreUnavailable(_) => 503,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "not_found",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::InvalidTransition(_) => "invalid_transition",
            CoreError::ConstraintViolation { .. } => "constraint_violation",
            CoreError::ValidationFailure(_) => "validation_failure",
            CoreError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// Pulls the rule name out of a SQLite constraint message
///
/// SQLite reports `UNIQUE constraint failed: users.email`,
/// `UNIQUE constraint failed: index 'chats_participants_key'`,
/// `CHECK constraint failed: price_range_valid` and a bare
/// `FOREIGN KEY constraint failed`.
pub(crate) fn constraint_name(message: &str, kind: ConstraintKind) -> String {
    let detail = message
        .split_once("constraint failed:")
        .map(|(_, rest)| rest.trim())
        .unwrap_or("");

    if detail.is_empty() {
        return kind.as_str().to_string();
    }

    detail
        .strip_prefix("index ")
        .unwrap_or(detail)
        .trim_matches('\'')
        .to_string()
}

fn classify_message(message: &str) -> Option<ConstraintKind> {
    if message.starts_with("UNIQUE constraint failed") {
        Some(ConstraintKind::Unique)
    } else if message.starts_with("FOREIGN KEY constraint failed") {
        Some(ConstraintKind::ForeignKey)
    } else if message.starts_with("CHECK constraint failed") {
        Some(ConstraintKind::Check)
    } else if message.starts_with("NOT NULL constraint failed") {
        Some(ConstraintKind::NotNull)
    } else {
        None
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::not_found("record", "row"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();

                let kind = match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                    sqlx::error::ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                    sqlx::error::ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                    sqlx::error::ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                    _ => classify_message(&message),
                };

                match kind {
                    Some(kind) => {
                        let constraint = db_err
                            .constraint()
                            .map(str::to_string)
                            .unwrap_or_else(|| constraint_name(&message, kind));
                        tracing::debug!(%kind, %constraint, "Store constraint rejected write");
                        CoreError::ConstraintViolation { kind, constraint }
                    }
                    None => CoreError::StoreUnavailable(format!("Database error: {}", message)),
                }
            }
            other => CoreError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::ValidationFailure(err.to_string())
    }
}

impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::UnknownCaller(id) => CoreError::Forbidden(format!("Unknown caller {}", id)),
            AuthzError::InsufficientRole { .. } | AuthzError::NotAuthorized(_) => {
                CoreError::Forbidden(err.to_string())
            }
            AuthzError::DatabaseError(db_err) => db_err.into(),
        }
    }
}
