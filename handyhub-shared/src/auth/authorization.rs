/// Authorization helpers and permission checks
///
/// # Permission Model
///
/// HandyHub has two kinds of checks:
///
/// 1. **Capability**: the caller's role allows the operation at all (admins edit the
///    catalog, workers publish offerings)
/// 2. **Resource scope**: the caller is the right party for this record (the homeowner
///    who made the booking, the worker assigned through the offering, a chat participant)
///
/// Resource-scoped checks never look at the role; a worker's own homeowner bookings are
/// still theirs to cancel.
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::auth::authorization::{require_admin, require_ownership};
/// use handyhub_shared::auth::context::CallerContext;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let caller = CallerContext::admin("user_admin");
/// require_admin(&caller)?;
/// require_ownership(&caller, "user_admin", "booking")?;
/// # Ok(())
/// # }
/// ```

use super::context::CallerContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller id has no local user record
    #[error("Unknown caller {0}")]
    UnknownCaller(String),

    /// Caller doesn't have the required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole {
        required: UserRole,
        actual: UserRole,
    },

    /// Caller is not the right party for the resource
    #[error("Not authorized to access this {0}")]
    NotAuthorized(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks if the caller holds exactly the required role
pub fn require_role(caller: &CallerContext, required: UserRole) -> Result<(), AuthzError> {
    if caller.role != required {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: caller.role,
        });
    }

    Ok(())
}

/// Checks if the caller may mutate the global catalog
pub fn require_admin(caller: &CallerContext) -> Result<(), AuthzError> {
    require_role(caller, UserRole::Admin)
}

/// Checks if the caller owns a resource
///
/// `resource` names the record kind for the error message.
pub fn require_ownership(
    caller: &CallerContext,
    owner_id: &str,
    resource: &str,
) -> Result<(), AuthzError> {
    if !caller.is(owner_id) {
        return Err(AuthzError::NotAuthorized(resource.to_string()));
    }

    Ok(())
}

/// Checks if the caller is one of the parties of a resource
pub fn require_participant(
    caller: &CallerContext,
    parties: &[&str],
    resource: &str,
) -> Result<(), AuthzError> {
    if !parties.iter().any(|party| caller.is(party)) {
        return Err(AuthzError::NotAuthorized(resource.to_string()));
    }

    Ok(())
}
