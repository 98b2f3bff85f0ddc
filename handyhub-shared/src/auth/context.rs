/// Caller context handed to the domain managers
///
/// The request layer authenticates the caller and builds a `CallerContext`; the core
/// trusts the id it carries. `resolve` loads the role stored for that id, so the role
/// the managers check is always the locally synced one.
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::auth::context::CallerContext;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let caller = CallerContext::resolve(&pool, "user_2a9").await?;
/// if caller.is_admin() {
///     println!("{} may edit the catalog", caller.user_id);
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::authorization::AuthzError;
use crate::models::user::{User, UserRole};

/// Authenticated caller: id plus the role it holds locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Identity-provider user id
    pub user_id: String,

    /// Role stored on the user record
    pub role: UserRole,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn homeowner(user_id: impl Into<String>) -> Self {
        Self::new(user_id, UserRole::Homeowner)
    }

    pub fn worker(user_id: impl Into<String>) -> Self {
        Self::new(user_id, UserRole::Worker)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, UserRole::Admin)
    }

    /// Builds the context from the users table
    ///
    /// # Errors
    ///
    /// `AuthzError::UnknownCaller` if no user has this id.
    pub async fn resolve(pool: &SqlitePool, user_id: &str) -> Result<Self, AuthzError> {
        let role = User::find_role(pool, user_id)
            .await?
            .ok_or_else(|| AuthzError::UnknownCaller(user_id.to_string()))?;

        Ok(Self::new(user_id, role))
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_worker(&self) -> bool {
        self.role == UserRole::Worker
    }

    /// Checks if the caller is the given user
    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
