/// Identity sync and worker profiles
///
/// Every authenticated session starts with a sync: the identity provider's view of the
/// user is reconciled into the local users table. The first sync that leaves a user
/// with the worker role also provisions their (empty) worker profile, in the same
/// transaction, so a worker is never observed without one.
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::identity::IdentityManager;
/// use handyhub_shared::models::user::{SyncUser, UserRole};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let identity = IdentityManager::new(pool);
///
/// let outcome = identity.sync_user(SyncUser {
///     id: "user_w1".to_string(),
///     email: "sam@example.com".to_string(),
///     name: "Sam".to_string(),
///     role: UserRole::Worker,
///     phone_number: Some("+15550100".to_string()),
///     avatar_url: None,
/// }).await?;
///
/// assert!(outcome.profile_created);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use validator::Validate;

use crate::auth::authorization::require_role;
use crate::auth::context::CallerContext;
use crate::error::{CoreError, CoreResult};
use crate::models::user::{SyncUser, User, UserRole};
use crate::models::worker_profile::{UpdateWorkerProfile, WorkerProfile};

/// Result of a sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// User row as stored after the sync
    pub user: User,

    /// Whether this sync provisioned the worker profile
    pub profile_created: bool,
}

fn trimmed(data: SyncUser) -> SyncUser {
    SyncUser {
        id: data.id.trim().to_string(),
        email: data.email.trim().to_string(),
        name: data.name.trim().to_string(),
        role: data.role,
        phone_number: data
            .phone_number
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        avatar_url: data
            .avatar_url
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
    }
}

#[derive(Clone)]
pub struct IdentityManager {
    db: SqlitePool,
}

impl IdentityManager {
    pub fn new(db: SqlitePool) -> Self {
        IdentityManager { db }
    }

    /// Reconciles an external identity into the local user record
    ///
    /// # Errors
    ///
    /// - `ValidationFailure` if id, email or name is empty
    /// - `ConstraintViolation` if another user already owns the email
    pub async fn sync_user(&self, data: SyncUser) -> CoreResult<SyncOutcome> {
        let data = trimmed(data);
        data.validate()?;

        let mut tx = self.db.begin().await?;

        let user = User::upsert(&mut *tx, &data).await?;

        let profile_created = if user.role == UserRole::Worker {
            WorkerProfile::create_default(&mut *tx, &user.id).await?
        } else {
            false
        };

        tx.commit().await?;

        if profile_created {
            info!(user_id = %user.id, "Worker profile provisioned");
        }
        debug!(user_id = %user.id, role = %user.role, "User synced");

        Ok(SyncOutcome {
            user,
            profile_created,
        })
    }

    pub async fn get_user(&self, id: &str) -> CoreResult<User> {
        User::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    pub async fn get_profile(&self, worker_id: &str) -> CoreResult<WorkerProfile> {
        WorkerProfile::find_by_id(&self.db, worker_id)
            .await?
            .ok_or_else(|| CoreError::not_found("worker profile", worker_id))
    }

    /// Patches the caller's own worker profile
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is a worker
    /// - `ValidationFailure` for negative stats
    /// - `NotFound` if the caller has no profile
    pub async fn update_profile(
        &self,
        caller: &CallerContext,
        patch: UpdateWorkerProfile,
    ) -> CoreResult<WorkerProfile> {
        require_role(caller, UserRole::Worker)?;
        patch.validate()?;

        let profile = WorkerProfile::update(&self.db, &caller.user_id, &patch)
            .await?
            .ok_or_else(|| CoreError::not_found("worker profile", &caller.user_id))?;

        info!(worker_id = %profile.id, "Worker profile updated");

        Ok(profile)
    }
}
