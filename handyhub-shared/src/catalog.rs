/// Service catalog and worker offerings
///
/// The catalog is global and curated by admins. Seeding goes through
/// `upsert_service_by_name`, which needs no caller and can be re-run at will.
/// Workers publish one offering per service; publishing again updates the price range.
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::auth::CallerContext;
/// use handyhub_shared::catalog::CatalogManager;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = CatalogManager::new(pool);
/// catalog.seed_catalog().await?;
///
/// let plumbing = catalog.upsert_service_by_name("Plumbing", None).await?;
///
/// let worker = CallerContext::worker("user_w1");
/// catalog
///     .create_or_update_offering(&worker, plumbing.id, 5_000, 12_000)
///     .await?;
///
/// for listing in catalog.list_workers_for_service(plumbing.id).await? {
///     println!("{} from {}", listing.worker_name, listing.price_min);
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{require_admin, require_role};
use crate::auth::context::CallerContext;
use crate::error::{CoreError, CoreResult};
use crate::models::offering::{Offering, WorkerListing};
use crate::models::service::{CreateService, Service, UpdateService};
use crate::models::user::UserRole;
use crate::models::worker_profile::WorkerProfile;

/// Services every fresh installation starts with
pub const DEFAULT_CATALOG: &[(&str, &str)] = &[
    ("Plumbing", "Pipe repair, leak detection, and installations."),
    ("Electrical", "Wiring, fixture installation, and circuit repair."),
    ("Carpentry", "Furniture repair, framing, and woodwork."),
    ("Cleaning", "Standard and deep cleaning for homes."),
    ("Painting", "Interior and exterior wall painting."),
    ("Gardening", "Lawn mowing, pruning, and landscaping."),
    ("Roofing", "Install, repair, and maintain roof systems."),
];

/// Trims a service name and collapses inner whitespace
///
/// Returns None if nothing is left.
pub fn normalize_service_name(name: &str) -> Option<String> {
    let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Checks `0 <= price_min <= price_max`
pub fn validate_price_range(price_min: i64, price_max: i64) -> CoreResult<()> {
    if price_min < 0 || price_max < 0 {
        return Err(CoreError::validation("prices must not be negative"));
    }

    if price_max < price_min {
        return Err(CoreError::validation(format!(
            "price_max ({}) must be at least price_min ({})",
            price_max, price_min
        )));
    }

    Ok(())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Catalog and offering operations
#[derive(Clone)]
pub struct CatalogManager {
    db: SqlitePool,
}

impl CatalogManager {
    pub fn new(db: SqlitePool) -> Self {
        CatalogManager { db }
    }

    /// Adds a service to the catalog (admin only)
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is an admin
    /// - `ValidationFailure` if the name is blank
    /// - `ConstraintViolation` if the name is taken
    pub async fn create_service(
        &self,
        caller: &CallerContext,
        name: &str,
        description: Option<&str>,
    ) -> CoreResult<Service> {
        require_admin(caller)?;

        let name = normalize_service_name(name)
            .ok_or_else(|| CoreError::validation("service name must not be empty"))?;

        let service = Service::create(
            &self.db,
            &CreateService {
                name,
                description: normalize_description(description),
            },
        )
        .await?;

        info!(
            service_id = %service.id,
            name = %service.name,
            admin_id = %caller.user_id,
            "Service created"
        );

        Ok(service)
    }

    /// Patches a service (admin only)
    pub async fn update_service(
        &self,
        caller: &CallerContext,
        id: Uuid,
        patch: UpdateService,
    ) -> CoreResult<Service> {
        require_admin(caller)?;

        let name = match patch.name.as_deref() {
            Some(name) => Some(
                normalize_service_name(name)
                    .ok_or_else(|| CoreError::validation("service name must not be empty"))?,
            ),
            None => None,
        };

        let patch = UpdateService {
            name,
            description: patch
                .description
                .map(|d| normalize_description(d.as_deref())),
        };

        let service = Service::update(&self.db, id, &patch)
            .await?
            .ok_or_else(|| CoreError::not_found("service", id))?;

        info!(service_id = %service.id, admin_id = %caller.user_id, "Service updated");

        Ok(service)
    }

    /// Removes a service (admin only), returning the deleted record
    ///
    /// # Errors
    ///
    /// `ConstraintViolation` (foreign key) while workers still offer the service.
    pub async fn delete_service(&self, caller: &CallerContext, id: Uuid) -> CoreResult<Service> {
        require_admin(caller)?;

        let service = Service::delete(&self.db, id)
            .await?
            .ok_or_else(|| CoreError::not_found("service", id))?;

        info!(service_id = %service.id, name = %service.name, admin_id = %caller.user_id, "Service deleted");

        Ok(service)
    }

    /// Inserts a service or refreshes the description of the one with this name
    pub async fn upsert_service_by_name(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> CoreResult<Service> {
        let name = normalize_service_name(name)
            .ok_or_else(|| CoreError::validation("service name must not be empty"))?;

        let service = Service::upsert_by_name(
            &self.db,
            &CreateService {
                name,
                description: normalize_description(description),
            },
        )
        .await?;

        debug!(service_id = %service.id, name = %service.name, "Service upserted");

        Ok(service)
    }

    /// Upserts every entry of `DEFAULT_CATALOG`
    pub async fn seed_catalog(&self) -> CoreResult<Vec<Service>> {
        let mut services = Vec::with_capacity(DEFAULT_CATALOG.len());

        for &(name, description) in DEFAULT_CATALOG {
            services.push(self.upsert_service_by_name(name, Some(description)).await?);
        }

        info!(count = services.len(), "Service catalog seeded");

        Ok(services)
    }

    pub async fn list_services(&self) -> CoreResult<Vec<Service>> {
        Ok(Service::list(&self.db).await?)
    }

    pub async fn get_service(&self, id: Uuid) -> CoreResult<Service> {
        Service::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| CoreError::not_found("service", id))
    }

    /// Public listing of the workers offering a service, cheapest first
    pub async fn list_workers_for_service(&self, service_id: Uuid) -> CoreResult<Vec<WorkerListing>> {
        self.get_service(service_id).await?;

        Ok(Offering::list_workers_for_service(&self.db, service_id).await?)
    }

    /// Publishes the caller's price range for a service
    ///
    /// Inserts the offering, or updates the price range if the caller already offers
    /// the service. Prices are validated before anything is written.
    ///
    /// # Errors
    ///
    /// - `ValidationFailure` unless `0 <= price_min <= price_max`
    /// - `Forbidden` unless the caller is a worker with a profile
    /// - `NotFound` if the service does not exist
    pub async fn create_or_update_offering(
        &self,
        caller: &CallerContext,
        service_id: Uuid,
        price_min: i64,
        price_max: i64,
    ) -> CoreResult<Offering> {
        validate_price_range(price_min, price_max)?;

        require_role(caller, UserRole::Worker)?;
        if !WorkerProfile::exists(&self.db, &caller.user_id).await? {
            return Err(CoreError::forbidden("caller has no worker profile"));
        }

        self.get_service(service_id).await?;

        match Offering::insert(&self.db, &caller.user_id, service_id, price_min, price_max).await {
            Ok(offering) => {
                info!(
                    offering_id = %offering.id,
                    worker_id = %offering.worker_id,
                    service_id = %service_id,
                    price_min,
                    price_max,
                    "Offering created"
                );
                Ok(offering)
            }
            Err(err) => {
                let err = CoreError::from(err);
                if !err.is_unique_violation() {
                    return Err(err);
                }

                let offering = Offering::update_prices_by_pair(
                    &self.db,
                    &caller.user_id,
                    service_id,
                    price_min,
                    price_max,
                )
                .await?
                .ok_or(err)?;

                info!(
                    offering_id = %offering.id,
                    worker_id = %offering.worker_id,
                    service_id = %service_id,
                    price_min,
                    price_max,
                    "Offering price range updated"
                );
                Ok(offering)
            }
        }
    }

    pub async fn list_offerings_for_worker(&self, worker_id: &str) -> CoreResult<Vec<Offering>> {
        Ok(Offering::list_by_worker(&self.db, worker_id).await?)
    }
}
