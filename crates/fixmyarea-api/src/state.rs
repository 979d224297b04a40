//! Shared application state.

use std::sync::Arc;

use chrono::Duration;
use fixmyarea_auth::{AccessControl, AuthConfig, AuthService, OtpNotifier};
use fixmyarea_core::clock::Clock;
use fixmyarea_db::repository::{
    SurrealComplaintRepository, SurrealDogRecordRepository, SurrealLocationRepository,
    SurrealOtpRepository, SurrealUserRepository,
};
use fixmyarea_records::{ComplaintService, DogService, LocationDirectory, ReportService};
use surrealdb::{Connection, Surreal};

pub type Auth<C> = AuthService<SurrealUserRepository<C>, SurrealOtpRepository<C>>;
pub type Access<C> = AccessControl<SurrealUserRepository<C>>;
pub type Complaints<C> = ComplaintService<SurrealComplaintRepository<C>, SurrealUserRepository<C>>;
pub type Dogs<C> = DogService<SurrealDogRecordRepository<C>, SurrealComplaintRepository<C>>;
pub type Reports<C> = ReportService<SurrealComplaintRepository<C>, SurrealUserRepository<C>>;
pub type Locations<C> = LocationDirectory<SurrealLocationRepository<C>>;

/// Services shared by every handler. Cloning is cheap.
pub struct AppState<C: Connection> {
    pub db: Surreal<C>,
    pub auth: Arc<Auth<C>>,
    pub access: Arc<Access<C>>,
    pub complaints: Arc<Complaints<C>>,
    pub dogs: Arc<Dogs<C>>,
    pub reports: Arc<Reports<C>>,
    pub locations: Locations<C>,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            auth: self.auth.clone(),
            access: self.access.clone(),
            complaints: self.complaints.clone(),
            dogs: self.dogs.clone(),
            reports: self.reports.clone(),
            locations: self.locations.clone(),
        }
    }
}

impl<C: Connection> AppState<C> {
    /// Wire every service onto one database handle.
    pub fn new(
        db: Surreal<C>,
        config: AuthConfig,
        notifier: OtpNotifier,
        clock: Arc<dyn Clock>,
        location_ttl: Duration,
    ) -> Self {
        let users = || SurrealUserRepository::new(db.clone()).with_clock(clock.clone());
        let complaints =
            || SurrealComplaintRepository::new(db.clone()).with_clock(clock.clone());

        let auth = AuthService::new(
            users(),
            SurrealOtpRepository::new(db.clone()),
            notifier,
            clock.clone(),
            config.clone(),
        );
        let access = AccessControl::new(users(), clock.clone(), config);

        Self {
            auth: Arc::new(auth),
            access: Arc::new(access),
            complaints: Arc::new(ComplaintService::new(complaints(), users(), clock.clone())),
            dogs: Arc::new(DogService::new(
                SurrealDogRecordRepository::new(db.clone()).with_clock(clock.clone()),
                complaints(),
                clock.clone(),
            )),
            reports: Arc::new(ReportService::new(complaints(), users())),
            locations: LocationDirectory::new(
                SurrealLocationRepository::new(db.clone()),
                clock,
                location_ttl,
            ),
            db,
        }
    }
}
