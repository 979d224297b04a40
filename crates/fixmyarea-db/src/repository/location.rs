//! SurrealDB implementation of [`LocationRepository`].

use fixmyarea_core::error::FixMyAreaResult;
use fixmyarea_core::models::location::LocationEntry;
use fixmyarea_core::repository::LocationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct LocationRow {
    state: String,
    district: String,
    village: String,
}

/// SurrealDB implementation of the location catalog.
pub struct SurrealLocationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealLocationRepository<C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

impl<C: Connection> SurrealLocationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> LocationRepository for SurrealLocationRepository<C> {
    async fn add(&self, entry: LocationEntry) -> FixMyAreaResult<()> {
        let result = self
            .db
            .query(
                "CREATE location_catalog SET state = $state, \
                 district = $district, village = $village",
            )
            .bind(("state", entry.state))
            .bind(("district", entry.district))
            .bind(("village", entry.village))
            .await
            .map_err(DbError::from)?;

        match result.check() {
            Ok(_) => Ok(()),
            Err(e) => match DbError::from_check(e, "location", "Location already exists") {
                DbError::Duplicate { .. } => Ok(()),
                other => Err(other.into()),
            },
        }
    }

    async fn list(&self) -> FixMyAreaResult<Vec<LocationEntry>> {
        let mut result = self
            .db
            .query(
                "SELECT state, district, village FROM location_catalog \
                 ORDER BY state, district, village",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LocationRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| LocationEntry::new(r.state, r.district, r.village))
            .collect())
    }
}
