//! SurrealDB implementation of [`UserRepository`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fixmyarea_core::clock::{Clock, SystemClock};
use fixmyarea_core::error::FixMyAreaResult;
use fixmyarea_core::models::user::{CreateUser, UpdateUser, User, UserFilter};
use fixmyarea_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_enum, parse_json, parse_uuid, to_json};

const SELECT_ONE: &str = "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    role: String,
    name: String,
    phone: String,
    email: Option<String>,
    gender: Option<String>,
    dob: Option<DateTime<Utc>>,
    location: serde_json::Value,
    password_hash: String,
    areas_assigned: serde_json::Value,
    status: String,
    last_login: Option<DateTime<Utc>>,
    login_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            role: parse_enum(&self.role)?,
            name: self.name,
            phone: self.phone,
            email: self.email,
            gender: self.gender.as_deref().map(parse_enum).transpose()?,
            dob: self.dob,
            location: parse_json(self.location, "user location")?,
            password_hash: self.password_hash,
            areas_assigned: parse_json(self.areas_assigned, "assigned areas")?,
            status: parse_enum(&self.status)?,
            last_login: self.last_login,
            login_count: self.login_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_user(rows: Vec<UserRow>, id: &str) -> Result<User, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?
        .try_into_user()
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    clock: Arc<dyn Clock>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
        }
    }

    /// Take write timestamps from `clock` instead of wall-clock time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> FixMyAreaResult<User> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('user', $id) SET \
                 role = $role, name = $name, phone = $phone, \
                 email = $email, gender = $gender, dob = $dob, \
                 location = $location, password_hash = $password_hash, \
                 areas_assigned = $areas_assigned, \
                 status = 'active', login_count = 0, \
                 created_at = $now, updated_at = $now; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("name", input.name))
            .bind(("phone", input.phone))
            .bind(("email", input.email))
            .bind(("gender", input.gender.map(|g| g.as_str().to_string())))
            .bind(("dob", input.dob))
            .bind(("location", to_json(&input.location)?))
            .bind(("password_hash", input.password_hash))
            .bind(("areas_assigned", to_json(&input.areas_assigned)?))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            DbError::from_check(e, "user", "User with this phone number already exists")
        })?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_user(rows, &id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FixMyAreaResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_user(rows, &id_str)?)
    }

    async fn find_by_phone(&self, phone: &str) -> FixMyAreaResult<Option<User>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE phone = $phone LIMIT 1")
            .bind(("phone", phone.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let user = rows
            .into_iter()
            .next()
            .map(UserRow::try_into_user)
            .transpose()?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> FixMyAreaResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.gender.is_some() {
            sets.push("gender = $gender");
        }
        if input.dob.is_some() {
            sets.push("dob = $dob");
        }
        if input.location.is_some() {
            sets.push("location = $location");
        }
        if input.areas_assigned.is_some() {
            sets.push("areas_assigned = $areas_assigned");
        }

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }
        sets.push("updated_at = $now");

        let query = format!(
            "UPDATE type::record('user', $id) SET {}; {SELECT_ONE}",
            sets.join(", ")
        );

        let mut q = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()));

        if let Some(name) = input.name {
            q = q.bind(("name", name));
        }
        if let Some(role) = input.role {
            q = q.bind(("role", role.as_str().to_string()));
        }
        if let Some(status) = input.status {
            q = q.bind(("status", status.as_str().to_string()));
        }
        if let Some(gender) = input.gender {
            q = q.bind(("gender", gender.as_str().to_string()));
        }
        if let Some(dob) = input.dob {
            q = q.bind(("dob", dob));
        }
        if let Some(location) = input.location {
            q = q.bind(("location", to_json(&location)?));
        }
        if let Some(areas) = input.areas_assigned {
            q = q.bind(("areas_assigned", to_json(&areas)?));
        }

        let result = q.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_user(rows, &id_str)?)
    }

    async fn list(&self, filter: UserFilter) -> FixMyAreaResult<Vec<User>> {
        let mut conditions = Vec::new();
        if filter.role.is_some() {
            conditions.push("role = $role");
        }
        if filter.state.is_some() {
            conditions.push("location.state = $state");
        }
        if filter.district.is_some() {
            conditions.push("location.district = $district");
        }
        if filter.village.is_some() {
            conditions.push("location.village = $village");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user{where_clause} \
             ORDER BY created_at DESC"
        );

        let mut q = self.db.query(query);
        if let Some(role) = filter.role {
            q = q.bind(("role", role.as_str().to_string()));
        }
        if let Some(state) = filter.state {
            q = q.bind(("state", state));
        }
        if let Some(district) = filter.district {
            q = q.bind(("district", district));
        }
        if let Some(village) = filter.village {
            q = q.bind(("village", village));
        }

        let mut result = q.await.map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let users = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> FixMyAreaResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('user', $id) SET \
                 last_login = $at, login_count += 1, \
                 updated_at = $at; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_user(rows, &id_str)?)
    }
}

