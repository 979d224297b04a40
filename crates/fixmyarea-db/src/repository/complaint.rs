//! SurrealDB implementation of [`ComplaintRepository`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fixmyarea_core::clock::{Clock, SystemClock};
use fixmyarea_core::error::FixMyAreaResult;
use fixmyarea_core::models::complaint::{
    Comment, Complaint, ComplaintFilter, CreateComplaint, UpdateComplaint,
};
use fixmyarea_core::repository::ComplaintRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_enum, parse_json, parse_uuid, to_json};

const SELECT_ONE: &str =
    "SELECT meta::id(id) AS record_id, * FROM type::record('complaint', $id)";

#[derive(Debug, SurrealValue)]
struct ComplaintRow {
    record_id: String,
    resident_id: String,
    category: String,
    description: String,
    images: Vec<String>,
    location: serde_json::Value,
    status: String,
    priority: String,
    assigned_to: Option<String>,
    upvotes: u32,
    upvoters: Vec<String>,
    comments: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ComplaintRow {
    fn try_into_complaint(self) -> Result<Complaint, DbError> {
        Ok(Complaint {
            id: parse_uuid(&self.record_id, "complaint")?,
            resident_id: parse_uuid(&self.resident_id, "resident")?,
            category: self.category,
            description: self.description,
            images: self.images,
            location: parse_json(self.location, "complaint location")?,
            status: parse_enum(&self.status)?,
            priority: parse_enum(&self.priority)?,
            assigned_to: self
                .assigned_to
                .as_deref()
                .map(|s| parse_uuid(s, "assignee"))
                .transpose()?,
            upvotes: self.upvotes,
            upvoters: self
                .upvoters
                .iter()
                .map(|s| parse_uuid(s, "upvoter"))
                .collect::<Result<_, _>>()?,
            comments: parse_json(self.comments, "comments")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_complaint(rows: Vec<ComplaintRow>, id: &str) -> Result<Complaint, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "complaint".into(),
            id: id.to_string(),
        })?
        .try_into_complaint()
}

fn all_complaints(rows: Vec<ComplaintRow>) -> Result<Vec<Complaint>, DbError> {
    rows.into_iter()
        .map(ComplaintRow::try_into_complaint)
        .collect()
}

/// SurrealDB implementation of the Complaint repository.
#[derive(Clone)]
pub struct SurrealComplaintRepository<C: Connection> {
    db: Surreal<C>,
    clock: Arc<dyn Clock>,
}

impl<C: Connection> SurrealComplaintRepository<C> {
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

    async fn list_where(&self, field: &str, value: Uuid) -> FixMyAreaResult<Vec<Complaint>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM complaint \
                 WHERE {field} = $value ORDER BY created_at DESC"
            ))
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ComplaintRow> = result.take(0).map_err(DbError::from)?;
        Ok(all_complaints(rows)?)
    }
}

impl<C: Connection> ComplaintRepository for SurrealComplaintRepository<C> {
    async fn create(&self, input: CreateComplaint) -> FixMyAreaResult<Complaint> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(format!(
                "CREATE type::record('complaint', $id) SET \
                 resident_id = $resident_id, category = $category, \
                 description = $description, images = $images, \
                 location = $location, status = 'Pending', \
                 priority = $priority, assigned_to = NONE, \
                 upvotes = 0, upvoters = [], comments = [], \
                 created_at = $created_at, updated_at = $created_at; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("resident_id", input.resident_id.to_string()))
            .bind(("category", input.category))
            .bind(("description", input.description))
            .bind(("images", input.images))
            .bind(("location", to_json(&input.location)?))
            .bind(("priority", input.priority.as_str().to_string()))
            .bind(("created_at", input.created_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ComplaintRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_complaint(rows, &id_str)?)
    }

    async fn get_by_id(&self, id: Uuid) -> FixMyAreaResult<Complaint> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_ONE)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ComplaintRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_complaint(rows, &id_str)?)
    }

    async fn list_by_resident(&self, resident_id: Uuid) -> FixMyAreaResult<Vec<Complaint>> {
        self.list_where("resident_id", resident_id).await
    }

    async fn list_by_assignee(&self, assignee_id: Uuid) -> FixMyAreaResult<Vec<Complaint>> {
        self.list_where("assigned_to", assignee_id).await
    }

    async fn list(&self, filter: ComplaintFilter) -> FixMyAreaResult<Vec<Complaint>> {
        let mut conditions = Vec::new();
        if filter.created_from.is_some() {
            conditions.push("created_at >= $from");
        }
        if filter.created_to.is_some() {
            conditions.push("created_at <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let mut q = self.db.query(format!(
            "SELECT meta::id(id) AS record_id, * FROM complaint{where_clause} \
             ORDER BY created_at DESC"
        ));
        if let Some(from) = filter.created_from {
            q = q.bind(("from", from));
        }
        if let Some(to) = filter.created_to {
            q = q.bind(("to", to));
        }

        let mut result = q.await.map_err(DbError::from)?;
        let rows: Vec<ComplaintRow> = result.take(0).map_err(DbError::from)?;
        Ok(all_complaints(rows)?)
    }

    async fn update(&self, id: Uuid, input: UpdateComplaint) -> FixMyAreaResult<Complaint> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.assigned_to.is_some() {
            sets.push("assigned_to = $assigned_to");
        }
        if sets.is_empty() {
            return self.get_by_id(id).await;
        }
        sets.push("updated_at = $now");

        let mut q = self
            .db
            .query(format!(
                "UPDATE type::record('complaint', $id) SET {}; {SELECT_ONE}",
                sets.join(", ")
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()));
        if let Some(status) = input.status {
            q = q.bind(("status", status.as_str().to_string()));
        }
        if let Some(assignee) = input.assigned_to {
            q = q.bind(("assigned_to", assignee.to_string()));
        }

        let result = q.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ComplaintRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_complaint(rows, &id_str)?)
    }

    async fn add_upvote(&self, id: Uuid, user_id: Uuid) -> FixMyAreaResult<Complaint> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('complaint', $id) SET \
                 upvoters += $user, upvotes += 1, updated_at = $now \
                 WHERE upvoters CONTAINSNOT $user; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("user", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ComplaintRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_complaint(rows, &id_str)?)
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> FixMyAreaResult<Complaint> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "UPDATE type::record('complaint', $id) SET \
                 comments += $comment, updated_at = $now; \
                 {SELECT_ONE}"
            ))
            .bind(("id", id_str.clone()))
            .bind(("now", self.clock.now()))
            .bind(("comment", to_json(&comment)?))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ComplaintRow> = result.take(1).map_err(DbError::from)?;
        Ok(first_complaint(rows, &id_str)?)
    }
}
