//! Complaint lifecycle: `Pending -> In Progress -> Resolved`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use fixmyarea_core::clock::Clock;
use fixmyarea_core::error::{FixMyAreaError, FixMyAreaResult};
use fixmyarea_core::models::complaint::{
    Comment, Complaint, ComplaintLocation, CreateComplaint, Priority, UpdateComplaint,
};
use fixmyarea_core::models::user::{Identity, Role, UserSummary};
use fixmyarea_core::repository::{ComplaintRepository, UserRepository};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintInput {
    #[validate(length(min = 2, max = 50, message = "Category must be between 2 and 50 characters"))]
    pub category: String,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Description must be between 10 and 1000 characters"
    ))]
    pub description: String,
    /// An object, or the same object encoded as a JSON string.
    #[serde(default)]
    pub location: Value,
    /// URLs of already-uploaded images.
    #[serde(default)]
    pub images: Vec<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentInput {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Comment must be between 1 and 500 characters"
    ))]
    pub text: String,
}

/// A complaint with its resident and assignee resolved to summaries.
#[derive(Debug, Clone, Serialize)]
pub struct ComplaintView {
    #[serde(flatten)]
    pub complaint: Complaint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserSummary>,
}

pub struct ComplaintService<C: ComplaintRepository, U: UserRepository> {
    complaints: C,
    users: U,
    clock: Arc<dyn Clock>,
}

impl<C: ComplaintRepository, U: UserRepository> ComplaintService<C, U> {
    pub fn new(complaints: C, users: U, clock: Arc<dyn Clock>) -> Self {
        Self {
            complaints,
            users,
            clock,
        }
    }

    /// File a new complaint owned by `resident`. Starts `Pending`.
    pub async fn create(
        &self,
        resident: &Identity,
        input: CreateComplaintInput,
    ) -> FixMyAreaResult<Complaint> {
        let input = CreateComplaintInput {
            category: input.category.trim().to_string(),
            description: input.description.trim().to_string(),
            ..input
        };
        input.validate()?;
        let location = ComplaintLocation::from_value(&input.location)?;

        let complaint = self
            .complaints
            .create(CreateComplaint {
                resident_id: resident.id,
                category: input.category,
                description: input.description,
                images: input.images,
                location,
                priority: input.priority.unwrap_or_default(),
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            complaint_id = %complaint.id,
            resident_id = %resident.id,
            category = %complaint.category,
            "Complaint created"
        );
        Ok(complaint)
    }

    /// The resident's complaints, newest first, with assignees populated.
    pub async fn list_mine(&self, resident: &Identity) -> FixMyAreaResult<Vec<ComplaintView>> {
        let complaints = self.complaints.list_by_resident(resident.id).await?;
        let users = self
            .summaries(complaints.iter().filter_map(|c| c.assigned_to))
            .await?;
        Ok(complaints
            .into_iter()
            .map(|c| view(c, &users, Populate::Assignee))
            .collect())
    }

    /// Complaints assigned to `staff`, newest first, with residents
    /// populated.
    pub async fn list_assigned(&self, staff: &Identity) -> FixMyAreaResult<Vec<ComplaintView>> {
        let complaints = self.complaints.list_by_assignee(staff.id).await?;
        let users = self
            .summaries(complaints.iter().map(|c| c.resident_id))
            .await?;
        Ok(complaints
            .into_iter()
            .map(|c| view(c, &users, Populate::Resident))
            .collect())
    }

    /// Residents see only their own complaints; staff and admins see all.
    pub async fn get(&self, viewer: &Identity, id: Uuid) -> FixMyAreaResult<ComplaintView> {
        let complaint = self.complaints.get_by_id(id).await?;
        ensure_visible(viewer, &complaint, "You are not authorized to view this complaint.")?;

        let users = self
            .summaries(std::iter::once(complaint.resident_id).chain(complaint.assigned_to))
            .await?;
        Ok(view(complaint, &users, Populate::Both))
    }

    /// Apply whichever of status and assignee is supplied.
    ///
    /// Staff may only touch complaints currently assigned to them;
    /// admins may touch any. A new assignee must be staff or admin.
    pub async fn update_status(
        &self,
        actor: &Identity,
        id: Uuid,
        input: UpdateComplaint,
    ) -> FixMyAreaResult<Complaint> {
        // 1. Load.
        let complaint = self.complaints.get_by_id(id).await?;

        // 2. Assignment check.
        match actor.role {
            Role::Admin => {}
            Role::Staff if complaint.assigned_to == Some(actor.id) => {}
            Role::Staff | Role::Resident => {
                warn!(
                    complaint_id = %id,
                    user_id = %actor.id,
                    "Complaint update rejected: not the assignee"
                );
                return Err(FixMyAreaError::denied(
                    "You are not authorized to update this complaint.",
                ));
            }
        }

        if input.is_empty() {
            return Ok(complaint);
        }

        // 3. Assignee must be able to work complaints.
        if let Some(assignee_id) = input.assigned_to {
            let assignable = match self.users.get_by_id(assignee_id).await {
                Ok(user) => user.role.can_be_assigned(),
                Err(FixMyAreaError::NotFound { .. }) => false,
                Err(e) => return Err(e),
            };
            if !assignable {
                return Err(FixMyAreaError::validation(
                    "Complaints can only be assigned to an existing staff or admin user",
                ));
            }
        }

        // 4. Persist only the supplied fields.
        let updated = self.complaints.update(id, input).await?;

        info!(
            complaint_id = %id,
            status = %updated.status,
            assigned_to = ?updated.assigned_to,
            user_id = %actor.id,
            "Complaint updated"
        );
        Ok(updated)
    }

    /// Idempotent per user.
    pub async fn upvote(&self, voter: &Identity, id: Uuid) -> FixMyAreaResult<Complaint> {
        self.complaints.add_upvote(id, voter.id).await
    }

    pub async fn add_comment(
        &self,
        author: &Identity,
        id: Uuid,
        input: CommentInput,
    ) -> FixMyAreaResult<Complaint> {
        let input = CommentInput {
            text: input.text.trim().to_string(),
        };
        input.validate()?;

        let complaint = self.complaints.get_by_id(id).await?;
        ensure_visible(
            author,
            &complaint,
            "You are not authorized to comment on this complaint.",
        )?;

        self.complaints
            .add_comment(
                id,
                Comment {
                    author_id: author.id,
                    text: input.text,
                    created_at: self.clock.now(),
                },
            )
            .await
    }

    /// Resolve each distinct id once. Users that no longer exist are
    /// left out.
    async fn summaries(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> FixMyAreaResult<HashMap<Uuid, UserSummary>> {
        let ids: BTreeSet<Uuid> = ids.into_iter().collect();
        let mut out = HashMap::with_capacity(ids.len());
        for id in ids {
            match self.users.get_by_id(id).await {
                Ok(user) => {
                    out.insert(id, user.summary());
                }
                Err(FixMyAreaError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

/// Residents only reach their own complaints. Staff and admins reach all.
fn ensure_visible(
    identity: &Identity,
    complaint: &Complaint,
    message: &str,
) -> FixMyAreaResult<()> {
    match identity.role {
        Role::Resident if complaint.resident_id != identity.id => {
            Err(FixMyAreaError::denied(message))
        }
        Role::Resident | Role::Staff | Role::Admin => Ok(()),
    }
}

/// Which references a view resolves.
#[derive(Clone, Copy)]
enum Populate {
    Resident,
    Assignee,
    Both,
}

fn view(
    complaint: Complaint,
    users: &HashMap<Uuid, UserSummary>,
    populate: Populate,
) -> ComplaintView {
    let resident = match populate {
        Populate::Resident | Populate::Both => users.get(&complaint.resident_id).cloned(),
        Populate::Assignee => None,
    };
    let assignee = match populate {
        Populate::Assignee | Populate::Both => {
            complaint.assigned_to.and_then(|id| users.get(&id).cloned())
        }
        Populate::Resident => None,
    };
    ComplaintView {
        complaint,
        resident,
        assignee,
    }
}
