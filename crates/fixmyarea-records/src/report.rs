//! Complaint reports: group counts and per-assignee performance.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fixmyarea_core::error::{FixMyAreaError, FixMyAreaResult};
use fixmyarea_core::models::complaint::{Complaint, ComplaintFilter, ComplaintStatus};
use fixmyarea_core::repository::{ComplaintRepository, UserRepository};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field a complaint report is grouped by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportDimension {
    Status,
    Category,
    /// Creation month, `YYYY-MM`.
    Month,
    State,
    District,
    Village,
}

impl ReportDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportDimension::Status => "status",
            ReportDimension::Category => "category",
            ReportDimension::Month => "month",
            ReportDimension::State => "state",
            ReportDimension::District => "district",
            ReportDimension::Village => "village",
        }
    }

    fn key(&self, complaint: &Complaint) -> Option<String> {
        match self {
            ReportDimension::Status => Some(complaint.status.as_str().to_string()),
            ReportDimension::Category => Some(complaint.category.clone()),
            ReportDimension::Month => Some(complaint.created_at.format("%Y-%m").to_string()),
            ReportDimension::State => complaint.location.state.clone(),
            ReportDimension::District => complaint.location.district.clone(),
            ReportDimension::Village => complaint.location.village.clone(),
        }
    }
}

impl fmt::Display for ReportDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportDimension {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(ReportDimension::Status),
            "category" => Ok(ReportDimension::Category),
            "month" => Ok(ReportDimension::Month),
            "state" => Ok(ReportDimension::State),
            "district" => Ok(ReportDimension::District),
            "village" => Ok(ReportDimension::Village),
            other => Err(FixMyAreaError::validation(format!(
                "Invalid groupBy: {other}"
            ))),
        }
    }
}

/// One group of a report. `_id` is null for complaints that lack the
/// grouped field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GroupCount {
    #[serde(rename = "_id")]
    pub key: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaffPerformance {
    pub staff_id: Uuid,
    pub name: String,
    pub resolved_count: u64,
    pub total_count: u64,
}

/// Count complaints per key, ordered by key.
pub fn group_counts(complaints: &[Complaint], dimension: ReportDimension) -> Vec<GroupCount> {
    let mut groups: BTreeMap<Option<String>, u64> = BTreeMap::new();
    for complaint in complaints {
        *groups.entry(dimension.key(complaint)).or_default() += 1;
    }
    groups
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect()
}

/// `(resolved, total)` per assignee. Unassigned complaints are skipped.
pub fn tally_assignees(complaints: &[Complaint]) -> BTreeMap<Uuid, (u64, u64)> {
    let mut tally: BTreeMap<Uuid, (u64, u64)> = BTreeMap::new();
    for complaint in complaints {
        let Some(assignee) = complaint.assigned_to else {
            continue;
        };
        let entry = tally.entry(assignee).or_default();
        if complaint.status == ComplaintStatus::Resolved {
            entry.0 += 1;
        }
        entry.1 += 1;
    }
    tally
}

pub struct ReportService<C: ComplaintRepository, U: UserRepository> {
    complaints: C,
    users: U,
}

impl<C: ComplaintRepository, U: UserRepository> ReportService<C, U> {
    pub fn new(complaints: C, users: U) -> Self {
        Self { complaints, users }
    }

    /// Complaint counts per `dimension`, optionally bounded by creation
    /// time (both ends inclusive).
    pub async fn group_by(
        &self,
        dimension: ReportDimension,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> FixMyAreaResult<Vec<GroupCount>> {
        let complaints = self
            .complaints
            .list(ComplaintFilter {
                created_from: from,
                created_to: to,
            })
            .await?;
        Ok(group_counts(&complaints, dimension))
    }

    /// Resolved and total counts for every assignee that still exists,
    /// ordered by name.
    pub async fn staff_performance(&self) -> FixMyAreaResult<Vec<StaffPerformance>> {
        let complaints = self.complaints.list(ComplaintFilter::default()).await?;

        let mut rows = Vec::new();
        for (staff_id, (resolved_count, total_count)) in tally_assignees(&complaints) {
            match self.users.get_by_id(staff_id).await {
                Ok(user) => rows.push(StaffPerformance {
                    staff_id,
                    name: user.name,
                    resolved_count,
                    total_count,
                }),
                Err(FixMyAreaError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.staff_id.cmp(&b.staff_id)));
        Ok(rows)
    }
}
