//! Complaint domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::error::{FixMyAreaError, FixMyAreaResult};

/// Complaint lifecycle: `Pending -> In Progress -> Resolved`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComplaintStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "Pending",
            ComplaintStatus::InProgress => "In Progress",
            ComplaintStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ComplaintStatus::Pending),
            "In Progress" => Ok(ComplaintStatus::InProgress),
            "Resolved" => Ok(ComplaintStatus::Resolved),
            other => Err(FixMyAreaError::validation(format!(
                "Invalid complaint status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            other => Err(FixMyAreaError::validation(format!(
                "Invalid priority: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ComplaintLocation {
    #[validate(range(
        min = -90.0,
        max = 90.0,
        message = "Invalid latitude (must be between -90 and 90)"
    ))]
    pub lat: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Invalid longitude (must be between -180 and 180)"
    ))]
    pub lng: f64,
    #[validate(length(max = 200, message = "Address must be less than 200 characters"))]
    pub address: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
}

impl ComplaintLocation {
    /// Parse a location submitted either as a JSON object or as a JSON
    /// string holding one (the multipart form encoding). `lat` and
    /// `lng` may be numbers or numeric strings.
    pub fn from_value(value: &Value) -> FixMyAreaResult<Self> {
        let object = match value {
            Value::String(raw) => serde_json::from_str::<Value>(raw).map_err(|_| {
                FixMyAreaError::validation(
                    "Invalid location format. Please provide valid coordinates.",
                )
            })?,
            other => other.clone(),
        };
        let Value::Object(map) = object else {
            return Err(FixMyAreaError::validation(
                "Invalid location format. Please provide valid coordinates.",
            ));
        };

        let lat = coordinate(map.get("lat"), "lat")?;
        let lng = coordinate(map.get("lng"), "lng")?;
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let location = ComplaintLocation {
            lat,
            lng,
            address: text("address"),
            state: text("state"),
            district: text("district"),
            village: text("village"),
        };
        location.validate()?;
        Ok(location)
    }
}

fn coordinate(value: Option<&Value>, name: &str) -> FixMyAreaResult<f64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| FixMyAreaError::validation(format!("Location {name} must be numeric")))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub resident_id: Uuid,
    pub category: String,
    pub description: String,
    pub images: Vec<String>,
    pub location: ComplaintLocation,
    pub status: ComplaintStatus,
    pub priority: Priority,
    pub assigned_to: Option<Uuid>,
    pub upvotes: u32,
    pub upvoters: Vec<Uuid>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateComplaint {
    pub resident_id: Uuid,
    pub category: String,
    pub description: String,
    pub images: Vec<String>,
    pub location: ComplaintLocation,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// Partial update: `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComplaint {
    pub status: Option<ComplaintStatus>,
    pub assigned_to: Option<Uuid>,
}

impl UpdateComplaint {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none()
    }
}

/// Inclusive creation-time bounds.
#[derive(Debug, Clone, Default)]
pub struct ComplaintFilter {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}
