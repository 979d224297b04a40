//! User domain model, roles and the authenticated identity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::FixMyAreaError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Resident,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Staff and admins may be assigned complaints and dog records.
    pub fn can_be_assigned(&self) -> bool {
        match self {
            Role::Staff | Role::Admin => true,
            Role::Resident => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resident" => Ok(Role::Resident),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(FixMyAreaError::validation(format!("Invalid role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        }
    }
}

impl FromStr for UserStatus {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "disabled" => Ok(UserStatus::Disabled),
            other => Err(FixMyAreaError::validation(format!(
                "Invalid status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = FixMyAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(FixMyAreaError::validation(format!(
                "Invalid gender: {other}"
            ))),
        }
    }
}

/// Administrative location of a user or a staff assignment area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct UserLocation {
    #[validate(length(min = 2, max = 50, message = "State must be between 2 and 50 characters"))]
    pub state: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "District must be between 2 and 50 characters"
    ))]
    pub district: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "Village must be between 2 and 50 characters"
    ))]
    pub village: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<DateTime<Utc>>,
    pub location: UserLocation,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub areas_assigned: Vec<UserLocation>,
    pub status: UserStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub login_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role,
        }
    }
}

/// The subset of a user embedded when a reference is populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub role: Role,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<DateTime<Utc>>,
    pub location: UserLocation,
    /// Already-hashed password.
    pub password_hash: String,
    pub areas_assigned: Vec<UserLocation>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub gender: Option<Gender>,
    pub dob: Option<DateTime<Utc>>,
    pub location: Option<UserLocation>,
    pub areas_assigned: Option<Vec<UserLocation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
}

/// Request-scoped identity populated by access control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub status: UserStatus,
    pub phone: String,
}

impl Identity {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            status: user.status,
            phone: user.phone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Resident, Role::Staff, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn only_staff_and_admin_are_assignable() {
        assert!(!Role::Resident.can_be_assigned());
        assert!(Role::Staff.can_be_assigned());
        assert!(Role::Admin.can_be_assigned());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            role: Role::Resident,
            name: "Asha".into(),
            phone: "9876543210".into(),
            email: None,
            gender: None,
            dob: None,
            location: UserLocation {
                state: "Kerala".into(),
                district: "Ernakulam".into(),
                village: "Kakkanad".into(),
            },
            password_hash: "$argon2id$secret".into(),
            areas_assigned: vec![],
            status: UserStatus::Active,
            last_login: None,
            login_count: 0,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["_id"], user.id.to_string());
        assert_eq!(json["role"], "resident");
    }
}
