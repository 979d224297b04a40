//! Access control: turn a bearer token into a request identity and
//! gate operations by role.

use std::sync::Arc;

use fixmyarea_core::clock::Clock;
use fixmyarea_core::error::{FixMyAreaError, FixMyAreaResult};
use fixmyarea_core::models::user::{Identity, Role};
use fixmyarea_core::repository::UserRepository;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token;

pub struct AccessControl<U: UserRepository> {
    user_repo: U,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<U: UserRepository> AccessControl<U> {
    pub fn new(user_repo: U, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            user_repo,
            clock,
            config,
        }
    }

    /// Verify the token, then re-read the user. The stored status wins
    /// over the status claim, so disabling a user revokes their
    /// outstanding tokens.
    pub async fn authenticate(&self, bearer: Option<&str>) -> FixMyAreaResult<Identity> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoToken)?;

        let claims = token::decode_session_token(token, self.clock.now(), &self.config)
            .inspect_err(|e| debug!(error = ?e, "Session token rejected"))?;
        let user_id = claims.user_id()?;

        let user = match self.user_repo.get_by_id(user_id).await {
            Ok(user) => user,
            Err(FixMyAreaError::NotFound { .. }) => return Err(AuthError::UserNotFound.into()),
            Err(e) => return Err(e),
        };

        if !user.is_active() {
            return Err(AuthError::AccountDisabled.into());
        }

        Ok(Identity::from_user(&user))
    }

    /// Allow `identity` if its role is listed. An empty list admits any
    /// authenticated user.
    pub fn authorize(&self, identity: &Identity, allowed: &[Role]) -> FixMyAreaResult<()> {
        authorize(identity, allowed)
    }
}

pub fn authorize(identity: &Identity, allowed: &[Role]) -> FixMyAreaResult<()> {
    if allowed.is_empty() || allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixmyarea_core::models::user::UserStatus;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            role,
            status: UserStatus::Active,
            phone: "9876543210".into(),
        }
    }

    #[test]
    fn empty_role_list_admits_everyone() {
        for role in [Role::Resident, Role::Staff, Role::Admin] {
            assert!(authorize(&identity(role), &[]).is_ok());
        }
    }

    #[test]
    fn role_outside_list_is_forbidden() {
        let err = authorize(&identity(Role::Resident), &[Role::Staff, Role::Admin]).unwrap_err();
        assert!(matches!(err, FixMyAreaError::AuthorizationDenied { .. }));
        assert_eq!(
            err.to_string(),
            "You do not have permission to perform this action"
        );
        assert!(authorize(&identity(Role::Admin), &[Role::Staff, Role::Admin]).is_ok());
    }
}
