//! Authentication service — OTP send/verify, registration, login and
//! user administration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fixmyarea_core::clock::Clock;
use fixmyarea_core::error::{FixMyAreaError, FixMyAreaResult};
use fixmyarea_core::models::otp::OtpPurpose;
use fixmyarea_core::models::user::{
    CreateUser, Gender, Identity, Role, UpdateUser, User, UserFilter, UserLocation, UserStatus,
};
use fixmyarea_core::repository::{OtpRepository, UserRepository};
use fixmyarea_core::validation::{
    normalize_phone, validate_not_future, validate_otp_code, validate_password_strength,
    validate_phone,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::config::{AuthConfig, RegistrationTrust};
use crate::dispatch::OtpNotifier;
use crate::error::AuthError;
use crate::otp::OtpLedger;
use crate::password;
use crate::token;

const DUPLICATE_PHONE: &str = "User with this phone number already exists";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[serde(rename = "type", default)]
    pub purpose: OtpPurpose,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpInput {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_otp_code"))]
    pub otp: String,
    #[serde(rename = "type", default)]
    pub purpose: OtpPurpose,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub role: Role,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[validate(nested)]
    pub location: UserLocation,
    pub gender: Option<Gender>,
    #[validate(custom(function = "validate_not_future"))]
    pub dob: Option<DateTime<Utc>>,
    /// Returned by a successful registration OTP verification.
    pub registration_ticket: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub phone: String,
    pub password: Option<String>,
    pub otp: Option<String>,
}

/// Admin-created staff or admin account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffInput {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub role: Role,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    pub gender: Option<Gender>,
    #[validate(custom(function = "validate_not_future"))]
    pub dob: Option<DateTime<Utc>>,
    #[validate(nested)]
    pub location: UserLocation,
    #[serde(default)]
    #[validate(nested)]
    pub areas_assigned: Vec<UserLocation>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    #[validate(nested)]
    pub areas_assigned: Option<Vec<UserLocation>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,
    pub gender: Option<Gender>,
    #[validate(custom(function = "validate_not_future"))]
    pub dob: Option<DateTime<Utc>>,
    #[validate(nested)]
    pub location: Option<UserLocation>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSendOutput {
    pub phone: String,
    pub email: Option<String>,
    pub sms_sent: bool,
    pub email_sent: bool,
    pub expires_in: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerification {
    pub phone: String,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub purpose: OtpPurpose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_ticket: Option<String>,
}

/// A signed session token and the user it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(flatten)]
    pub user: User,
}

fn clean_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U: UserRepository, O: OtpRepository> {
    user_repo: U,
    ledger: OtpLedger<O>,
    notifier: OtpNotifier,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<U: UserRepository, O: OtpRepository> AuthService<U, O> {
    pub fn new(
        user_repo: U,
        otp_repo: O,
        notifier: OtpNotifier,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        let ledger = OtpLedger::new(otp_repo, clock.clone(), &config);
        Self {
            user_repo,
            ledger,
            notifier,
            clock,
            config,
        }
    }

    pub fn ledger(&self) -> &OtpLedger<O> {
        &self.ledger
    }

    // -- OTP ---------------------------------------------------------------

    pub async fn send_registration_otp(
        &self,
        input: SendOtpInput,
    ) -> FixMyAreaResult<OtpSendOutput> {
        let (phone, email) = self.clean_send_input(input.phone, input.email)?;

        if self.user_repo.find_by_phone(&phone).await?.is_some() {
            return Err(FixMyAreaError::AlreadyExists {
                entity: "user".into(),
                message: DUPLICATE_PHONE.into(),
            });
        }

        self.issue_and_dispatch(phone, email, OtpPurpose::Registration)
            .await
    }

    pub async fn send_login_otp(&self, input: SendOtpInput) -> FixMyAreaResult<OtpSendOutput> {
        let (phone, email) = self.clean_send_input(input.phone, input.email)?;

        let Some(user) = self.user_repo.find_by_phone(&phone).await? else {
            return Err(FixMyAreaError::NotRegistered { phone });
        };
        if email.is_some() && email.as_deref() != user.email.as_deref() {
            return Err(FixMyAreaError::validation(
                "Email does not match the registered account",
            ));
        }

        self.issue_and_dispatch(phone, email, OtpPurpose::Login)
            .await
    }

    /// Issue a fresh code without checking whether the phone is
    /// registered.
    pub async fn resend_otp(&self, input: ResendOtpInput) -> FixMyAreaResult<OtpSendOutput> {
        let (phone, email) = self.clean_send_input(input.phone, input.email)?;
        self.issue_and_dispatch(phone, email, input.purpose).await
    }

    /// Consume a code. A registration code also yields a ticket that
    /// `register` accepts as proof of phone ownership.
    pub async fn verify_otp(&self, input: VerifyOtpInput) -> FixMyAreaResult<OtpVerification> {
        let phone = normalize_phone(&input.phone);
        let email = clean_email(input.email);
        let otp = input.otp.trim().to_string();
        let input = VerifyOtpInput {
            phone,
            email,
            otp,
            purpose: input.purpose,
        };
        input.validate()?;

        let record = self
            .ledger
            .verify_otp(&input.phone, input.email.as_deref(), &input.otp, input.purpose)
            .await?;

        let registration_ticket = match input.purpose {
            OtpPurpose::Registration => Some(token::issue_registration_ticket(
                &record.phone,
                self.clock.now(),
                &self.config,
            )?),
            OtpPurpose::Login | OtpPurpose::PasswordReset => None,
        };

        Ok(OtpVerification {
            phone: input.phone,
            email: input.email,
            purpose: input.purpose,
            registration_ticket,
        })
    }

    fn clean_send_input(
        &self,
        phone: String,
        email: Option<String>,
    ) -> FixMyAreaResult<(String, Option<String>)> {
        let input = SendOtpInput {
            phone: normalize_phone(&phone),
            email: clean_email(email),
        };
        input.validate()?;
        Ok((input.phone, input.email))
    }

    async fn issue_and_dispatch(
        &self,
        phone: String,
        email: Option<String>,
        purpose: OtpPurpose,
    ) -> FixMyAreaResult<OtpSendOutput> {
        // 1. Rate limit per identity and purpose.
        if !self
            .ledger
            .check_rate_limit(&phone, email.as_deref(), purpose)
            .await
        {
            return Err(AuthError::RateLimited {
                window_minutes: self.config.otp_rate_limit_window_minutes,
            }
            .into());
        }

        // 2. Store the code (replaces any unused one).
        let issued = self
            .ledger
            .create_otp(&phone, email.as_deref(), purpose)
            .await?;

        // 3. Deliver. Failures are reported, the code stays valid.
        let sms = self
            .notifier
            .send_sms(&phone, &issued.code, purpose)
            .await;
        let email_sent = match &email {
            Some(address) => {
                self.notifier
                    .send_email(address, &issued.code, purpose)
                    .await
                    .success
            }
            None => false,
        };

        Ok(OtpSendOutput {
            phone,
            email,
            sms_sent: sms.success,
            email_sent,
            expires_in: format!("{} minutes", self.ledger.expiry().num_minutes()),
        })
    }

    // -- Sessions ----------------------------------------------------------

    /// Create a resident, staff or admin account and open a session.
    pub async fn register(&self, input: RegisterInput) -> FixMyAreaResult<AuthSession> {
        // 1. Normalize and validate.
        let input = RegisterInput {
            name: input.name.trim().to_string(),
            phone: normalize_phone(&input.phone),
            email: clean_email(input.email),
            ..input
        };
        input.validate()?;
        self.check_password_length(&input.password)?;

        // 2. Proof of phone ownership.
        let now = self.clock.now();
        match (self.config.registration_trust, input.registration_ticket.as_deref()) {
            (_, Some(ticket)) => {
                token::verify_registration_ticket(ticket, &input.phone, now, &self.config)?
            }
            (RegistrationTrust::VerifiedTicket, None) => {
                return Err(AuthError::TicketRequired.into());
            }
            (RegistrationTrust::ClientAttested, None) => {}
        }

        // 3. Phone must be unused.
        if self.user_repo.find_by_phone(&input.phone).await?.is_some() {
            return Err(FixMyAreaError::AlreadyExists {
                entity: "user".into(),
                message: DUPLICATE_PHONE.into(),
            });
        }

        // 4. Hash and persist.
        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let user = self
            .user_repo
            .create(CreateUser {
                role: input.role,
                name: input.name,
                phone: input.phone,
                email: input.email,
                gender: input.gender,
                dob: input.dob,
                location: input.location,
                password_hash,
                areas_assigned: vec![],
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");

        // 5. Issue session token.
        let token = token::issue_session_token(&user, now, &self.config)?;
        Ok(AuthSession { token, user })
    }

    /// Password first; a supplied OTP is tried only if the password is
    /// absent or wrong.
    pub async fn login(&self, input: LoginInput) -> FixMyAreaResult<AuthSession> {
        // 1. Require at least one credential.
        let phone = normalize_phone(&input.phone);
        let password = non_empty(input.password.as_deref());
        let otp = non_empty(input.otp.as_deref());
        if phone.is_empty() || (password.is_none() && otp.is_none()) {
            return Err(AuthError::MissingCredentials.into());
        }

        // 2. Look up user and check status.
        let user = self
            .user_repo
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| FixMyAreaError::NotRegistered {
                phone: phone.clone(),
            })?;
        if !user.is_active() {
            return Err(AuthError::AccountDisabled.into());
        }

        // 3. Password.
        let mut valid = match password {
            Some(pw) => {
                password::verify_password(pw, &user.password_hash, self.config.pepper.as_deref())?
            }
            None => false,
        };

        // 4. OTP. Its rejection reason is returned as-is.
        if !valid {
            if let Some(code) = otp {
                self.ledger
                    .verify_otp(&phone, user.email.as_deref(), code, OtpPurpose::Login)
                    .await?;
                valid = true;
            }
        }

        if !valid {
            info!(user_id = %user.id, "Login rejected: invalid credentials");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 5. Record the login and issue a token.
        let now = self.clock.now();
        let user = self.user_repo.record_login(user.id, now).await?;
        let token = token::issue_session_token(&user, now, &self.config)?;

        info!(user_id = %user.id, login_count = user.login_count, "Login succeeded");
        Ok(AuthSession { token, user })
    }

    /// New token with a fresh lifetime, provided the user is still
    /// active. Earlier tokens stay valid until they expire.
    pub async fn refresh(&self, identity: &Identity) -> FixMyAreaResult<String> {
        let user = self.user_repo.get_by_id(identity.id).await?;
        if !user.is_active() {
            return Err(AuthError::AccountDisabled.into());
        }
        Ok(token::issue_session_token(
            &user,
            self.clock.now(),
            &self.config,
        )?)
    }

    pub async fn current_user(&self, identity: &Identity) -> FixMyAreaResult<User> {
        self.user_repo.get_by_id(identity.id).await
    }

    // -- Administration ----------------------------------------------------

    pub async fn list_users(&self, filter: UserFilter) -> FixMyAreaResult<Vec<User>> {
        self.user_repo.list(filter).await
    }

    pub async fn create_staff(&self, input: CreateStaffInput) -> FixMyAreaResult<User> {
        let input = CreateStaffInput {
            name: input.name.trim().to_string(),
            phone: normalize_phone(&input.phone),
            email: clean_email(input.email),
            ..input
        };
        input.validate()?;
        self.check_password_length(&input.password)?;

        if !input.role.can_be_assigned() {
            return Err(FixMyAreaError::validation(
                "Cannot create a resident through this endpoint",
            ));
        }
        if self.user_repo.find_by_phone(&input.phone).await?.is_some() {
            return Err(FixMyAreaError::AlreadyExists {
                entity: "user".into(),
                message: DUPLICATE_PHONE.into(),
            });
        }

        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let user = self
            .user_repo
            .create(CreateUser {
                role: input.role,
                name: input.name,
                phone: input.phone,
                email: input.email,
                gender: input.gender,
                dob: input.dob,
                location: input.location,
                password_hash,
                areas_assigned: input.areas_assigned,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "Staff account created");
        Ok(user)
    }

    pub async fn update_user(&self, id: Uuid, input: AdminUserUpdate) -> FixMyAreaResult<User> {
        input.validate()?;
        let user = self
            .user_repo
            .update(
                id,
                UpdateUser {
                    role: input.role,
                    status: input.status,
                    areas_assigned: input.areas_assigned,
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = %user.id, status = user.status.as_str(), "User updated");
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        identity: &Identity,
        input: ProfileUpdate,
    ) -> FixMyAreaResult<User> {
        let input = ProfileUpdate {
            name: input.name.map(|n| n.trim().to_string()),
            ..input
        };
        input.validate()?;

        self.user_repo
            .update(
                identity.id,
                UpdateUser {
                    name: input.name,
                    gender: input.gender,
                    dob: input.dob,
                    location: input.location,
                    ..Default::default()
                },
            )
            .await
    }

    fn check_password_length(&self, password: &str) -> FixMyAreaResult<()> {
        if password.chars().count() < self.config.min_password_length {
            return Err(FixMyAreaError::validation(format!(
                "Password must be at least {} characters long",
                self.config.min_password_length
            )));
        }
        Ok(())
    }
}
