//! OTP delivery over SMS and email.
//!
//! Delivery is best effort. Failures are reported as a
//! [`DispatchOutcome`] and never undo the stored code.

use std::sync::Arc;

use async_trait::async_trait;
use fixmyarea_core::models::otp::OtpPurpose;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("provider rejected message: {0}")]
    Rejected(String),
    #[error("provider unreachable: {0}")]
    Unreachable(String),
}

/// A rendered message ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Email subject. `None` for SMS.
    pub subject: Option<String>,
    pub body: String,
}

/// A delivery channel (SMS gateway, mail relay, ...).
#[async_trait]
pub trait MessageProvider: Send + Sync {
    /// Deliver `message` to `destination`; returns the provider's
    /// message id.
    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
    ) -> Result<String, DispatchError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProvider;

#[async_trait]
impl MessageProvider for LogProvider {
    async fn send(
        &self,
        destination: &str,
        message: &OutboundMessage,
    ) -> Result<String, DispatchError> {
        let id = Uuid::new_v4().to_string();
        info!(
            destination,
            subject = message.subject.as_deref().unwrap_or(""),
            body = %message.body,
            message_id = %id,
            "Message logged (no delivery provider)"
        );
        Ok(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn sent(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

pub fn sms_message(code: &str, purpose: OtpPurpose, validity_minutes: i64) -> OutboundMessage {
    let what = match purpose {
        OtpPurpose::Registration => "registration",
        OtpPurpose::Login => "login",
        OtpPurpose::PasswordReset => "password reset",
    };
    OutboundMessage {
        subject: None,
        body: format!(
            "Your FixMyArea {what} OTP is: {code}. Valid for {validity_minutes} minutes. \
             Do not share this OTP with anyone."
        ),
    }
}

pub fn email_message(code: &str, purpose: OtpPurpose, validity_minutes: i64) -> OutboundMessage {
    let subject = match purpose {
        OtpPurpose::Registration => "FixMyArea - Registration OTP",
        OtpPurpose::Login => "FixMyArea - Login OTP",
        OtpPurpose::PasswordReset => "FixMyArea - Password Reset OTP",
    };
    OutboundMessage {
        subject: Some(subject.into()),
        body: format!(
            "Your OTP code is: {code}\n\n\
             This code is valid for {validity_minutes} minutes.\n\
             Important: Do not share this OTP with anyone.\n\n\
             If you didn't request this OTP, please ignore this email."
        ),
    }
}

/// Sends codes over whichever channels are configured.
#[derive(Clone, Default)]
pub struct OtpNotifier {
    sms: Option<Arc<dyn MessageProvider>>,
    email: Option<Arc<dyn MessageProvider>>,
    validity_minutes: i64,
}

impl OtpNotifier {
    pub fn new(
        sms: Option<Arc<dyn MessageProvider>>,
        email: Option<Arc<dyn MessageProvider>>,
        validity_minutes: i64,
    ) -> Self {
        Self {
            sms,
            email,
            validity_minutes,
        }
    }

    /// No channels configured; every send reports failure.
    pub fn unconfigured(validity_minutes: i64) -> Self {
        Self::new(None, None, validity_minutes)
    }

    pub async fn send_sms(&self, phone: &str, code: &str, purpose: OtpPurpose) -> DispatchOutcome {
        let Some(provider) = &self.sms else {
            warn!("SMS provider not configured, skipping SMS send");
            return DispatchOutcome::failed("SMS service not configured");
        };
        let message = sms_message(code, purpose, self.validity_minutes);
        deliver(provider.as_ref(), phone, &message, "sms").await
    }

    pub async fn send_email(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> DispatchOutcome {
        let Some(provider) = &self.email else {
            warn!("Email provider not configured, skipping email send");
            return DispatchOutcome::failed("Email service not configured");
        };
        let message = email_message(code, purpose, self.validity_minutes);
        deliver(provider.as_ref(), email, &message, "email").await
    }
}

async fn deliver(
    provider: &dyn MessageProvider,
    destination: &str,
    message: &OutboundMessage,
    channel: &'static str,
) -> DispatchOutcome {
    match provider.send(destination, message).await {
        Ok(id) => {
            info!(channel, message_id = %id, "OTP dispatched");
            DispatchOutcome::sent(id)
        }
        Err(e) => {
            warn!(channel, error = %e, "OTP dispatch failed");
            DispatchOutcome::failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl MessageProvider for FailingProvider {
        async fn send(&self, _: &str, _: &OutboundMessage) -> Result<String, DispatchError> {
            Err(DispatchError::Unreachable("gateway timeout".into()))
        }
    }

    #[test]
    fn sms_template_names_purpose_and_validity() {
        let msg = sms_message("482913", OtpPurpose::Login, 10);
        assert_eq!(
            msg.body,
            "Your FixMyArea login OTP is: 482913. Valid for 10 minutes. \
             Do not share this OTP with anyone."
        );
        assert!(msg.subject.is_none());
    }

    #[test]
    fn email_subject_per_purpose() {
        let msg = email_message("482913", OtpPurpose::PasswordReset, 10);
        assert_eq!(msg.subject.as_deref(), Some("FixMyArea - Password Reset OTP"));
        assert!(msg.body.contains("482913"));
    }

    #[tokio::test]
    async fn unconfigured_channels_report_failure() {
        let notifier = OtpNotifier::unconfigured(10);
        let sms = notifier
            .send_sms("9876543210", "123456", OtpPurpose::Registration)
            .await;
        assert!(!sms.success);
        assert_eq!(sms.error.as_deref(), Some("SMS service not configured"));

        let email = notifier
            .send_email("a@example.com", "123456", OtpPurpose::Registration)
            .await;
        assert!(!email.success);
    }

    #[tokio::test]
    async fn provider_errors_become_outcomes() {
        let notifier = OtpNotifier::new(Some(Arc::new(FailingProvider)), None, 10);
        let outcome = notifier
            .send_sms("9876543210", "123456", OtpPurpose::Login)
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("gateway timeout"));
    }

    #[tokio::test]
    async fn log_provider_succeeds() {
        let notifier = OtpNotifier::new(Some(Arc::new(LogProvider)), Some(Arc::new(LogProvider)), 10);
        assert!(notifier.send_sms("9876543210", "1", OtpPurpose::Login).await.success);
        assert!(
            notifier
                .send_email("a@example.com", "1", OtpPurpose::Login)
                .await
                .success
        );
    }
}
