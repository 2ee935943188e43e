use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{AdminAccount, AdminId, CompletedRegistration, ContactForm, UserAccount};
use crate::auth::UserId;
use crate::error::ServiceError;
use crate::store::RepositoryError;

/// Persistence for applicant-side users and administrators.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str)
        -> Result<Option<UserAccount>, RepositoryError>;
    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, RepositoryError>;
    /// Upsert the pending OTP for `email`, creating the row on first contact.
    async fn stage_verification(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    /// Flag the e-mail as verified and clear the pending code.
    async fn mark_verified(&self, email: &str) -> Result<(), RepositoryError>;
    async fn complete_registration(
        &self,
        registration: CompletedRegistration,
    ) -> Result<UserAccount, RepositoryError>;

    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, RepositoryError>;
    async fn find_admin(&self, id: &AdminId) -> Result<Option<AdminAccount>, RepositoryError>;
    async fn insert_admin(&self, admin: AdminAccount) -> Result<AdminAccount, RepositoryError>;
    async fn touch_admin_login(
        &self,
        id: &AdminId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

/// Outbound messages handed to the e-mail collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    VerificationCode {
        email: String,
        code: String,
        expires_at: DateTime<Utc>,
    },
    Welcome {
        email: String,
        full_name: String,
    },
    Contact(ContactForm),
}

impl Notification {
    pub fn template(&self) -> &'static str {
        match self {
            Notification::VerificationCode { .. } => "verification_code",
            Notification::Welcome { .. } => "welcome",
            Notification::Contact(_) => "contact_form",
        }
    }
}

/// Trait describing the outbound e-mail hook.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifierError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

impl From<NotifierError> for ServiceError {
    fn from(value: NotifierError) -> Self {
        ServiceError::infra(value.to_string())
    }
}
