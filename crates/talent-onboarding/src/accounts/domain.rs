use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::UserId;

/// Identifier wrapper for administrator accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(pub String);

/// Applicant-side account. Rows exist from the first OTP request; the password hash is only
/// present once registration completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub email_verified: bool,
    pub verification_code: Option<String>,
    pub verification_expiry: Option<DateTime<Utc>>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn is_registered(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            phone_number: self.phone_number.clone().unwrap_or_default(),
            position: self.position.clone(),
            created_at: self.created_at,
        }
    }
}

/// Public projection of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub username: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Moderator account seeded through the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminAccount {
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role.clone(),
            is_active: self.is_active,
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminProfile {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Final registration payload submitted after the e-mail has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistrationDetails {
    pub email: String,
    #[serde(alias = "fullname")]
    pub full_name: String,
    pub username: String,
    pub phone_number: String,
    pub password: String,
    #[serde(default)]
    pub position: Option<String>,
}

/// Completed registration as persisted, with the password already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRegistration {
    pub email: String,
    pub full_name: String,
    pub username: String,
    pub phone_number: String,
    pub password_hash: String,
    pub position: Option<String>,
}

/// Seed data for a new administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// Public enquiry relayed to the operations inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default, rename = "eventType")]
    pub event_type: Option<String>,
    #[serde(default, rename = "eventDate")]
    pub event_date: Option<String>,
    pub message: String,
}
