//! Applicant and administrator credentials: OTP e-mail registration, login, and the
//! public contact relay.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use domain::{
    AdminAccount, AdminId, AdminProfile, CompletedRegistration, ContactForm, NewAdmin,
    RegistrationDetails, UserAccount, UserSummary,
};
pub use repository::{CredentialStore, Notification, Notifier, NotifierError};
pub use router::account_router;
pub use service::{normalize_email, validate_phone, AccountService, AdminLogin, UserLogin};
pub use sqlite::SqliteCredentialStore;
