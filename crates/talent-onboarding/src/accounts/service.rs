use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    AdminAccount, AdminId, AdminProfile, CompletedRegistration, ContactForm, NewAdmin,
    RegistrationDetails, UserSummary,
};
use super::repository::{CredentialStore, Notification, Notifier};
use crate::auth::{password, Account, Credentials, Principal, Session, SessionIssuer};
use crate::error::ServiceError;
use crate::store::RepositoryError;

const MIN_PASSWORD_LEN: usize = 8;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// Lower-case and validate an e-mail address.
pub fn normalize_email(raw: &str) -> Result<String, ServiceError> {
    let email = raw.trim().to_lowercase();
    if email_pattern().is_match(&email) {
        Ok(email)
    } else {
        Err(ServiceError::validation("Invalid email format"))
    }
}

/// Phone numbers are local mobile numbers: ten characters beginning with `07`.
pub fn validate_phone(raw: &str) -> Result<String, ServiceError> {
    let phone = raw.trim();
    if phone.chars().count() == 10 && phone.starts_with("07") {
        Ok(phone.to_string())
    } else {
        Err(ServiceError::validation(
            "Phone number must be 10 digits and start with 07",
        ))
    }
}

fn required(value: &str, field: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ServiceError::validation(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

fn check_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Confirmation returned when an OTP has been dispatched.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationDispatched {
    pub email: String,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserLogin {
    #[serde(flatten)]
    pub session: Session,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminLogin {
    #[serde(flatten)]
    pub session: Session,
    pub admin: AdminProfile,
}

/// OTP registration, login, and contact relay on top of the credential store.
pub struct AccountService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    issuer: Arc<SessionIssuer>,
    otp_ttl: Duration,
}

impl<S, N> AccountService<S, N>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        issuer: Arc<SessionIssuer>,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            issuer,
            otp_ttl,
        }
    }

    pub fn issuer(&self) -> Arc<SessionIssuer> {
        self.issuer.clone()
    }

    /// Stage a fresh one-time code for `email` and send it.
    pub async fn start_registration(
        &self,
        email: &str,
    ) -> Result<VerificationDispatched, ServiceError> {
        let email = normalize_email(email)?;

        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            if existing.is_registered() {
                return Err(ServiceError::conflict("Email is already registered"));
            }
        }

        let code = generate_code();
        let expires_at = Utc::now() + self.otp_ttl;
        self.store
            .stage_verification(&email, &code, expires_at)
            .await?;

        self.notifier
            .send(Notification::VerificationCode {
                email: email.clone(),
                code,
                expires_at,
            })
            .await?;

        info!(email = %email, "verification code dispatched");
        Ok(VerificationDispatched { email, expires_at })
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), ServiceError> {
        let email = normalize_email(email)?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::validation("Invalid email or verification code"))?;

        if user.is_registered() {
            return Err(ServiceError::conflict("Email is already registered"));
        }

        let (stored, expiry) = match (&user.verification_code, user.verification_expiry) {
            (Some(stored), Some(expiry)) => (stored, expiry),
            _ => return Err(ServiceError::validation("Invalid email or verification code")),
        };
        if stored != code.trim() {
            return Err(ServiceError::validation("Invalid email or verification code"));
        }
        if expiry < Utc::now() {
            return Err(ServiceError::validation("Verification code has expired"));
        }

        self.store.mark_verified(&email).await?;
        info!(user_id = %user.id, "email verified");
        Ok(())
    }

    pub async fn complete_registration(
        &self,
        details: RegistrationDetails,
    ) -> Result<UserSummary, ServiceError> {
        let email = normalize_email(&details.email)?;
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .filter(|user| user.email_verified || user.is_registered())
            .ok_or_else(|| ServiceError::validation("Email has not been verified"))?;
        if user.is_registered() {
            return Err(ServiceError::conflict("Email is already registered"));
        }

        let full_name = required(&details.full_name, "Full name")?;
        let username = required(&details.username, "Username")?;
        let phone_number = validate_phone(&details.phone_number)?;
        check_password(&details.password)?;
        let password_hash = password::hash(details.password)
            .await
            .map_err(|err| ServiceError::infra(err.to_string()))?;

        let account = self
            .store
            .complete_registration(CompletedRegistration {
                email: email.clone(),
                full_name: full_name.clone(),
                username,
                phone_number,
                password_hash,
                position: details
                    .position
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty()),
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => {
                    ServiceError::conflict("Phone number is already registered")
                }
                RepositoryError::NotFound => ServiceError::validation("Email has not been verified"),
                other => other.into(),
            })?;

        if let Err(err) = self
            .notifier
            .send(Notification::Welcome {
                email: email.clone(),
                full_name,
            })
            .await
        {
            warn!(user_id = %account.id, error = %err, "welcome notification failed");
        }

        info!(user_id = %account.id, "registration completed");
        Ok(account.summary())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserLogin, ServiceError> {
        let credentials = Credentials::User {
            email: email.to_string(),
            password: password.to_string(),
        };
        match self
            .issuer
            .authenticate(self.store.as_ref(), credentials)
            .await?
        {
            (session, Account::User(user)) => Ok(UserLogin {
                session,
                user: user.summary(),
            }),
            (_, Account::Admin(_)) => Err(ServiceError::infra("user login resolved an admin")),
        }
    }

    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AdminLogin, ServiceError> {
        let credentials = Credentials::Admin {
            username: username.to_string(),
            password: password.to_string(),
        };
        match self
            .issuer
            .authenticate(self.store.as_ref(), credentials)
            .await?
        {
            (session, Account::Admin(admin)) => {
                info!(admin = %admin.username, "admin logged in");
                Ok(AdminLogin {
                    session,
                    admin: admin.profile(),
                })
            }
            (_, Account::User(_)) => Err(ServiceError::infra("admin login resolved a user")),
        }
    }

    pub async fn account(&self, principal: &Principal) -> Result<UserSummary, ServiceError> {
        let user_id = principal
            .user_id()
            .ok_or_else(|| ServiceError::unauthenticated("user session required"))?;
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        Ok(user.summary())
    }

    pub async fn admin_profile(&self, principal: &Principal) -> Result<AdminProfile, ServiceError> {
        if !principal.is_admin() {
            return Err(ServiceError::forbidden("admin session required"));
        }
        let admin = self
            .store
            .find_admin(&AdminId(principal.subject.clone()))
            .await?
            .ok_or_else(|| ServiceError::not_found("Admin not found"))?;
        Ok(admin.profile())
    }

    /// Seed an administrator. There is no self-service path to this operation.
    pub async fn create_admin(&self, admin: NewAdmin) -> Result<AdminProfile, ServiceError> {
        let username = required(&admin.username, "Username")?;
        let email = normalize_email(&admin.email)?;
        let full_name = required(&admin.full_name, "Full name")?;
        check_password(&admin.password)?;
        let password_hash = password::hash(admin.password)
            .await
            .map_err(|err| ServiceError::infra(err.to_string()))?;

        let stored = self
            .store
            .insert_admin(AdminAccount {
                id: AdminId(Uuid::new_v4().to_string()),
                username,
                email,
                password_hash,
                full_name,
                role: "admin".to_string(),
                is_active: true,
                last_login: None,
                deleted: false,
                created_at: Utc::now(),
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => {
                    ServiceError::conflict("Admin username or email already exists")
                }
                other => other.into(),
            })?;

        info!(admin = %stored.username, "admin account created");
        Ok(stored.profile())
    }

    pub async fn contact(&self, form: ContactForm) -> Result<(), ServiceError> {
        let form = ContactForm {
            name: required(&form.name, "Name")?,
            email: normalize_email(&form.email)?,
            message: required(&form.message, "Message")?,
            ..form
        };

        self.notifier.send(Notification::Contact(form)).await?;
        info!("contact form relayed");
        Ok(())
    }
}
