use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::password::{self, PasswordError};
use crate::accounts::{AdminAccount, CredentialStore, UserAccount};
use crate::config::AuthConfig;
use crate::error::ServiceError;
use crate::store::RepositoryError;

/// Integer identifier of an applicant-side user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two principal families. Their tokens are signed with independent keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    User,
    Admin,
}

/// Authenticated caller extracted from a validated session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub subject: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.kind == PrincipalKind::Admin
    }

    /// Owning user id for user principals; `None` for admins.
    pub fn user_id(&self) -> Option<UserId> {
        match self.kind {
            PrincipalKind::User => self.subject.parse().ok().map(UserId),
            PrincipalKind::Admin => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    kind: PrincipalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iat: i64,
    exp: i64,
}

/// Signed bearer token plus its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Login material for either principal kind.
#[derive(Clone)]
pub enum Credentials {
    User { email: String, password: String },
    Admin { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::User { email, .. } => f
                .debug_struct("User")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Admin { username, .. } => f
                .debug_struct("Admin")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Account resolved by a successful login.
#[derive(Debug, Clone)]
pub enum Account {
    User(UserAccount),
    Admin(AdminAccount),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("session token is malformed")]
    Malformed,
    #[error("session token has expired")]
    Expired,
    #[error("session token signature is invalid")]
    InvalidSignature,
    #[error("session token was issued for a different principal kind")]
    WrongKind,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is inactive")]
    Inactive,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Signing(detail) => ServiceError::infra(detail),
            AuthError::Repository(err) => err.into(),
            AuthError::Password(err) => ServiceError::infra(err.to_string()),
            other => ServiceError::unauthenticated(other.to_string()),
        }
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and validates HS256 session tokens for both principal kinds.
pub struct SessionIssuer {
    user_keys: KeyPair,
    admin_keys: KeyPair,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            user_keys: KeyPair::from_secret(&config.user_secret),
            admin_keys: KeyPair::from_secret(&config.admin_secret),
            ttl: config.session_ttl,
        }
    }

    fn keys(&self, kind: PrincipalKind) -> &KeyPair {
        match kind {
            PrincipalKind::User => &self.user_keys,
            PrincipalKind::Admin => &self.admin_keys,
        }
    }

    pub fn issue(
        &self,
        kind: PrincipalKind,
        subject: &str,
        email: Option<&str>,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            email: email.map(str::to_string),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(kind).encoding,
        )
        .map_err(|err| AuthError::Signing(err.to_string()))?;

        Ok(Session { token, expires_at })
    }

    /// Decode `token` with the key of `expected`. Any defect fails closed.
    pub fn validate(&self, expected: PrincipalKind, token: &str) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys(expected).decoding, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            },
        )?;

        let claims = data.claims;
        if claims.kind != expected {
            return Err(AuthError::WrongKind);
        }

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(AuthError::Malformed)?;

        Ok(Principal {
            kind: claims.kind,
            subject: claims.sub,
            email: claims.email,
            expires_at,
        })
    }

    /// Check credentials against the store and mint a session for the matching account.
    pub async fn authenticate<S>(
        &self,
        store: &S,
        credentials: Credentials,
    ) -> Result<(Session, Account), AuthError>
    where
        S: CredentialStore + ?Sized,
    {
        match credentials {
            Credentials::User { email, password } => {
                let email = email.trim().to_lowercase();
                let user = store
                    .find_user_by_email(&email)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                let hash = user
                    .password_hash
                    .clone()
                    .ok_or(AuthError::InvalidCredentials)?;

                if !password::verify(password, hash).await? {
                    debug!(user_id = %user.id, "user login rejected");
                    return Err(AuthError::InvalidCredentials);
                }

                let session =
                    self.issue(PrincipalKind::User, &user.id.to_string(), Some(&user.email))?;
                Ok((session, Account::User(user)))
            }
            Credentials::Admin { username, password } => {
                let admin = store
                    .find_admin_by_username(username.trim())
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;

                if !password::verify(password, admin.password_hash.clone()).await? {
                    debug!(admin = %admin.username, "admin login rejected");
                    return Err(AuthError::InvalidCredentials);
                }
                if !admin.is_active {
                    warn!(admin = %admin.username, "inactive admin attempted login");
                    return Err(AuthError::Inactive);
                }

                let now = Utc::now();
                store.touch_admin_login(&admin.id, now).await?;
                let session = self.issue(PrincipalKind::Admin, &admin.id.0, None)?;

                let mut admin = admin;
                admin.last_login = Some(now);
                Ok((session, Account::Admin(admin)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: Duration) -> AuthConfig {
        AuthConfig {
            user_secret: "user-secret-for-tests".to_string(),
            admin_secret: "admin-secret-for-tests".to_string(),
            session_ttl: ttl,
            otp_ttl: Duration::minutes(10),
        }
    }

    #[test]
    fn issued_user_tokens_round_trip_into_principals() {
        let issuer = SessionIssuer::new(&config(Duration::hours(24)));
        let session = issuer
            .issue(PrincipalKind::User, "42", Some("ana@example.com"))
            .expect("issue");

        let principal = issuer
            .validate(PrincipalKind::User, &session.token)
            .expect("valid token");
        assert_eq!(principal.user_id(), Some(UserId(42)));
        assert_eq!(principal.email.as_deref(), Some("ana@example.com"));
        assert!(!principal.is_admin());
        assert_eq!(principal.expires_at.timestamp(), session.expires_at.timestamp());
    }

    #[test]
    fn user_and_admin_tokens_are_not_interchangeable() {
        let issuer = SessionIssuer::new(&config(Duration::hours(24)));
        let user = issuer
            .issue(PrincipalKind::User, "7", Some("u@example.com"))
            .expect("issue user");
        let admin = issuer
            .issue(PrincipalKind::Admin, "adm-1", None)
            .expect("issue admin");

        assert!(matches!(
            issuer.validate(PrincipalKind::Admin, &user.token),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            issuer.validate(PrincipalKind::User, &admin.token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_kind_mismatch_even_with_shared_material() {
        let mut shared = config(Duration::hours(1));
        shared.admin_secret = shared.user_secret.clone();
        let issuer = SessionIssuer::new(&shared);
        let admin = issuer
            .issue(PrincipalKind::Admin, "adm-1", None)
            .expect("issue admin");

        assert!(matches!(
            issuer.validate(PrincipalKind::User, &admin.token),
            Err(AuthError::WrongKind)
        ));
    }

    #[test]
    fn expired_and_garbage_tokens_fail_closed() {
        let issuer = SessionIssuer::new(&config(Duration::seconds(-30)));
        let stale = issuer
            .issue(PrincipalKind::User, "1", None)
            .expect("issue");

        assert!(matches!(
            issuer.validate(PrincipalKind::User, &stale.token),
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            issuer.validate(PrincipalKind::User, "not-a-jwt"),
            Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn auth_failures_map_to_unauthenticated() {
        let err: ServiceError = AuthError::Expired.into();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
        let err: ServiceError = AuthError::Signing("boom".to_string()).into();
        assert!(matches!(err, ServiceError::Infra(_)));
    }
}
