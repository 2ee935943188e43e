use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Duration;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::accounts::{
    AccountService, Notification, Notifier, NotifierError, RegistrationDetails,
    SqliteCredentialStore, UserSummary,
};
use crate::auth::SessionIssuer;
use crate::config::AuthConfig;

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        user_secret: "accounts-user-secret".to_string(),
        admin_secret: "accounts-admin-secret".to_string(),
        session_ttl: Duration::hours(24),
        otp_ttl: Duration::minutes(10),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn last_code(&self, email: &str) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            Notification::VerificationCode {
                email: recipient,
                code,
                ..
            } if recipient == email => Some(code),
            _ => None,
        })
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifierError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Delivers verification codes but fails everything else.
#[derive(Default, Clone)]
pub(super) struct CodesOnlyNotifier {
    pub(super) inner: MemoryNotifier,
}

#[async_trait]
impl Notifier for CodesOnlyNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifierError> {
        match notification {
            Notification::VerificationCode { .. } => self.inner.send(notification).await,
            _ => Err(NotifierError::Transport("smtp relay offline".to_string())),
        }
    }
}

pub(super) type MemoryAccounts = AccountService<SqliteCredentialStore, MemoryNotifier>;

pub(super) async fn pool() -> SqlitePool {
    crate::store::memory().await.expect("memory database")
}

pub(super) async fn build_service() -> (MemoryAccounts, MemoryNotifier, SqlitePool) {
    let pool = pool().await;
    let notifier = MemoryNotifier::default();
    let service = AccountService::new(
        Arc::new(SqliteCredentialStore::new(pool.clone())),
        Arc::new(notifier.clone()),
        Arc::new(SessionIssuer::new(&auth_config())),
        auth_config().otp_ttl,
    );
    (service, notifier, pool)
}

pub(super) fn details(email: &str, phone: &str) -> RegistrationDetails {
    RegistrationDetails {
        email: email.to_string(),
        full_name: "Ana Popescu".to_string(),
        username: "ana.p".to_string(),
        phone_number: phone.to_string(),
        password: "s3cure-passw0rd".to_string(),
        position: None,
    }
}

pub(super) async fn register(
    service: &MemoryAccounts,
    notifier: &MemoryNotifier,
    email: &str,
    phone: &str,
) -> UserSummary {
    service.start_registration(email).await.expect("start");
    let code = notifier.last_code(email).expect("code sent");
    service.verify_email(email, &code).await.expect("verify");
    service
        .complete_registration(details(email, phone))
        .await
        .expect("complete")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
