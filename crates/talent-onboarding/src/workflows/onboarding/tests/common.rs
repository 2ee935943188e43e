use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::auth::{Principal, PrincipalKind, SessionIssuer, UserId};
use crate::config::AuthConfig;
use crate::workflows::onboarding::{
    ApplicantKind, ApplicantRecord, BlobCategory, BlobRef, BlobStore, FsBlobStore,
    OnboardingService, ProfileInput, SqliteApplicantRepository, StorageError, SubmissionForm,
    UploadedFile,
};

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        user_secret: "onboarding-user-secret".to_string(),
        admin_secret: "onboarding-admin-secret".to_string(),
        session_ttl: Duration::hours(24),
        otp_ttl: Duration::minutes(10),
    }
}

pub(super) type Onboarding = OnboardingService<SqliteApplicantRepository, FsBlobStore>;

pub(super) struct Harness {
    pub(super) service: Arc<Onboarding>,
    pub(super) pool: SqlitePool,
    pub(super) issuer: Arc<SessionIssuer>,
    pub(super) uploads: TempDir,
}

impl Harness {
    pub(super) async fn new() -> Self {
        let pool = crate::store::memory().await.expect("memory database");
        let uploads = tempfile::tempdir().expect("upload dir");
        let issuer = Arc::new(SessionIssuer::new(&auth_config()));
        let service = Arc::new(OnboardingService::new(
            Arc::new(SqliteApplicantRepository::new(pool.clone())),
            Arc::new(FsBlobStore::new(uploads.path())),
            issuer.clone(),
        ));
        Self {
            service,
            pool,
            issuer,
            uploads,
        }
    }

    pub(super) async fn applicant(&self, email: &str) -> Principal {
        user_principal(seed_user(&self.pool, email).await, email)
    }

    pub(super) fn user_token(&self, principal: &Principal) -> String {
        self.issuer
            .issue(PrincipalKind::User, &principal.subject, principal.email.as_deref())
            .expect("user token")
            .token
    }

    pub(super) fn admin_token(&self) -> String {
        self.issuer
            .issue(PrincipalKind::Admin, "admin-1", None)
            .expect("admin token")
            .token
    }

    pub(super) fn stored_files(&self) -> usize {
        count_files(self.uploads.path())
    }

    /// Creates an applicant and submits step 2 so the documents step is open.
    pub(super) async fn at_step_two(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        username: &str,
    ) -> ApplicantRecord {
        let record = self
            .service
            .registry
            .create(principal, kind, profile_input(username))
            .await
            .expect("created");
        self.service
            .pipeline
            .submit_measurements(principal, kind, step_two_form(&record, 5))
            .await
            .expect("step two")
    }
}

pub(super) async fn seed_user(pool: &SqlitePool, email: &str) -> UserId {
    let result = sqlx::query(
        "INSERT INTO users (email, email_verified, full_name, created_at) VALUES (?, 1, ?, ?)",
    )
    .bind(email)
    .bind("Ana Popescu")
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("seed user");
    UserId(result.last_insert_rowid())
}

pub(super) fn user_principal(id: UserId, email: &str) -> Principal {
    Principal {
        kind: PrincipalKind::User,
        subject: id.to_string(),
        email: Some(email.to_string()),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub(super) fn admin_principal() -> Principal {
    Principal {
        kind: PrincipalKind::Admin,
        subject: "admin-1".to_string(),
        email: None,
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub(super) fn profile_input(username: &str) -> ProfileInput {
    ProfileInput {
        first_name: Some("Ana".to_string()),
        last_name: Some("Popescu".to_string()),
        username: Some(username.to_string()),
        email: Some("ignored@example.com".to_string()),
        whatsapp: Some("+40712345678".to_string()),
        date_of_birth: Some("1995-07-10".to_string()),
        gender: Some("Female".to_string()),
        nationality: Some("Romanian".to_string()),
        street: Some("Strada Lalelelor 4".to_string()),
        city: Some("Cluj".to_string()),
        residence_country: Some("Romania".to_string()),
        emergency_contact_name: Some("Maria Popescu".to_string()),
        emergency_contact_relationship: Some("Sister".to_string()),
        emergency_contact_phone: Some("0722000111".to_string()),
    }
}

pub(super) fn image(field: &str, name: &str) -> UploadedFile {
    UploadedFile {
        field: field.to_string(),
        file_name: name.to_string(),
        content_type: Some("image/jpeg".to_string()),
        bytes: Bytes::from_static(b"\xff\xd8\xff\xe0fake-jpeg"),
    }
}

pub(super) fn form(fields: &[(&str, &str)], files: Vec<UploadedFile>) -> SubmissionForm {
    SubmissionForm {
        fields: fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        files,
    }
}

/// Step-2 form for either kind with `photos` gallery images.
pub(super) fn step_two_form(record: &ApplicantRecord, photos: usize) -> SubmissionForm {
    let policy = record.kind.policy();
    let files = (0..photos)
        .map(|index| image(policy.gallery_field, &format!("gallery-{index}.jpg")))
        .collect();
    form(
        &[
            (policy.id_field, record.id.0.as_str()),
            (policy.experience_field, "Two seasons of runway work"),
            ("height", "176"),
            ("weight", "58"),
            ("waist", "61"),
            ("languages", "Romanian, English"),
        ],
        files,
    )
}

pub(super) fn documents_form(record: &ApplicantRecord, with_back: bool) -> SubmissionForm {
    let mut files = vec![image("documentFront", "front.jpg")];
    if with_back {
        files.push(image("documentBack", "back.jpg"));
    }
    form(
        &[
            (record.kind.policy().id_field, record.id.0.as_str()),
            ("documentIssuerCountry", "Romania"),
            ("documentType", "Passport"),
        ],
        files,
    )
}

pub(super) fn selfie_form(record: &ApplicantRecord) -> SubmissionForm {
    form(
        &[(record.kind.policy().id_field, record.id.0.as_str())],
        vec![image("selfie_with_id", "selfie.jpg")],
    )
}

pub(super) fn count_files(root: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

/// Blob store whose disk is always full.
pub(super) struct FullDiskBlobStore;

#[async_trait]
impl BlobStore for FullDiskBlobStore {
    async fn put(
        &self,
        _kind: ApplicantKind,
        _category: BlobCategory,
        file: &UploadedFile,
    ) -> Result<BlobRef, StorageError> {
        Err(StorageError::Write {
            path: file.file_name.clone().into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
        })
    }
}

/// Make every statement matching `event` on `table` abort.
pub(super) async fn break_table(pool: &SqlitePool, table: &str, event: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER break_{table} BEFORE {event} ON {table} \
         BEGIN SELECT RAISE(ABORT, 'storage offline'); END"
    ))
    .execute(pool)
    .await
    .expect("install trigger");
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
