use async_trait::async_trait;

use super::domain::{
    AdminUpdate, ApplicantDetail, ApplicantId, ApplicantKind, ApplicantRecord, ApplicantStatus,
    Documents, IdentityCheck, Measurements, ProfilePatch, RegistrationStep,
};
use crate::auth::UserId;
pub use crate::store::RepositoryError;

/// Listing filter. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<ApplicantStatus>,
    pub page: u32,
    pub limit: u32,
    pub include_deleted: bool,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: 10,
            include_deleted: false,
        }
    }
}

impl ListFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of joined applicants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<ApplicantDetail>,
    /// Applicants of the kind, ignoring the status filter.
    pub total_count: u64,
    /// Applicants matching the status filter.
    pub filtered_count: u64,
}

/// Storage abstraction so the registry, pipeline, and gateway can be exercised in isolation.
#[async_trait]
pub trait ApplicantRepository: Send + Sync {
    async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
    /// Direct lookup; tombstoned rows are returned with `deleted = true`.
    async fn fetch(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError>;
    /// Most recently created non-deleted applicant of `kind` owned by `owner`.
    async fn latest_for_owner(
        &self,
        kind: ApplicantKind,
        owner: UserId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError>;

    async fn save_measurements(
        &self,
        id: &ApplicantId,
        measurements: &Measurements,
    ) -> Result<(), RepositoryError>;
    async fn save_documents(
        &self,
        id: &ApplicantId,
        documents: &Documents,
    ) -> Result<(), RepositoryError>;
    async fn save_identity_check(
        &self,
        id: &ApplicantId,
        check: &IdentityCheck,
    ) -> Result<(), RepositoryError>;

    /// Raise the step to `max(current, target)`. With `mark_under_review`, a non-terminal
    /// status moves to `under_review` in the same statement.
    async fn advance_step(
        &self,
        id: &ApplicantId,
        target: RegistrationStep,
        mark_under_review: bool,
    ) -> Result<ApplicantRecord, RepositoryError>;

    async fn patch_profile(
        &self,
        id: &ApplicantId,
        patch: &ProfilePatch,
    ) -> Result<(), RepositoryError>;

    /// Conditional transition: applied only while the stored status is non-terminal.
    /// Returns whether a row changed.
    async fn set_status(
        &self,
        id: &ApplicantId,
        status: ApplicantStatus,
    ) -> Result<bool, RepositoryError>;

    async fn soft_delete(&self, id: &ApplicantId) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        kind: ApplicantKind,
        filter: &ListFilter,
    ) -> Result<ListPage, RepositoryError>;

    async fn detail(&self, id: &ApplicantId) -> Result<Option<ApplicantDetail>, RepositoryError>;

    /// Applicant, measurements, and documents changes commit together or not at all.
    /// A requested section with no stored row fails with `MissingSection`.
    async fn admin_update(
        &self,
        id: &ApplicantId,
        update: &AdminUpdate,
    ) -> Result<(), RepositoryError>;
}
