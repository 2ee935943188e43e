use std::sync::Arc;

use tracing::info;

use super::domain::{
    AdminUpdateInput, ApplicantDetail, ApplicantId, ApplicantKind, ApplicantRecord,
    ApplicantStatus, Decision, TerminalStatus,
};
use super::registry::username_conflict;
use super::repository::{ApplicantRepository, ListFilter, ListPage, RepositoryError};
use crate::auth::Principal;
use crate::error::ServiceError;

fn ensure_admin(principal: &Principal) -> Result<(), ServiceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Admin access required"))
    }
}

fn already_decided(kind: ApplicantKind, status: ApplicantStatus) -> ServiceError {
    ServiceError::conflict(format!("{} is already {}", kind.title(), status.label()))
}

/// Admin-side view of the applicant population: listing, decisions, and corrections.
pub struct ModerationGateway<R> {
    repository: Arc<R>,
}

impl<R> ModerationGateway<R>
where
    R: ApplicantRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    async fn record(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<ApplicantRecord, ServiceError> {
        self.repository
            .fetch(id)
            .await?
            .filter(|record| record.kind == kind)
            .ok_or_else(|| kind.not_found())
    }

    pub async fn list(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        filter: &ListFilter,
    ) -> Result<ListPage, ServiceError> {
        ensure_admin(principal)?;
        Ok(self.repository.list(kind, filter).await?)
    }

    /// Direct lookup; tombstoned applicants are returned with `deleted = true`.
    pub async fn get(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<ApplicantDetail, ServiceError> {
        ensure_admin(principal)?;
        self.repository
            .detail(id)
            .await?
            .filter(|detail| detail.record.kind == kind)
            .ok_or_else(|| kind.not_found())
    }

    /// Approved, non-deleted applicants. Open to any authenticated principal.
    pub async fn gallery(
        &self,
        kind: ApplicantKind,
        page: u32,
        limit: u32,
    ) -> Result<ListPage, ServiceError> {
        let filter = ListFilter {
            status: Some(ApplicantStatus::Approved),
            page,
            limit,
            include_deleted: false,
        };
        Ok(self.repository.list(kind, &filter).await?)
    }

    /// Approve or reject. Terminal applicants are never overwritten.
    pub async fn decide(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
        decision: Decision,
        notes: Option<&str>,
    ) -> Result<ApplicantRecord, ServiceError> {
        ensure_admin(principal)?;
        let record = self.record(kind, id).await?;
        if record.deleted {
            return Err(kind.not_found());
        }

        let next = record
            .status
            .decide(decision)
            .map_err(|TerminalStatus(status)| already_decided(kind, status))?;

        if !self.repository.set_status(id, next).await? {
            let current = self.record(kind, id).await?;
            return Err(already_decided(kind, current.status));
        }

        info!(
            applicant_id = %id,
            kind = kind.label(),
            from = record.status.label(),
            to = next.label(),
            admin = %principal.subject,
            notes = notes.unwrap_or_default(),
            "moderation decision recorded"
        );

        self.record(kind, id).await
    }

    /// Full correction across the applicant, measurements, and documents in one transaction.
    /// Status is not part of the payload.
    pub async fn update(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
        input: AdminUpdateInput,
    ) -> Result<ApplicantDetail, ServiceError> {
        ensure_admin(principal)?;
        self.record(kind, id).await?;
        let update = input.validate(kind)?;

        self.repository
            .admin_update(id, &update)
            .await
            .map_err(|err| match err {
                RepositoryError::MissingSection(section) => ServiceError::validation(format!(
                    "{} has no {section} to update",
                    kind.title()
                )),
                other => username_conflict(other),
            })?;

        info!(applicant_id = %id, kind = kind.label(), admin = %principal.subject, "applicant corrected");
        self.get(principal, kind, id).await
    }

    /// Soft delete. Repeating it on a tombstone succeeds without touching the row.
    pub async fn delete(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<(), ServiceError> {
        ensure_admin(principal)?;
        let record = self.record(kind, id).await?;
        if record.deleted {
            return Ok(());
        }

        self.repository.soft_delete(id).await?;
        info!(applicant_id = %id, kind = kind.label(), admin = %principal.subject, "applicant deleted");
        Ok(())
    }
}
