use std::sync::Arc;

use tracing::info;

use super::domain::{ApplicantId, ApplicantKind, ApplicantRecord, ProfileInput, RegistrationStep};
use super::repository::{ApplicantRepository, RepositoryError};
use crate::auth::{ensure_can_mutate, Principal, UserId};
use crate::error::ServiceError;

pub(crate) fn username_conflict(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::Conflict(_) => ServiceError::conflict("Username is already taken"),
        other => other.into(),
    }
}

pub(crate) fn session_user(
    principal: &Principal,
    kind: ApplicantKind,
) -> Result<UserId, ServiceError> {
    principal.user_id().ok_or_else(|| {
        ServiceError::forbidden(format!(
            "Only applicant accounts can manage a {} profile",
            kind.label()
        ))
    })
}

/// Owns the applicant entity and its step counter.
pub struct ApplicantRegistry<R> {
    repository: Arc<R>,
}

impl<R> ApplicantRegistry<R>
where
    R: ApplicantRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Step 1. The profile e-mail is taken from the session.
    pub async fn create(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        input: ProfileInput,
    ) -> Result<ApplicantRecord, ServiceError> {
        let owner = session_user(principal, kind)?;
        let email = principal
            .email
            .as_deref()
            .ok_or_else(|| ServiceError::unauthenticated("Session carries no email"))?;

        let profile = input.into_profile(kind, email)?;
        let record = ApplicantRecord::new(kind, owner, profile);
        let record = self
            .repository
            .insert(record)
            .await
            .map_err(username_conflict)?;

        info!(
            applicant_id = %record.id,
            kind = kind.label(),
            owner = %owner,
            "applicant created"
        );
        Ok(record)
    }

    /// Resolve an applicant for a mutation: missing, tombstoned, or other-kind rows are
    /// `NotFound` before ownership is considered.
    pub async fn load_for_mutation(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<ApplicantRecord, ServiceError> {
        let record = self
            .repository
            .fetch(id)
            .await?
            .filter(|record| record.kind == kind && !record.deleted)
            .ok_or_else(|| kind.not_found())?;

        ensure_can_mutate(principal, record.owner, kind.label())?;
        Ok(record)
    }

    /// Raise the step once the sub-entity for `target` is stored.
    pub async fn advance_step(
        &self,
        record: &ApplicantRecord,
        target: RegistrationStep,
        mark_under_review: bool,
    ) -> Result<ApplicantRecord, ServiceError> {
        let updated = self
            .repository
            .advance_step(&record.id, target, mark_under_review)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => record.kind.not_found(),
                other => other.into(),
            })?;

        info!(
            applicant_id = %updated.id,
            kind = updated.kind.label(),
            from = record.step.value(),
            to = updated.step.value(),
            status = updated.status.label(),
            "registration step recorded"
        );
        Ok(updated)
    }

    /// Latest non-deleted applicant of `kind` owned by the session user.
    pub async fn progress(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
    ) -> Result<ApplicantRecord, ServiceError> {
        let owner = session_user(principal, kind)?;
        self.repository
            .latest_for_owner(kind, owner)
            .await?
            .ok_or_else(|| kind.not_found())
    }

    pub async fn soft_delete(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<(), ServiceError> {
        let record = self.load_for_mutation(principal, kind, id).await?;
        self.repository.soft_delete(&record.id).await?;
        info!(
            applicant_id = %record.id,
            kind = kind.label(),
            by = %principal.subject,
            "applicant deleted"
        );
        Ok(())
    }

    /// Merge-patch of the profile. Blank fields keep the stored value.
    pub async fn update(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
        input: ProfileInput,
    ) -> Result<ApplicantRecord, ServiceError> {
        let record = self.load_for_mutation(principal, kind, id).await?;
        let patch = input.into_patch(kind, principal.is_admin())?;

        self.repository
            .patch_profile(&record.id, &patch)
            .await
            .map_err(username_conflict)?;

        self.repository
            .fetch(&record.id)
            .await?
            .ok_or_else(|| kind.not_found())
    }
}
