//! Steps 2 to 4 of the registration. Each submission is validated against the kind's
//! policy before any blob is written, then blobs are stored, then the sub-entity row, and
//! only then is the step advanced.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use super::domain::{
    present, ApplicantId, ApplicantKind, ApplicantRecord, DocumentType, Documents, HostessDetails,
    IdentityCheck, Measurements, RegistrationStep, SocialLinks,
};
use super::registry::ApplicantRegistry;
use super::repository::{ApplicantRepository, RepositoryError};
use super::storage::{BlobCategory, BlobRef, BlobStore, UploadedFile};
use crate::auth::Principal;
use crate::error::ServiceError;

/// Text fields and non-empty file parts of a multipart submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    pub fields: BTreeMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl SubmissionForm {
    /// Trimmed text value; blank counts as absent.
    pub fn field(&self, name: &str) -> Option<String> {
        present(&self.fields.get(name).cloned())
    }

    pub fn require(&self, name: &str) -> Result<String, ServiceError> {
        self.field(name)
            .ok_or_else(|| ServiceError::validation(format!("{name} is required")))
    }

    pub fn files_named(&self, name: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|file| file.field == name).collect()
    }

    fn dimension(&self, name: &str) -> Result<Option<u16>, ServiceError> {
        self.field(name)
            .map(|raw| {
                raw.parse::<u16>().map_err(|_| {
                    ServiceError::validation(format!("{name} must be a whole number"))
                })
            })
            .transpose()
    }

    fn required_dimension(&self, name: &str) -> Result<u16, ServiceError> {
        self.dimension(name)?
            .ok_or_else(|| ServiceError::validation(format!("{name} is required")))
    }

    /// Either a JSON array or a comma-separated list.
    fn list(&self, name: &str) -> Result<Vec<String>, ServiceError> {
        let Some(raw) = self.field(name) else {
            return Ok(Vec::new());
        };
        if raw.starts_with('[') {
            let items: Vec<String> = serde_json::from_str(&raw).map_err(|_| {
                ServiceError::validation(format!("{name} must be a list of strings"))
            })?;
            return Ok(items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect());
        }
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn single_file(&self, name: &str, missing: &str) -> Result<&UploadedFile, ServiceError> {
        let files = self.files_named(name);
        match files.as_slice() {
            [] => Err(ServiceError::validation(missing)),
            [file] => Ok(*file),
            _ => Err(ServiceError::validation(format!(
                "Exactly one {name} file is allowed"
            ))),
        }
    }
}

/// Runs the three multipart steps for either applicant kind.
pub struct SubmissionPipeline<R, B> {
    registry: Arc<ApplicantRegistry<R>>,
    blobs: Arc<B>,
}

impl<R, B> SubmissionPipeline<R, B>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    pub fn new(registry: Arc<ApplicantRegistry<R>>, blobs: Arc<B>) -> Self {
        Self { registry, blobs }
    }

    /// Resolve the target applicant and check that the previous step has been reached.
    async fn target(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        form: &SubmissionForm,
        step: RegistrationStep,
    ) -> Result<ApplicantRecord, ServiceError> {
        let id = form.require(kind.policy().id_field)?;
        let record = self
            .registry
            .load_for_mutation(principal, kind, &ApplicantId(id))
            .await?;

        if let Some(previous) = step.previous() {
            if record.step < previous {
                return Err(ServiceError::validation(format!(
                    "Complete step {} before submitting step {}",
                    previous.value(),
                    step.value()
                )));
            }
        }
        Ok(record)
    }

    async fn store(
        &self,
        record: &ApplicantRecord,
        category: BlobCategory,
        files: &[&UploadedFile],
        stored: &mut Vec<BlobRef>,
    ) -> Result<Vec<BlobRef>, ServiceError> {
        let mut refs = Vec::with_capacity(files.len());
        for file in files {
            match self.blobs.put(record.kind, category, file).await {
                Ok(blob) => {
                    stored.push(blob.clone());
                    refs.push(blob);
                }
                Err(err) => {
                    orphaned(record, stored, &err.to_string());
                    return Err(err.into());
                }
            }
        }
        Ok(refs)
    }

    /// Step 2: measurements for models, experience for hostesses.
    pub async fn submit_measurements(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        form: SubmissionForm,
    ) -> Result<ApplicantRecord, ServiceError> {
        let policy = kind.policy();
        let record = self
            .target(principal, kind, &form, RegistrationStep::MEASUREMENTS)
            .await?;

        let experience = form.require(policy.experience_field)?;
        let height = form.required_dimension("height")?;
        let weight = form.required_dimension("weight")?;
        let waist = form.dimension("waist")?;
        let hips = form.dimension("hips")?;

        let primary = match policy.primary_photo_field {
            Some(field) => match form.files_named(field).as_slice() {
                [] => None,
                [file] => Some(*file),
                _ => {
                    return Err(ServiceError::validation(format!(
                        "Exactly one {field} file is allowed"
                    )))
                }
            },
            None => None,
        };
        let gallery = form.files_named(policy.gallery_field);
        policy.check_gallery(gallery.len())?;

        let hostess = if policy.hostess_details {
            Some(HostessDetails {
                languages: form.list("languages")?,
                skills: form.list("skills")?,
                availability: form.field("availability"),
                preferred_events: form.list("preferred_events")?,
                previous_work: form.field("previous_work"),
                reference_contact: form.field("reference_contact"),
                social: SocialLinks {
                    instagram: form.field("social_instagram"),
                    facebook: form.field("social_facebook"),
                    twitter: form.field("social_twitter"),
                    linkedin: form.field("social_linkedin"),
                },
            })
        } else {
            None
        };

        let mut stored = Vec::new();
        let photo = match primary {
            Some(file) => self
                .store(&record, BlobCategory::Measurements, &[file], &mut stored)
                .await?
                .pop(),
            None => None,
        };
        let additional_photos = self
            .store(&record, BlobCategory::Measurements, &gallery, &mut stored)
            .await?;

        let measurements = Measurements {
            experience,
            height,
            weight,
            waist,
            hips,
            hair_color: form.field("hair_color"),
            eye_color: form.field("eye_color"),
            hostess,
            photo,
            additional_photos,
        };

        self.registry
            .repository()
            .save_measurements(&record.id, &measurements)
            .await
            .map_err(|err| persist_failed(&record, &stored, err))?;

        self.registry
            .advance_step(&record, RegistrationStep::MEASUREMENTS, false)
            .await
    }

    /// Step 3: identity document with both sides.
    pub async fn submit_documents(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        form: SubmissionForm,
    ) -> Result<ApplicantRecord, ServiceError> {
        let record = self
            .target(principal, kind, &form, RegistrationStep::DOCUMENTS)
            .await?;

        let issuer_country = form.require("documentIssuerCountry")?;
        let document_type = DocumentType::parse(&form.require("documentType")?)?;
        let front = form.single_file("documentFront", "Front document image is required")?;
        let back = form.single_file("documentBack", "Back document image is required")?;

        let mut stored = Vec::new();
        let mut sides = self
            .store(&record, BlobCategory::Documents, &[front, back], &mut stored)
            .await?
            .into_iter();
        let (Some(front), Some(back)) = (sides.next(), sides.next()) else {
            return Err(ServiceError::infra("document sides were not stored"));
        };

        let documents = Documents {
            issuer_country,
            document_type,
            front,
            back,
        };

        self.registry
            .repository()
            .save_documents(&record.id, &documents)
            .await
            .map_err(|err| persist_failed(&record, &stored, err))?;

        self.registry
            .advance_step(&record, RegistrationStep::DOCUMENTS, false)
            .await
    }

    /// Step 4: selfie holding the document. Success queues the applicant for review.
    pub async fn submit_identity_check(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        form: SubmissionForm,
    ) -> Result<ApplicantRecord, ServiceError> {
        let record = self
            .target(principal, kind, &form, RegistrationStep::IDENTITY_CHECK)
            .await?;

        let selfie = form.single_file("selfie_with_id", "Selfie with ID is required")?;

        let mut stored = Vec::new();
        let Some(selfie) = self
            .store(&record, BlobCategory::IdentityCheck, &[selfie], &mut stored)
            .await?
            .pop()
        else {
            return Err(ServiceError::infra("selfie was not stored"));
        };

        let check = IdentityCheck {
            selfie,
            verified: false,
        };

        self.registry
            .repository()
            .save_identity_check(&record.id, &check)
            .await
            .map_err(|err| persist_failed(&record, &stored, err))?;

        self.registry
            .advance_step(&record, RegistrationStep::IDENTITY_CHECK, true)
            .await
    }
}

fn orphaned(record: &ApplicantRecord, stored: &[BlobRef], error: &str) {
    if stored.is_empty() {
        return;
    }
    let keys: Vec<&str> = stored.iter().map(|blob| blob.0.as_str()).collect();
    warn!(
        applicant_id = %record.id,
        kind = record.kind.label(),
        orphaned = ?keys,
        error,
        "submission failed after blobs were stored"
    );
}

fn persist_failed(
    record: &ApplicantRecord,
    stored: &[BlobRef],
    err: RepositoryError,
) -> ServiceError {
    orphaned(record, stored, &err.to_string());
    match err {
        RepositoryError::NotFound => record.kind.not_found(),
        other => other.into(),
    }
}
