//! Model and hostess onboarding: the four-step registration pipeline, the step/status
//! state machine, and the admin moderation queue.

pub mod domain;
pub mod moderation;
pub mod policy;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod storage;
pub mod submission;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    AdminUpdate, AdminUpdateInput, ApplicantDetail, ApplicantId, ApplicantKind, ApplicantProfile,
    ApplicantRecord, ApplicantStatus, Decision, DocumentType, Documents, DocumentsUpdate,
    EmergencyContact, Gender, HostessDetails, IdentityCheck, Measurements, MeasurementsUpdate,
    OwnerContact, ProfileInput, ProfilePatch, RegistrationStep, TerminalStatus,
};
pub use moderation::ModerationGateway;
pub use policy::{KindPolicy, HOSTESS_POLICY, MODEL_POLICY};
pub use registry::ApplicantRegistry;
pub use repository::{ApplicantRepository, ListFilter, ListPage, RepositoryError};
pub use router::onboarding_router;
pub use service::OnboardingService;
pub use sqlite::SqliteApplicantRepository;
pub use storage::{BlobCategory, BlobRef, BlobStore, FsBlobStore, StorageError, UploadedFile};
pub use submission::{SubmissionForm, SubmissionPipeline};
