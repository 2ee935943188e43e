use std::sync::Arc;

use super::moderation::ModerationGateway;
use super::registry::ApplicantRegistry;
use super::repository::ApplicantRepository;
use super::storage::BlobStore;
use super::submission::SubmissionPipeline;
use crate::auth::SessionIssuer;

/// Registry, pipeline, and gateway sharing one repository. Router state for every
/// applicant route.
pub struct OnboardingService<R, B> {
    pub registry: Arc<ApplicantRegistry<R>>,
    pub pipeline: SubmissionPipeline<R, B>,
    pub moderation: ModerationGateway<R>,
    issuer: Arc<SessionIssuer>,
}

impl<R, B> OnboardingService<R, B>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    pub fn new(repository: Arc<R>, blobs: Arc<B>, issuer: Arc<SessionIssuer>) -> Self {
        let registry = Arc::new(ApplicantRegistry::new(repository.clone()));
        Self {
            pipeline: SubmissionPipeline::new(registry.clone(), blobs),
            moderation: ModerationGateway::new(repository),
            registry,
            issuer,
        }
    }

    pub fn issuer(&self) -> Arc<SessionIssuer> {
        self.issuer.clone()
    }
}
