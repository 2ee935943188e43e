use super::domain::ApplicantKind;
use crate::error::ServiceError;

/// Per-kind attribute policy: form field names and photo bounds for step 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindPolicy {
    pub kind: ApplicantKind,
    /// Form and payload key carrying the applicant id.
    pub id_field: &'static str,
    /// Route segment for the step-2 submission.
    pub step_two_segment: &'static str,
    pub experience_field: &'static str,
    /// Single primary photo field, when the kind has one.
    pub primary_photo_field: Option<&'static str>,
    pub gallery_field: &'static str,
    pub min_gallery: usize,
    pub max_gallery: Option<usize>,
    /// Hostess-only extras: emergency contact, languages, skills, socials.
    pub emergency_contact: bool,
    pub hostess_details: bool,
}

pub static MODEL_POLICY: KindPolicy = KindPolicy {
    kind: ApplicantKind::Model,
    id_field: "model_id",
    step_two_segment: "measurements",
    experience_field: "experience",
    primary_photo_field: Some("photo"),
    gallery_field: "additionalPhotos",
    min_gallery: 0,
    max_gallery: Some(5),
    emergency_contact: false,
    hostess_details: false,
};

pub static HOSTESS_POLICY: KindPolicy = KindPolicy {
    kind: ApplicantKind::Hostess,
    id_field: "hostess_id",
    step_two_segment: "experience",
    experience_field: "work_experience",
    primary_photo_field: None,
    gallery_field: "photo",
    min_gallery: 5,
    max_gallery: None,
    emergency_contact: true,
    hostess_details: true,
};

impl KindPolicy {
    pub fn check_gallery(&self, count: usize) -> Result<(), ServiceError> {
        if count < self.min_gallery {
            return Err(ServiceError::validation(format!(
                "At least {} {} files are required",
                self.min_gallery, self.gallery_field
            )));
        }
        if let Some(max) = self.max_gallery {
            if count > max {
                return Err(ServiceError::validation(format!(
                    "At most {max} {} files are allowed",
                    self.gallery_field
                )));
            }
        }
        Ok(())
    }
}
