//! Response bodies. Identifier and collection keys follow the applicant kind
//! (`model_id` / `hostess_id`, `models` / `hostesses`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::domain::{
    ApplicantDetail, ApplicantKind, ApplicantRecord, ApplicantStatus, Documents,
    EmergencyContact, HostessDetails, IdentityCheck, Measurements, OwnerContact,
};
use super::repository::ListPage;

/// Single map entry whose key is chosen at runtime; meant for `#[serde(flatten)]`.
#[derive(Debug, Clone)]
pub struct Keyed<T> {
    key: &'static str,
    value: T,
}

impl<T> Keyed<T> {
    pub fn new(key: &'static str, value: T) -> Self {
        Self { key, value }
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, &self.value)?;
        map.end()
    }
}

fn applicant_key(record: &ApplicantRecord) -> Keyed<String> {
    Keyed::new(record.kind.policy().id_field, record.id.0.clone())
}

#[derive(Debug, Serialize)]
pub struct StepView {
    pub message: String,
    #[serde(flatten)]
    pub id: Keyed<String>,
    pub registration_step: u8,
    pub status: ApplicantStatus,
}

impl StepView {
    pub fn new(message: impl Into<String>, record: &ApplicantRecord) -> Self {
        Self {
            message: message.into(),
            id: applicant_key(record),
            registration_step: record.step.value(),
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    #[serde(flatten)]
    pub id: Keyed<String>,
    pub current_step: u8,
    pub status: ApplicantStatus,
}

impl From<&ApplicantRecord> for ProgressView {
    fn from(record: &ApplicantRecord) -> Self {
        Self {
            id: applicant_key(record),
            current_step: record.step.value(),
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub message: String,
    #[serde(flatten)]
    pub id: Keyed<String>,
}

impl MessageView {
    pub fn new(message: impl Into<String>, kind: ApplicantKind, id: &str) -> Self {
        Self {
            message: message.into(),
            id: Keyed::new(kind.policy().id_field, id.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DecisionView {
    pub message: String,
    #[serde(flatten)]
    pub id: Keyed<String>,
    pub new_status: ApplicantStatus,
    pub admin_notes: Option<String>,
}

impl DecisionView {
    pub fn new(record: &ApplicantRecord, admin_notes: Option<String>) -> Self {
        Self {
            message: format!("{} {} successfully", record.kind.title(), record.status.label()),
            id: applicant_key(record),
            new_status: record.status,
            admin_notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub whatsapp: String,
    pub date_of_birth: NaiveDate,
    pub gender: &'static str,
    pub nationality: String,
    pub street: String,
    pub city: String,
    pub residence_country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
}

impl From<&ApplicantRecord> for ProfileView {
    fn from(record: &ApplicantRecord) -> Self {
        let profile = &record.profile;
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            whatsapp: profile.whatsapp.clone(),
            date_of_birth: profile.date_of_birth,
            gender: profile.gender.label(),
            nationality: profile.nationality.clone(),
            street: profile.street.clone(),
            city: profile.city.clone(),
            residence_country: profile.residence_country.clone(),
            emergency_contact: profile.emergency_contact.clone(),
        }
    }
}

/// Owner-facing record after an update.
#[derive(Debug, Serialize)]
pub struct OwnApplicantView {
    #[serde(flatten)]
    pub id: Keyed<String>,
    #[serde(flatten)]
    pub profile: ProfileView,
    pub registration_step: u8,
    pub status: ApplicantStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&ApplicantRecord> for OwnApplicantView {
    fn from(record: &ApplicantRecord) -> Self {
        Self {
            id: applicant_key(record),
            profile: record.into(),
            registration_step: record.step.value(),
            status: record.status,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeasurementsView {
    pub experience: String,
    pub height: u16,
    pub weight: u16,
    pub waist: Option<u16>,
    pub hips: Option<u16>,
    pub hair_color: Option<String>,
    pub eye_color: Option<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub hostess: Option<HostessDetails>,
    pub photo: Option<String>,
    pub additional_photos: Vec<String>,
}

impl From<&Measurements> for MeasurementsView {
    fn from(measurements: &Measurements) -> Self {
        Self {
            experience: measurements.experience.clone(),
            height: measurements.height,
            weight: measurements.weight,
            waist: measurements.waist,
            hips: measurements.hips,
            hair_color: measurements.hair_color.clone(),
            eye_color: measurements.eye_color.clone(),
            hostess: measurements.hostess.clone(),
            photo: measurements.photo.as_ref().map(|blob| blob.url()),
            additional_photos: measurements
                .additional_photos
                .iter()
                .map(|blob| blob.url())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentsView {
    pub document_issuer_country: String,
    pub document_type: &'static str,
    pub document_front: String,
    pub document_back: String,
}

impl From<&Documents> for DocumentsView {
    fn from(documents: &Documents) -> Self {
        Self {
            document_issuer_country: documents.issuer_country.clone(),
            document_type: documents.document_type.label(),
            document_front: documents.front.url(),
            document_back: documents.back.url(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IdentityCheckView {
    pub selfie_with_id: String,
    pub verified: bool,
}

impl From<&IdentityCheck> for IdentityCheckView {
    fn from(check: &IdentityCheck) -> Self {
        Self {
            selfie_with_id: check.selfie.url(),
            verified: check.verified,
        }
    }
}

/// Admin view with every joined section. Sections are null until their step completes.
#[derive(Debug, Serialize)]
pub struct ApplicantView {
    pub id: String,
    pub kind: ApplicantKind,
    #[serde(flatten)]
    pub profile: ProfileView,
    pub registration_step: u8,
    pub status: ApplicantStatus,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_info: Option<OwnerContact>,
    pub measurements: Option<MeasurementsView>,
    pub documents: Option<DocumentsView>,
    pub identity_check: Option<IdentityCheckView>,
}

impl From<&ApplicantDetail> for ApplicantView {
    fn from(detail: &ApplicantDetail) -> Self {
        let record = &detail.record;
        Self {
            id: record.id.0.clone(),
            kind: record.kind,
            profile: record.into(),
            registration_step: record.step.value(),
            status: record.status,
            deleted: record.deleted,
            created_at: record.created_at,
            updated_at: record.updated_at,
            user_info: detail.owner_contact.clone(),
            measurements: detail.measurements.as_ref().map(Into::into),
            documents: detail.documents.as_ref().map(Into::into),
            identity_check: detail.identity_check.as_ref().map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListView {
    #[serde(flatten)]
    pub items: Keyed<Vec<ApplicantView>>,
    pub total_count: u64,
    pub filtered_count: u64,
    pub status_filter: Option<ApplicantStatus>,
    pub page: u32,
    pub limit: u32,
}

impl ListView {
    pub fn new(
        kind: ApplicantKind,
        page: &ListPage,
        status_filter: Option<ApplicantStatus>,
        page_number: u32,
        limit: u32,
    ) -> Self {
        Self {
            items: Keyed::new(
                kind.collection(),
                page.items.iter().map(ApplicantView::from).collect(),
            ),
            total_count: page.total_count,
            filtered_count: page.filtered_count,
            status_filter,
            page: page_number,
            limit,
        }
    }
}

/// Public card for an approved applicant. No documents, selfies, or contact details.
#[derive(Debug, Serialize)]
pub struct GalleryEntry {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub gender: &'static str,
    pub nationality: String,
    pub city: String,
    pub residence_country: String,
    pub measurements: Option<MeasurementsView>,
}

impl From<&ApplicantDetail> for GalleryEntry {
    fn from(detail: &ApplicantDetail) -> Self {
        let profile = &detail.record.profile;
        Self {
            id: detail.record.id.0.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            username: profile.username.clone(),
            gender: profile.gender.label(),
            nationality: profile.nationality.clone(),
            city: profile.city.clone(),
            residence_country: profile.residence_country.clone(),
            measurements: detail.measurements.as_ref().map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GalleryView {
    #[serde(flatten)]
    pub items: Keyed<Vec<GalleryEntry>>,
    pub total_count: u64,
    pub page: u32,
    pub limit: u32,
}

impl GalleryView {
    pub fn new(kind: ApplicantKind, page: &ListPage, page_number: u32, limit: u32) -> Self {
        Self {
            items: Keyed::new(
                kind.collection(),
                page.items.iter().map(GalleryEntry::from).collect(),
            ),
            total_count: page.filtered_count,
            page: page_number,
            limit,
        }
    }
}
