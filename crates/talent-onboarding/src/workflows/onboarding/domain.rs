use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::policy::{KindPolicy, HOSTESS_POLICY, MODEL_POLICY};
use super::storage::BlobRef;
use crate::auth::UserId;
use crate::error::ServiceError;

/// The two applicant populations. Both share one pipeline; differences live in `KindPolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantKind {
    Model,
    Hostess,
}

impl ApplicantKind {
    pub const ALL: [ApplicantKind; 2] = [ApplicantKind::Model, ApplicantKind::Hostess];

    /// Value persisted in the `kind` column.
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantKind::Model => "model",
            ApplicantKind::Hostess => "hostess",
        }
    }

    /// Route segment and collection key in list payloads.
    pub const fn collection(self) -> &'static str {
        match self {
            ApplicantKind::Model => "models",
            ApplicantKind::Hostess => "hostesses",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            ApplicantKind::Model => "Model",
            ApplicantKind::Hostess => "Hostess",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "model" => Some(ApplicantKind::Model),
            "hostess" => Some(ApplicantKind::Hostess),
            _ => None,
        }
    }

    pub fn policy(self) -> &'static KindPolicy {
        match self {
            ApplicantKind::Model => &MODEL_POLICY,
            ApplicantKind::Hostess => &HOSTESS_POLICY,
        }
    }

    pub(crate) fn not_found(self) -> ServiceError {
        ServiceError::not_found(format!("{} not found", self.title()))
    }
}

/// Identifier wrapper for applicants (UUID v4 text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub String);

impl ApplicantId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position in the four-step registration. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RegistrationStep(u8);

impl RegistrationStep {
    pub const PROFILE: Self = Self(1);
    pub const MEASUREMENTS: Self = Self(2);
    pub const DOCUMENTS: Self = Self(3);
    pub const IDENTITY_CHECK: Self = Self(4);

    pub fn new(value: i64) -> Option<Self> {
        (1..=4).contains(&value).then(|| Self(value as u8))
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn previous(self) -> Option<Self> {
        Self::new(i64::from(self.0) - 1)
    }
}

/// Moderation status. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantStatus::Pending => "pending",
            ApplicantStatus::UnderReview => "under_review",
            ApplicantStatus::Approved => "approved",
            ApplicantStatus::Rejected => "rejected",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ApplicantStatus::Pending),
            "under_review" => Some(ApplicantStatus::UnderReview),
            "approved" => Some(ApplicantStatus::Approved),
            "rejected" => Some(ApplicantStatus::Rejected),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicantStatus::Approved | ApplicantStatus::Rejected)
    }

    /// Apply a moderation decision. Terminal states refuse every further decision.
    pub fn decide(self, decision: Decision) -> Result<Self, TerminalStatus> {
        if self.is_terminal() {
            return Err(TerminalStatus(self));
        }
        Ok(decision.target())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("already {}", .0.label())]
pub struct TerminalStatus(pub ApplicantStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "approve" => Some(Decision::Approve),
            "reject" => Some(Decision::Reject),
            _ => None,
        }
    }

    pub const fn target(self) -> ApplicantStatus {
        match self {
            Decision::Approve => ApplicantStatus::Approved,
            Decision::Reject => ApplicantStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "other" => Ok(Gender::Other),
            _ => Err(ServiceError::validation(
                "gender must be one of Female, Male, Other",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    NationalIdCard,
    Passport,
    DriversLicense,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::NationalIdCard => "National ID Card",
            DocumentType::Passport => "Passport",
            DocumentType::DriversLicense => "Driver's License",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        let normalized = value.trim().to_ascii_lowercase().replace('\u{2019}', "'");
        match normalized.as_str() {
            "national id card" | "national_id_card" => Ok(DocumentType::NationalIdCard),
            "passport" => Ok(DocumentType::Passport),
            "driver's license" | "drivers license" | "drivers_license" => {
                Ok(DocumentType::DriversLicense)
            }
            _ => Err(ServiceError::validation(
                "documentType must be one of National ID Card, Passport, Driver's License",
            )),
        }
    }
}

/// Optional hostess emergency contact; every part may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
}

impl EmergencyContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.relationship.is_none() && self.phone.is_none()
    }
}

/// Validated personal information captured at step 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantProfile {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub whatsapp: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub nationality: String,
    pub street: String,
    pub city: String,
    pub residence_country: String,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Raw step-1 and update payload. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub residence_country: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_relationship: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
}

pub(crate) fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn require(value: &Option<String>, field: &str) -> Result<String, ServiceError> {
    present(value).ok_or_else(|| ServiceError::validation(format!("{field} is required")))
}

pub fn parse_date_of_birth(value: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::validation("Invalid date format, expected YYYY-MM-DD"))
}

impl ProfileInput {
    fn emergency_contact(&self) -> Option<EmergencyContact> {
        let contact = EmergencyContact {
            name: present(&self.emergency_contact_name),
            relationship: present(&self.emergency_contact_relationship),
            phone: present(&self.emergency_contact_phone),
        };
        (!contact.is_empty()).then_some(contact)
    }

    /// Build a complete profile. The e-mail always comes from the session, never the body.
    pub fn into_profile(
        self,
        kind: ApplicantKind,
        session_email: &str,
    ) -> Result<ApplicantProfile, ServiceError> {
        let date_of_birth = parse_date_of_birth(&require(&self.date_of_birth, "date_of_birth")?)?;
        let gender = Gender::parse(&require(&self.gender, "gender")?)?;
        let emergency_contact = if kind.policy().emergency_contact {
            self.emergency_contact()
        } else {
            None
        };

        Ok(ApplicantProfile {
            first_name: require(&self.first_name, "first_name")?,
            last_name: require(&self.last_name, "last_name")?,
            username: require(&self.username, "username")?,
            email: session_email.to_string(),
            whatsapp: require(&self.whatsapp, "whatsapp")?,
            date_of_birth,
            gender,
            nationality: require(&self.nationality, "nationality")?,
            street: require(&self.street, "street")?,
            city: require(&self.city, "city")?,
            residence_country: require(&self.residence_country, "residence_country")?,
            emergency_contact,
        })
    }

    /// Merge-patch view of the payload. `allow_email` is only granted to admins.
    pub fn into_patch(
        self,
        kind: ApplicantKind,
        allow_email: bool,
    ) -> Result<ProfilePatch, ServiceError> {
        let date_of_birth = present(&self.date_of_birth)
            .map(|value| parse_date_of_birth(&value))
            .transpose()?;
        let gender = present(&self.gender)
            .map(|value| Gender::parse(&value))
            .transpose()?;
        let emergency_contact = if kind.policy().emergency_contact {
            self.emergency_contact()
        } else {
            None
        };

        Ok(ProfilePatch {
            first_name: present(&self.first_name),
            last_name: present(&self.last_name),
            username: present(&self.username),
            email: if allow_email {
                present(&self.email)
            } else {
                None
            },
            whatsapp: present(&self.whatsapp),
            date_of_birth,
            gender,
            nationality: present(&self.nationality),
            street: present(&self.street),
            city: present(&self.city),
            residence_country: present(&self.residence_country),
            emergency_contact: emergency_contact.unwrap_or_default(),
        })
    }
}

/// Column-level patch; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub residence_country: Option<String>,
    pub emergency_contact: EmergencyContact,
}

/// Social profile links collected from hostesses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
}

/// Hostess-only experience attributes captured at step 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostessDetails {
    pub languages: Vec<String>,
    pub skills: Vec<String>,
    pub availability: Option<String>,
    pub preferred_events: Vec<String>,
    pub previous_work: Option<String>,
    pub reference_contact: Option<String>,
    pub social: SocialLinks,
}

/// Step-2 sub-entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurements {
    pub experience: String,
    pub height: u16,
    pub weight: u16,
    pub waist: Option<u16>,
    pub hips: Option<u16>,
    pub hair_color: Option<String>,
    pub eye_color: Option<String>,
    pub hostess: Option<HostessDetails>,
    pub photo: Option<BlobRef>,
    pub additional_photos: Vec<BlobRef>,
}

/// Step-3 sub-entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documents {
    pub issuer_country: String,
    pub document_type: DocumentType,
    pub front: BlobRef,
    pub back: BlobRef,
}

/// Step-4 sub-entity. `verified` is owned by an external verification process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCheck {
    pub selfie: BlobRef,
    pub verified: bool,
}

/// Persisted applicant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantRecord {
    pub id: ApplicantId,
    pub kind: ApplicantKind,
    pub owner: UserId,
    pub profile: ApplicantProfile,
    pub step: RegistrationStep,
    pub status: ApplicantStatus,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicantRecord {
    pub fn new(kind: ApplicantKind, owner: UserId, profile: ApplicantProfile) -> Self {
        let now = Utc::now();
        Self {
            id: ApplicantId::generate(),
            kind,
            owner,
            profile,
            step: RegistrationStep::PROFILE,
            status: ApplicantStatus::Pending,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Owning account contact information joined into moderation views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerContact {
    pub fullname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

/// Applicant plus every joined section; sections are absent until their step completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantDetail {
    pub record: ApplicantRecord,
    pub owner_contact: Option<OwnerContact>,
    pub measurements: Option<Measurements>,
    pub documents: Option<Documents>,
    pub identity_check: Option<IdentityCheck>,
}

/// Measurement fields an admin may correct. Photos are not editable here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementsUpdate {
    #[serde(default, alias = "work_experience")]
    pub experience: Option<String>,
    #[serde(default)]
    pub height: Option<u16>,
    #[serde(default)]
    pub weight: Option<u16>,
    #[serde(default)]
    pub waist: Option<u16>,
    #[serde(default)]
    pub hips: Option<u16>,
    #[serde(default)]
    pub hair_color: Option<String>,
    #[serde(default)]
    pub eye_color: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub social_instagram: Option<String>,
    #[serde(default)]
    pub social_facebook: Option<String>,
    #[serde(default)]
    pub social_twitter: Option<String>,
    #[serde(default)]
    pub social_linkedin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsUpdate {
    #[serde(default, alias = "documentIssuerCountry")]
    pub document_issuer_country: Option<String>,
    #[serde(default, alias = "documentType")]
    pub document_type: Option<String>,
}

/// Admin full-update payload spanning the applicant and its step-2/3 sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUpdateInput {
    #[serde(flatten)]
    pub profile: ProfileInput,
    #[serde(default)]
    pub measurements: Option<MeasurementsUpdate>,
    #[serde(default)]
    pub documents: Option<DocumentsUpdate>,
}

/// Validated admin update handed to the repository as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminUpdate {
    pub profile: ProfilePatch,
    pub measurements: Option<MeasurementsUpdate>,
    pub issuer_country: Option<String>,
    pub document_type: Option<DocumentType>,
}

impl AdminUpdateInput {
    pub fn validate(self, kind: ApplicantKind) -> Result<AdminUpdate, ServiceError> {
        let profile = self.profile.into_patch(kind, true)?;
        let (issuer_country, document_type) = match &self.documents {
            Some(documents) => (
                present(&documents.document_issuer_country),
                present(&documents.document_type)
                    .map(|value| DocumentType::parse(&value))
                    .transpose()?,
            ),
            None => (None, None),
        };
        let measurements = self.measurements.map(|update| MeasurementsUpdate {
            experience: present(&update.experience),
            hair_color: present(&update.hair_color),
            eye_color: present(&update.eye_color),
            availability: present(&update.availability),
            social_instagram: present(&update.social_instagram),
            social_facebook: present(&update.social_facebook),
            social_twitter: present(&update.social_twitter),
            social_linkedin: present(&update.social_linkedin),
            ..update
        });

        Ok(AdminUpdate {
            profile,
            measurements,
            issuer_country,
            document_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProfileInput {
        ProfileInput {
            first_name: Some("Ana".to_string()),
            last_name: Some("Popescu".to_string()),
            username: Some("ana.p".to_string()),
            email: Some("spoofed@example.com".to_string()),
            whatsapp: Some("+40712345678".to_string()),
            date_of_birth: Some("1995-07-10".to_string()),
            gender: Some("female".to_string()),
            nationality: Some("Romanian".to_string()),
            street: Some("Strada Lalelelor 4".to_string()),
            city: Some("Cluj".to_string()),
            residence_country: Some("Romania".to_string()),
            emergency_contact_name: Some("Maria".to_string()),
            emergency_contact_relationship: None,
            emergency_contact_phone: Some("  ".to_string()),
        }
    }

    #[test]
    fn steps_stay_within_one_to_four() {
        assert_eq!(
            RegistrationStep::DOCUMENTS.previous(),
            Some(RegistrationStep::MEASUREMENTS)
        );
        assert_eq!(RegistrationStep::PROFILE.previous(), None);
        assert_eq!(RegistrationStep::new(5), None);
    }

    #[test]
    fn terminal_statuses_refuse_decisions() {
        assert_eq!(
            ApplicantStatus::UnderReview.decide(Decision::Reject),
            Ok(ApplicantStatus::Rejected)
        );
        assert_eq!(
            ApplicantStatus::Pending.decide(Decision::Approve),
            Ok(ApplicantStatus::Approved)
        );
        for terminal in [ApplicantStatus::Approved, ApplicantStatus::Rejected] {
            assert_eq!(
                terminal.decide(Decision::Approve),
                Err(TerminalStatus(terminal))
            );
        }
    }

    #[test]
    fn profile_uses_session_email_and_parses_dates() {
        let profile = input()
            .into_profile(ApplicantKind::Model, "ana@example.com")
            .expect("valid profile");
        assert_eq!(profile.email, "ana@example.com");
        assert_eq!(
            profile.date_of_birth,
            NaiveDate::from_ymd_opt(1995, 7, 10).expect("valid date")
        );
        assert_eq!(profile.gender, Gender::Female);
        assert!(profile.emergency_contact.is_none());
    }

    #[test]
    fn hostess_profiles_keep_partial_emergency_contacts() {
        let profile = input()
            .into_profile(ApplicantKind::Hostess, "ana@example.com")
            .expect("valid profile");
        let contact = profile.emergency_contact.expect("contact kept");
        assert_eq!(contact.name.as_deref(), Some("Maria"));
        assert!(contact.phone.is_none());
    }

    #[test]
    fn rejects_impossible_dates_and_missing_fields() {
        let mut bad_date = input();
        bad_date.date_of_birth = Some("1995-02-30".to_string());
        let err = bad_date
            .into_profile(ApplicantKind::Model, "ana@example.com")
            .expect_err("not a calendar date");
        assert!(matches!(err, ServiceError::Validation(_)));

        let mut missing = input();
        missing.city = Some("   ".to_string());
        let err = missing
            .into_profile(ApplicantKind::Model, "ana@example.com")
            .expect_err("city required");
        assert_eq!(err.to_string(), "city is required");
    }

    #[test]
    fn owner_patches_ignore_email_and_blank_fields() {
        let patch = ProfileInput {
            city: Some("Iasi".to_string()),
            street: Some(String::new()),
            email: Some("new@example.com".to_string()),
            ..ProfileInput::default()
        }
        .into_patch(ApplicantKind::Model, false)
        .expect("valid patch");

        assert_eq!(patch.city.as_deref(), Some("Iasi"));
        assert!(patch.street.is_none());
        assert!(patch.email.is_none());
    }

    #[test]
    fn document_types_accept_common_spellings() {
        assert_eq!(
            DocumentType::parse("Driver's License").expect("parse"),
            DocumentType::DriversLicense
        );
        assert_eq!(
            DocumentType::parse("passport").expect("parse"),
            DocumentType::Passport
        );
        assert!(DocumentType::parse("library card").is_err());
    }
}
