use async_trait::async_trait;
use chrono::Utc;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::domain::{
    AdminUpdate, ApplicantDetail, ApplicantId, ApplicantKind, ApplicantProfile, ApplicantRecord,
    ApplicantStatus, DocumentType, Documents, EmergencyContact, Gender, HostessDetails,
    IdentityCheck, Measurements, OwnerContact, ProfilePatch, RegistrationStep, SocialLinks,
};
use super::repository::{ApplicantRepository, ListFilter, ListPage, RepositoryError};
use super::storage::BlobRef;
use crate::auth::UserId;

const APPLICANT_COLUMNS: &str = "a.id, a.kind, a.user_id, a.first_name, a.last_name, \
    a.username, a.email, a.whatsapp, a.date_of_birth, a.gender, a.nationality, a.street, \
    a.city, a.residence_country, a.emergency_contact_name, a.emergency_contact_relationship, \
    a.emergency_contact_phone, a.registration_step, a.status, a.deleted, a.created_at, \
    a.updated_at";

const DETAIL_JOINS: &str = "\
    u.full_name AS owner_full_name, u.email AS owner_email, u.phone_number AS owner_phone, \
    m.experience AS m_experience, m.height AS m_height, m.weight AS m_weight, \
    m.waist AS m_waist, m.hips AS m_hips, m.hair_color AS m_hair_color, \
    m.eye_color AS m_eye_color, m.languages AS m_languages, m.skills AS m_skills, \
    m.availability AS m_availability, m.preferred_events AS m_preferred_events, \
    m.previous_work AS m_previous_work, m.reference_contact AS m_reference_contact, \
    m.social_instagram AS m_social_instagram, m.social_facebook AS m_social_facebook, \
    m.social_twitter AS m_social_twitter, m.social_linkedin AS m_social_linkedin, \
    m.photo AS m_photo, m.additional_photos AS m_additional_photos, \
    d.issuer_country AS d_issuer_country, d.document_type AS d_document_type, \
    d.document_front AS d_front, d.document_back AS d_back, \
    i.selfie_with_id AS i_selfie, i.verified AS i_verified \
    FROM applicants a \
    LEFT JOIN users u ON u.id = a.user_id \
    LEFT JOIN applicant_measurements m ON m.applicant_id = a.id \
    LEFT JOIN applicant_documents d ON d.applicant_id = a.id \
    LEFT JOIN applicant_identity_checks i ON i.applicant_id = a.id";

const NON_TERMINAL: &str = "('pending', 'under_review')";

/// `ApplicantRepository` over the shared SQLite pool.
#[derive(Clone)]
pub struct SqliteApplicantRepository {
    pool: SqlitePool,
}

impl SqliteApplicantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn corrupt(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn json_list(raw: Option<String>) -> Result<Vec<String>, sqlx::Error> {
    match raw {
        Some(raw) => serde_json::from_str(&raw).map_err(|err| corrupt(err.to_string())),
        None => Ok(Vec::new()),
    }
}

fn to_json(values: &[String]) -> String {
    serde_json::Value::from(values.to_vec()).to_string()
}

fn dimension(row: &SqliteRow, column: &str) -> Result<Option<u16>, sqlx::Error> {
    let value: Option<i64> = row.try_get(column)?;
    value
        .map(|value| u16::try_from(value).map_err(|_| corrupt(format!("{column} out of range"))))
        .transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<ApplicantRecord, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let kind = ApplicantKind::from_label(&kind).ok_or_else(|| corrupt(format!("kind {kind}")))?;
    let gender: String = row.try_get("gender")?;
    let gender = Gender::parse(&gender).map_err(|err| corrupt(err.to_string()))?;
    let step: i64 = row.try_get("registration_step")?;
    let step = RegistrationStep::new(step).ok_or_else(|| corrupt(format!("step {step}")))?;
    let status: String = row.try_get("status")?;
    let status =
        ApplicantStatus::from_label(&status).ok_or_else(|| corrupt(format!("status {status}")))?;

    let emergency_contact = EmergencyContact {
        name: row.try_get("emergency_contact_name")?,
        relationship: row.try_get("emergency_contact_relationship")?,
        phone: row.try_get("emergency_contact_phone")?,
    };

    Ok(ApplicantRecord {
        id: ApplicantId(row.try_get("id")?),
        kind,
        owner: UserId(row.try_get("user_id")?),
        profile: ApplicantProfile {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            whatsapp: row.try_get("whatsapp")?,
            date_of_birth: row.try_get("date_of_birth")?,
            gender,
            nationality: row.try_get("nationality")?,
            street: row.try_get("street")?,
            city: row.try_get("city")?,
            residence_country: row.try_get("residence_country")?,
            emergency_contact: (!emergency_contact.is_empty()).then_some(emergency_contact),
        },
        step,
        status,
        deleted: row.try_get("deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn detail_from_row(row: &SqliteRow) -> Result<ApplicantDetail, sqlx::Error> {
    let record = record_from_row(row)?;

    let owner_contact = row
        .try_get::<Option<String>, _>("owner_email")?
        .map(|email| -> Result<OwnerContact, sqlx::Error> {
            Ok(OwnerContact {
                fullname: row.try_get("owner_full_name")?,
                email,
                phone: row.try_get("owner_phone")?,
            })
        })
        .transpose()?;

    let measurements = match row.try_get::<Option<String>, _>("m_experience")? {
        Some(experience) => {
            let hostess = if record.kind.policy().hostess_details {
                Some(HostessDetails {
                    languages: json_list(row.try_get("m_languages")?)?,
                    skills: json_list(row.try_get("m_skills")?)?,
                    availability: row.try_get("m_availability")?,
                    preferred_events: json_list(row.try_get("m_preferred_events")?)?,
                    previous_work: row.try_get("m_previous_work")?,
                    reference_contact: row.try_get("m_reference_contact")?,
                    social: SocialLinks {
                        instagram: row.try_get("m_social_instagram")?,
                        facebook: row.try_get("m_social_facebook")?,
                        twitter: row.try_get("m_social_twitter")?,
                        linkedin: row.try_get("m_social_linkedin")?,
                    },
                })
            } else {
                None
            };

            Some(Measurements {
                experience,
                height: dimension(row, "m_height")?.unwrap_or_default(),
                weight: dimension(row, "m_weight")?.unwrap_or_default(),
                waist: dimension(row, "m_waist")?,
                hips: dimension(row, "m_hips")?,
                hair_color: row.try_get("m_hair_color")?,
                eye_color: row.try_get("m_eye_color")?,
                hostess,
                photo: row.try_get::<Option<String>, _>("m_photo")?.map(BlobRef),
                additional_photos: json_list(row.try_get("m_additional_photos")?)?
                    .into_iter()
                    .map(BlobRef)
                    .collect(),
            })
        }
        None => None,
    };

    let documents = match row.try_get::<Option<String>, _>("d_issuer_country")? {
        Some(issuer_country) => {
            let document_type: String = row.try_get("d_document_type")?;
            Some(Documents {
                issuer_country,
                document_type: DocumentType::parse(&document_type)
                    .map_err(|err| corrupt(err.to_string()))?,
                front: BlobRef(row.try_get("d_front")?),
                back: BlobRef(row.try_get("d_back")?),
            })
        }
        None => None,
    };

    let identity_check = row
        .try_get::<Option<String>, _>("i_selfie")?
        .map(|selfie| -> Result<IdentityCheck, sqlx::Error> {
            Ok(IdentityCheck {
                selfie: BlobRef(selfie),
                verified: row.try_get::<Option<bool>, _>("i_verified")?.unwrap_or(false),
            })
        })
        .transpose()?;

    Ok(ApplicantDetail {
        record,
        owner_contact,
        measurements,
        documents,
        identity_check,
    })
}

fn patch_query<'q>(
    patch: &'q ProfilePatch,
    id: &'q ApplicantId,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    sqlx::query(
        r#"
        UPDATE applicants SET
            first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            username = COALESCE(?, username),
            email = COALESCE(?, email),
            whatsapp = COALESCE(?, whatsapp),
            date_of_birth = COALESCE(?, date_of_birth),
            gender = COALESCE(?, gender),
            nationality = COALESCE(?, nationality),
            street = COALESCE(?, street),
            city = COALESCE(?, city),
            residence_country = COALESCE(?, residence_country),
            emergency_contact_name = COALESCE(?, emergency_contact_name),
            emergency_contact_relationship = COALESCE(?, emergency_contact_relationship),
            emergency_contact_phone = COALESCE(?, emergency_contact_phone),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(patch.first_name.as_deref())
    .bind(patch.last_name.as_deref())
    .bind(patch.username.as_deref())
    .bind(patch.email.as_deref())
    .bind(patch.whatsapp.as_deref())
    .bind(patch.date_of_birth)
    .bind(patch.gender.map(Gender::label))
    .bind(patch.nationality.as_deref())
    .bind(patch.street.as_deref())
    .bind(patch.city.as_deref())
    .bind(patch.residence_country.as_deref())
    .bind(patch.emergency_contact.name.as_deref())
    .bind(patch.emergency_contact.relationship.as_deref())
    .bind(patch.emergency_contact.phone.as_deref())
    .bind(Utc::now())
    .bind(&id.0)
}

fn scope_clause(filter: &ListFilter, with_status: bool) -> String {
    let mut clause = String::from("a.kind = ?");
    if !filter.include_deleted {
        clause.push_str(" AND a.deleted = 0");
    }
    if with_status && filter.status.is_some() {
        clause.push_str(" AND a.status = ?");
    }
    clause
}

impl SqliteApplicantRepository {
    async fn count(
        &self,
        kind: ApplicantKind,
        filter: &ListFilter,
        with_status: bool,
    ) -> Result<u64, RepositoryError> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM applicants a WHERE {}",
            scope_clause(filter, with_status)
        );
        let mut query = sqlx::query(&sql).bind(kind.label());
        if let (true, Some(status)) = (with_status, filter.status) {
            query = query.bind(status.label());
        }
        let count: i64 = query.fetch_one(&self.pool).await?.try_get("count")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl ApplicantRepository for SqliteApplicantRepository {
    async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let profile = &record.profile;
        let contact = profile.emergency_contact.clone().unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO applicants (
                id, kind, user_id, first_name, last_name, username, email, whatsapp,
                date_of_birth, gender, nationality, street, city, residence_country,
                emergency_contact_name, emergency_contact_relationship, emergency_contact_phone,
                registration_step, status, deleted, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id.0)
        .bind(record.kind.label())
        .bind(record.owner.0)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.whatsapp)
        .bind(profile.date_of_birth)
        .bind(profile.gender.label())
        .bind(&profile.nationality)
        .bind(&profile.street)
        .bind(&profile.city)
        .bind(&profile.residence_country)
        .bind(contact.name.as_deref())
        .bind(contact.relationship.as_deref())
        .bind(contact.phone.as_deref())
        .bind(i64::from(record.step.value()))
        .bind(record.status.label())
        .bind(record.deleted)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn fetch(&self, id: &ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants a WHERE a.id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    async fn latest_for_owner(
        &self,
        kind: ApplicantKind,
        owner: UserId,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        // rowid follows insertion order; text timestamps do not sort reliably.
        let row = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS} FROM applicants a \
             WHERE a.kind = ? AND a.user_id = ? AND a.deleted = 0 \
             ORDER BY a.rowid DESC LIMIT 1"
        ))
        .bind(kind.label())
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    async fn save_measurements(
        &self,
        id: &ApplicantId,
        measurements: &Measurements,
    ) -> Result<(), RepositoryError> {
        let details = measurements.hostess.clone().unwrap_or_default();
        let additional: Vec<String> = measurements
            .additional_photos
            .iter()
            .map(|blob| blob.0.clone())
            .collect();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO applicant_measurements (
                id, applicant_id, experience, height, weight, waist, hips, hair_color,
                eye_color, languages, skills, availability, preferred_events, previous_work,
                reference_contact, social_instagram, social_facebook, social_twitter,
                social_linkedin, photo, additional_photos, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (applicant_id) DO UPDATE SET
                experience = excluded.experience,
                height = excluded.height,
                weight = excluded.weight,
                waist = excluded.waist,
                hips = excluded.hips,
                hair_color = excluded.hair_color,
                eye_color = excluded.eye_color,
                languages = excluded.languages,
                skills = excluded.skills,
                availability = excluded.availability,
                preferred_events = excluded.preferred_events,
                previous_work = excluded.previous_work,
                reference_contact = excluded.reference_contact,
                social_instagram = excluded.social_instagram,
                social_facebook = excluded.social_facebook,
                social_twitter = excluded.social_twitter,
                social_linkedin = excluded.social_linkedin,
                photo = excluded.photo,
                additional_photos = excluded.additional_photos,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(ApplicantId::generate().0)
        .bind(&id.0)
        .bind(&measurements.experience)
        .bind(i64::from(measurements.height))
        .bind(i64::from(measurements.weight))
        .bind(measurements.waist.map(i64::from))
        .bind(measurements.hips.map(i64::from))
        .bind(measurements.hair_color.as_deref())
        .bind(measurements.eye_color.as_deref())
        .bind(to_json(&details.languages))
        .bind(to_json(&details.skills))
        .bind(details.availability.as_deref())
        .bind(to_json(&details.preferred_events))
        .bind(details.previous_work.as_deref())
        .bind(details.reference_contact.as_deref())
        .bind(details.social.instagram.as_deref())
        .bind(details.social.facebook.as_deref())
        .bind(details.social.twitter.as_deref())
        .bind(details.social.linkedin.as_deref())
        .bind(measurements.photo.as_ref().map(|blob| blob.0.as_str()))
        .bind(to_json(&additional))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_documents(
        &self,
        id: &ApplicantId,
        documents: &Documents,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO applicant_documents (
                id, applicant_id, issuer_country, document_type, document_front,
                document_back, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (applicant_id) DO UPDATE SET
                issuer_country = excluded.issuer_country,
                document_type = excluded.document_type,
                document_front = excluded.document_front,
                document_back = excluded.document_back,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(ApplicantId::generate().0)
        .bind(&id.0)
        .bind(&documents.issuer_country)
        .bind(documents.document_type.label())
        .bind(&documents.front.0)
        .bind(&documents.back.0)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_identity_check(
        &self,
        id: &ApplicantId,
        check: &IdentityCheck,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO applicant_identity_checks (id, applicant_id, selfie_with_id, verified, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (applicant_id) DO UPDATE SET
                selfie_with_id = excluded.selfie_with_id,
                verified = excluded.verified
            "#,
        )
        .bind(ApplicantId::generate().0)
        .bind(&id.0)
        .bind(&check.selfie.0)
        .bind(check.verified)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn advance_step(
        &self,
        id: &ApplicantId,
        target: RegistrationStep,
        mark_under_review: bool,
    ) -> Result<ApplicantRecord, RepositoryError> {
        let result = sqlx::query(&format!(
            "UPDATE applicants SET \
                 registration_step = MAX(registration_step, ?), \
                 status = CASE WHEN ? AND status IN {NON_TERMINAL} THEN 'under_review' ELSE status END, \
                 updated_at = ? \
             WHERE id = ?"
        ))
        .bind(i64::from(target.value()))
        .bind(mark_under_review)
        .bind(Utc::now())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.fetch(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn patch_profile(
        &self,
        id: &ApplicantId,
        patch: &ProfilePatch,
    ) -> Result<(), RepositoryError> {
        let result = patch_query(patch, id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_status(
        &self,
        id: &ApplicantId,
        status: ApplicantStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&format!(
            "UPDATE applicants SET status = ?, updated_at = ? \
             WHERE id = ? AND status IN {NON_TERMINAL}"
        ))
        .bind(status.label())
        .bind(Utc::now())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: &ApplicantId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE applicants SET deleted = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        kind: ApplicantKind,
        filter: &ListFilter,
    ) -> Result<ListPage, RepositoryError> {
        let total_count = self.count(kind, filter, false).await?;
        let filtered_count = self.count(kind, filter, true).await?;

        let sql = format!(
            "SELECT {APPLICANT_COLUMNS}, {DETAIL_JOINS} WHERE {} \
             ORDER BY a.rowid DESC LIMIT ? OFFSET ?",
            scope_clause(filter, true)
        );
        let mut query = sqlx::query(&sql).bind(kind.label());
        if let Some(status) = filter.status {
            query = query.bind(status.label());
        }
        let rows = query
            .bind(i64::from(filter.limit))
            .bind(i64::try_from(filter.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(detail_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ListPage {
            items,
            total_count,
            filtered_count,
        })
    }

    async fn detail(&self, id: &ApplicantId) -> Result<Option<ApplicantDetail>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICANT_COLUMNS}, {DETAIL_JOINS} WHERE a.id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(detail_from_row).transpose()?)
    }

    async fn admin_update(
        &self,
        id: &ApplicantId,
        update: &AdminUpdate,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = patch_query(&update.profile, id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if let Some(measurements) = &update.measurements {
            let result = sqlx::query(
                r#"
                UPDATE applicant_measurements SET
                    experience = COALESCE(?, experience),
                    height = COALESCE(?, height),
                    weight = COALESCE(?, weight),
                    waist = COALESCE(?, waist),
                    hips = COALESCE(?, hips),
                    hair_color = COALESCE(?, hair_color),
                    eye_color = COALESCE(?, eye_color),
                    availability = COALESCE(?, availability),
                    social_instagram = COALESCE(?, social_instagram),
                    social_facebook = COALESCE(?, social_facebook),
                    social_twitter = COALESCE(?, social_twitter),
                    social_linkedin = COALESCE(?, social_linkedin),
                    updated_at = ?
                WHERE applicant_id = ?
                "#,
            )
            .bind(measurements.experience.as_deref())
            .bind(measurements.height.map(i64::from))
            .bind(measurements.weight.map(i64::from))
            .bind(measurements.waist.map(i64::from))
            .bind(measurements.hips.map(i64::from))
            .bind(measurements.hair_color.as_deref())
            .bind(measurements.eye_color.as_deref())
            .bind(measurements.availability.as_deref())
            .bind(measurements.social_instagram.as_deref())
            .bind(measurements.social_facebook.as_deref())
            .bind(measurements.social_twitter.as_deref())
            .bind(measurements.social_linkedin.as_deref())
            .bind(now)
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::MissingSection("measurements"));
            }
        }

        if update.issuer_country.is_some() || update.document_type.is_some() {
            let result = sqlx::query(
                r#"
                UPDATE applicant_documents SET
                    issuer_country = COALESCE(?, issuer_country),
                    document_type = COALESCE(?, document_type),
                    updated_at = ?
                WHERE applicant_id = ?
                "#,
            )
            .bind(update.issuer_country.as_deref())
            .bind(update.document_type.map(DocumentType::label))
            .bind(now)
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::MissingSection("documents"));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
