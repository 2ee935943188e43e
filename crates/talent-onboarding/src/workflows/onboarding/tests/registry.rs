use chrono::NaiveDate;

use super::common::*;
use crate::error::ServiceError;
use crate::workflows::onboarding::{
    ApplicantId, ApplicantKind, ApplicantStatus, Gender, ProfileInput, RegistrationStep,
};

#[tokio::test]
async fn create_starts_pending_at_step_one_with_session_email() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;

    let record = harness
        .service
        .registry
        .create(&ana, ApplicantKind::Model, profile_input("ana.model"))
        .await
        .expect("created");

    assert_eq!(record.step, RegistrationStep::PROFILE);
    assert_eq!(record.status, ApplicantStatus::Pending);
    assert_eq!(record.profile.email, "ana@example.com");
    assert_eq!(
        record.profile.date_of_birth,
        NaiveDate::from_ymd_opt(1995, 7, 10).expect("valid date")
    );
    assert!(
        record.profile.emergency_contact.is_none(),
        "models carry no emergency contact"
    );

    let stored = harness
        .service
        .registry
        .progress(&ana, ApplicantKind::Model)
        .await
        .expect("progress");
    assert_eq!(stored.id, record.id);
}

#[tokio::test]
async fn usernames_are_unique_per_kind() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let ioana = harness.applicant("ioana@example.com").await;
    let registry = &harness.service.registry;

    registry
        .create(&ana, ApplicantKind::Hostess, profile_input("shared"))
        .await
        .expect("first hostess");

    let err = registry
        .create(&ioana, ApplicantKind::Hostess, profile_input("shared"))
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(err.to_string(), "Username is already taken");

    registry
        .create(&ioana, ApplicantKind::Model, profile_input("shared"))
        .await
        .expect("models have their own namespace");
}

#[tokio::test]
async fn create_rejects_bad_dates_and_admin_sessions() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;

    let mut input = profile_input("ana.model");
    input.date_of_birth = Some("10/07/1995".to_string());
    let err = harness
        .service
        .registry
        .create(&ana, ApplicantKind::Model, input)
        .await
        .expect_err("date format");
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = harness
        .service
        .registry
        .create(&admin_principal(), ApplicantKind::Model, profile_input("admin"))
        .await
        .expect_err("admins do not own applicants");
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn progress_tracks_the_latest_live_applicant() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let registry = &harness.service.registry;

    let err = registry
        .progress(&ana, ApplicantKind::Hostess)
        .await
        .expect_err("nothing yet");
    assert_eq!(err.to_string(), "Hostess not found");

    let first = registry
        .create(&ana, ApplicantKind::Hostess, profile_input("ana.one"))
        .await
        .expect("first");
    let second = registry
        .create(&ana, ApplicantKind::Hostess, profile_input("ana.two"))
        .await
        .expect("second");

    let latest = registry
        .progress(&ana, ApplicantKind::Hostess)
        .await
        .expect("progress");
    assert_eq!(latest.id, second.id);

    registry
        .soft_delete(&ana, ApplicantKind::Hostess, &second.id)
        .await
        .expect("deleted");
    let latest = registry
        .progress(&ana, ApplicantKind::Hostess)
        .await
        .expect("falls back");
    assert_eq!(latest.id, first.id);
}

#[tokio::test]
async fn updates_require_ownership_and_an_existing_row() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let mallory = harness.applicant("mallory@example.com").await;
    let registry = &harness.service.registry;

    let record = registry
        .create(&ana, ApplicantKind::Hostess, profile_input("ana.h"))
        .await
        .expect("created");

    let patch = ProfileInput {
        city: Some("Iasi".to_string()),
        ..ProfileInput::default()
    };

    let err = registry
        .update(&mallory, ApplicantKind::Hostess, &record.id, patch.clone())
        .await
        .expect_err("foreign owner");
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = registry
        .update(
            &mallory,
            ApplicantKind::Hostess,
            &ApplicantId("missing".to_string()),
            patch.clone(),
        )
        .await
        .expect_err("missing row");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = registry
        .update(&ana, ApplicantKind::Model, &record.id, patch.clone())
        .await
        .expect_err("other kind");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let updated = registry
        .update(&ana, ApplicantKind::Hostess, &record.id, patch)
        .await
        .expect("owner update");
    assert_eq!(updated.profile.city, "Iasi");
    assert_eq!(updated.profile.street, record.profile.street);
    assert_eq!(updated.profile.gender, Gender::Female);
    assert!(updated.updated_at >= record.updated_at);
}

#[tokio::test]
async fn owners_cannot_reassign_their_email() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let registry = &harness.service.registry;

    let record = registry
        .create(&ana, ApplicantKind::Model, profile_input("ana.m"))
        .await
        .expect("created");
    let updated = registry
        .update(
            &ana,
            ApplicantKind::Model,
            &record.id,
            ProfileInput {
                email: Some("other@example.com".to_string()),
                ..ProfileInput::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.profile.email, "ana@example.com");
}

#[tokio::test]
async fn owner_delete_hides_the_applicant() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let mallory = harness.applicant("mallory@example.com").await;
    let registry = &harness.service.registry;

    let record = registry
        .create(&ana, ApplicantKind::Model, profile_input("ana.m"))
        .await
        .expect("created");

    let err = registry
        .soft_delete(&mallory, ApplicantKind::Model, &record.id)
        .await
        .expect_err("foreign owner");
    assert!(matches!(err, ServiceError::Forbidden(_)));

    registry
        .soft_delete(&ana, ApplicantKind::Model, &record.id)
        .await
        .expect("deleted");

    let err = registry
        .soft_delete(&ana, ApplicantKind::Model, &record.id)
        .await
        .expect_err("already tombstoned");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = registry
        .progress(&ana, ApplicantKind::Model)
        .await
        .expect_err("hidden from progress");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
