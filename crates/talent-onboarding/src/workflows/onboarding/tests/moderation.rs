use super::common::*;
use crate::error::ServiceError;
use crate::workflows::onboarding::{
    AdminUpdateInput, ApplicantId, ApplicantKind, ApplicantRecord, ApplicantStatus, Decision,
    DocumentType, DocumentsUpdate, ListFilter, MeasurementsUpdate, ProfileInput,
    RegistrationStep,
};

async fn under_review(harness: &Harness, email: &str, username: &str) -> ApplicantRecord {
    let owner = harness.applicant(email).await;
    let record = harness
        .at_step_two(&owner, ApplicantKind::Model, username)
        .await;
    let record = harness
        .service
        .pipeline
        .submit_documents(&owner, ApplicantKind::Model, documents_form(&record, true))
        .await
        .expect("step three");
    harness
        .service
        .pipeline
        .submit_identity_check(&owner, ApplicantKind::Model, selfie_form(&record))
        .await
        .expect("step four")
}

#[tokio::test]
async fn terminal_decisions_are_final() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let record = under_review(&harness, "ana@example.com", "ana.m").await;
    assert_eq!(record.status, ApplicantStatus::UnderReview);

    let rejected = harness
        .service
        .moderation
        .decide(
            &admin,
            ApplicantKind::Model,
            &record.id,
            Decision::Reject,
            Some("blurry documents"),
        )
        .await
        .expect("reject");
    assert_eq!(rejected.status, ApplicantStatus::Rejected);

    for decision in [Decision::Reject, Decision::Approve] {
        let err = harness
            .service
            .moderation
            .decide(&admin, ApplicantKind::Model, &record.id, decision, None)
            .await
            .expect_err("already decided");
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(err.to_string(), "Model is already rejected");
    }

    let detail = harness
        .service
        .moderation
        .get(&admin, ApplicantKind::Model, &record.id)
        .await
        .expect("detail");
    assert_eq!(detail.record.status, ApplicantStatus::Rejected);
}

#[tokio::test]
async fn pending_applicants_may_be_approved_directly() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let record = harness
        .service
        .registry
        .create(&ana, ApplicantKind::Hostess, profile_input("ana.h"))
        .await
        .expect("created");

    let approved = harness
        .service
        .moderation
        .decide(
            &admin_principal(),
            ApplicantKind::Hostess,
            &record.id,
            Decision::Approve,
            None,
        )
        .await
        .expect("approve");
    assert_eq!(approved.status, ApplicantStatus::Approved);
    assert_eq!(approved.step, RegistrationStep::PROFILE);
}

#[tokio::test]
async fn moderation_requires_an_admin() {
    let harness = Harness::new().await;
    let ana = harness.applicant("ana@example.com").await;
    let record = harness
        .service
        .registry
        .create(&ana, ApplicantKind::Model, profile_input("ana.m"))
        .await
        .expect("created");

    let err = harness
        .service
        .moderation
        .decide(&ana, ApplicantKind::Model, &record.id, Decision::Approve, None)
        .await
        .expect_err("not an admin");
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = harness
        .service
        .moderation
        .list(&ana, ApplicantKind::Model, &ListFilter::default())
        .await
        .expect_err("not an admin");
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn listing_filters_paginates_and_counts() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let reviewed = under_review(&harness, "ana@example.com", "ana.m").await;

    let ioana = harness.applicant("ioana@example.com").await;
    for username in ["ioana.1", "ioana.2", "ioana.3"] {
        harness
            .service
            .registry
            .create(&ioana, ApplicantKind::Model, profile_input(username))
            .await
            .expect("created");
    }
    harness
        .service
        .registry
        .create(&ioana, ApplicantKind::Hostess, profile_input("ioana.h"))
        .await
        .expect("hostess is listed separately");

    let everything = harness
        .service
        .moderation
        .list(&admin, ApplicantKind::Model, &ListFilter::default())
        .await
        .expect("list");
    assert_eq!(everything.total_count, 4);
    assert_eq!(everything.filtered_count, 4);
    assert_eq!(everything.items.len(), 4);
    assert_eq!(everything.items[0].record.profile.username, "ioana.3");
    let partial = &everything.items[0];
    assert!(partial.measurements.is_none());
    assert!(partial.documents.is_none());
    let owner = partial.owner_contact.as_ref().expect("owner joined");
    assert_eq!(owner.email, "ioana@example.com");

    let filter = ListFilter {
        status: Some(ApplicantStatus::UnderReview),
        ..ListFilter::default()
    };
    let filtered = harness
        .service
        .moderation
        .list(&admin, ApplicantKind::Model, &filter)
        .await
        .expect("filtered");
    assert_eq!(filtered.total_count, 4);
    assert_eq!(filtered.filtered_count, 1);
    assert_eq!(filtered.items[0].record.id, reviewed.id);
    assert!(filtered.items[0].documents.is_some());
    assert!(filtered.items[0].identity_check.is_some());

    let second_page = ListFilter {
        page: 2,
        limit: 3,
        ..ListFilter::default()
    };
    let page = harness
        .service
        .moderation
        .list(&admin, ApplicantKind::Model, &second_page)
        .await
        .expect("page two");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].record.id, reviewed.id);
    assert_eq!(page.total_count, 4);
}

#[tokio::test]
async fn tombstones_stay_visible_to_direct_lookup() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let ana = harness.applicant("ana@example.com").await;
    let record = harness
        .service
        .registry
        .create(&ana, ApplicantKind::Model, profile_input("ana.m"))
        .await
        .expect("created");

    harness
        .service
        .moderation
        .delete(&admin, ApplicantKind::Model, &record.id)
        .await
        .expect("deleted");
    harness
        .service
        .moderation
        .delete(&admin, ApplicantKind::Model, &record.id)
        .await
        .expect("repeat delete succeeds");

    let detail = harness
        .service
        .moderation
        .get(&admin, ApplicantKind::Model, &record.id)
        .await
        .expect("direct lookup");
    assert!(detail.record.deleted);

    let listing = harness
        .service
        .moderation
        .list(&admin, ApplicantKind::Model, &ListFilter::default())
        .await
        .expect("list");
    assert_eq!(listing.total_count, 0);
    let with_deleted = ListFilter {
        include_deleted: true,
        ..ListFilter::default()
    };
    let listing = harness
        .service
        .moderation
        .list(&admin, ApplicantKind::Model, &with_deleted)
        .await
        .expect("list with deleted");
    assert_eq!(listing.total_count, 1);

    let err = harness
        .service
        .moderation
        .decide(&admin, ApplicantKind::Model, &record.id, Decision::Approve, None)
        .await
        .expect_err("deleted applicants are not decided");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = harness
        .service
        .moderation
        .get(&admin, ApplicantKind::Hostess, &record.id)
        .await
        .expect_err("kind mismatch");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = harness
        .service
        .moderation
        .delete(&admin, ApplicantKind::Model, &ApplicantId("missing".to_string()))
        .await
        .expect_err("missing");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

fn full_update() -> AdminUpdateInput {
    AdminUpdateInput {
        profile: ProfileInput {
            city: Some("Timisoara".to_string()),
            email: Some("corrected@example.com".to_string()),
            ..ProfileInput::default()
        },
        measurements: Some(MeasurementsUpdate {
            height: Some(180),
            hair_color: Some("Auburn".to_string()),
            ..MeasurementsUpdate::default()
        }),
        documents: Some(DocumentsUpdate {
            document_issuer_country: Some("Moldova".to_string()),
            document_type: Some("National ID Card".to_string()),
        }),
    }
}

#[tokio::test]
async fn admin_update_spans_every_table() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let record = under_review(&harness, "ana@example.com", "ana.m").await;

    let detail = harness
        .service
        .moderation
        .update(&admin, ApplicantKind::Model, &record.id, full_update())
        .await
        .expect("update");

    assert_eq!(detail.record.profile.city, "Timisoara");
    assert_eq!(detail.record.profile.email, "corrected@example.com");
    assert_eq!(detail.record.profile.first_name, "Ana");
    assert_eq!(detail.record.status, ApplicantStatus::UnderReview);
    let measurements = detail.measurements.expect("measurements");
    assert_eq!(measurements.height, 180);
    assert_eq!(measurements.weight, 58);
    assert_eq!(measurements.hair_color.as_deref(), Some("Auburn"));
    let documents = detail.documents.expect("documents");
    assert_eq!(documents.issuer_country, "Moldova");
    assert_eq!(documents.document_type, DocumentType::NationalIdCard);
}

#[tokio::test]
async fn admin_update_rolls_back_when_any_table_fails() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let record = under_review(&harness, "ana@example.com", "ana.m").await;
    break_table(&harness.pool, "applicant_documents", "UPDATE").await;

    let err = harness
        .service
        .moderation
        .update(&admin, ApplicantKind::Model, &record.id, full_update())
        .await
        .expect_err("documents update aborts");
    assert!(matches!(err, ServiceError::Infra(_)));

    let detail = harness
        .service
        .moderation
        .get(&admin, ApplicantKind::Model, &record.id)
        .await
        .expect("detail");
    assert_eq!(detail.record.profile.city, "Cluj");
    assert_eq!(detail.record.profile.email, "ana@example.com");
    assert_eq!(detail.measurements.expect("measurements").height, 176);
    assert_eq!(detail.documents.expect("documents").issuer_country, "Romania");
}

#[tokio::test]
async fn admin_update_refuses_sections_the_applicant_never_submitted() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let ana = harness.applicant("ana@example.com").await;
    let fresh = harness
        .service
        .registry
        .create(&ana, ApplicantKind::Model, profile_input("ana.m"))
        .await
        .expect("created");

    let err = harness
        .service
        .moderation
        .update(&admin, ApplicantKind::Model, &fresh.id, full_update())
        .await
        .expect_err("no measurements yet");
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(err.to_string(), "Model has no measurements to update");

    let detail = harness
        .service
        .moderation
        .get(&admin, ApplicantKind::Model, &fresh.id)
        .await
        .expect("detail");
    assert_eq!(detail.record.profile.city, "Cluj");
    assert_eq!(detail.record.profile.email, "ana@example.com");

    let ioana = harness.applicant("ioana@example.com").await;
    let measured = harness
        .at_step_two(&ioana, ApplicantKind::Model, "ioana.m")
        .await;
    let err = harness
        .service
        .moderation
        .update(&admin, ApplicantKind::Model, &measured.id, full_update())
        .await
        .expect_err("no documents yet");
    assert_eq!(err.to_string(), "Model has no documents to update");

    let detail = harness
        .service
        .moderation
        .get(&admin, ApplicantKind::Model, &measured.id)
        .await
        .expect("detail");
    assert_eq!(detail.record.profile.city, "Cluj");
    let measurements = detail.measurements.expect("measurements");
    assert_eq!(measurements.height, 176);
    assert_eq!(measurements.hair_color, None);
}

#[tokio::test]
async fn gallery_lists_only_approved_live_applicants() {
    let harness = Harness::new().await;
    let admin = admin_principal();
    let approved = under_review(&harness, "ana@example.com", "ana.m").await;
    let waiting = under_review(&harness, "ioana@example.com", "ioana.m").await;
    let removed = under_review(&harness, "maria@example.com", "maria.m").await;

    for id in [&approved.id, &removed.id] {
        harness
            .service
            .moderation
            .decide(&admin, ApplicantKind::Model, id, Decision::Approve, None)
            .await
            .expect("approve");
    }
    harness
        .service
        .moderation
        .delete(&admin, ApplicantKind::Model, &removed.id)
        .await
        .expect("delete");

    let gallery = harness
        .service
        .moderation
        .gallery(ApplicantKind::Model, 1, 10)
        .await
        .expect("gallery");
    let ids: Vec<_> = gallery.items.iter().map(|item| &item.record.id).collect();
    assert_eq!(ids, vec![&approved.id]);
    assert!(!ids.contains(&&waiting.id));
}
