use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{middleware, Extension, Json, Router};
use serde::Deserialize;

use super::domain::{
    AdminUpdateInput, ApplicantId, ApplicantKind, ApplicantStatus, Decision, ProfileInput,
};
use super::repository::{ApplicantRepository, ListFilter};
use super::service::OnboardingService;
use super::storage::{BlobStore, UploadedFile};
use super::submission::SubmissionForm;
use super::views::{
    ApplicantView, DecisionView, GalleryView, ListView, MessageView, OwnApplicantView,
    ProgressView, StepView,
};
use crate::accounts::router::json_body;
use crate::auth::{require_admin, require_user, Principal};
use crate::error::ServiceError;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageQuery {
    fn bounds(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_deleted: Option<bool>,
}

impl ListQuery {
    fn into_filter(self) -> Result<ListFilter, ServiceError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(ApplicantStatus::from_label(raw).ok_or_else(|| {
                ServiceError::validation(
                    "status must be one of pending, under_review, approved, rejected",
                )
            })?),
        };
        let (page, limit) = PageQuery {
            page: self.page,
            limit: self.limit,
        }
        .bounds();

        Ok(ListFilter {
            status,
            page,
            limit,
            include_deleted: self.include_deleted.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

fn query<T>(payload: Result<Query<T>, QueryRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Query(query)| query)
        .map_err(|rejection| ServiceError::validation(rejection.body_text()))
}

/// Collect text fields and non-empty file parts.
pub(crate) async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<SubmissionForm, ServiceError> {
    let mut multipart =
        multipart.map_err(|rejection| ServiceError::validation(rejection.body_text()))?;
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServiceError::validation(err.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ServiceError::validation(err.body_text()))?;
                if bytes.is_empty() {
                    continue;
                }
                form.files.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    bytes,
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ServiceError::validation(err.body_text()))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

type Service<R, B> = Arc<OnboardingService<R, B>>;

fn applicant_routes<R, B>(kind: ApplicantKind) -> Router<Service<R, B>>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let step_two = format!("/{}", kind.policy().step_two_segment);
    Router::new()
        .route("/create", post(create_handler::<R, B>))
        .route(&step_two, post(measurements_handler::<R, B>))
        .route("/documents", post(documents_handler::<R, B>))
        .route("/identity-check", post(identity_check_handler::<R, B>))
        .route("/progress", get(progress_handler::<R, B>))
        .route("/approved", get(gallery_handler::<R, B>))
        .route(
            "/:id",
            put(update_handler::<R, B>).delete(delete_handler::<R, B>),
        )
        .layer(Extension(kind))
}

fn moderation_routes<R, B>(kind: ApplicantKind) -> Router<Service<R, B>>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    Router::new()
        .route("/", get(list_handler::<R, B>))
        .route(
            "/:id",
            get(detail_handler::<R, B>)
                .put(admin_update_handler::<R, B>)
                .delete(admin_delete_handler::<R, B>),
        )
        .route("/:id/:action", post(decision_handler::<R, B>))
        .layer(Extension(kind))
}

/// Applicant routes under `/api/{kind}` and moderation routes under `/api/admin/{kind}`.
pub fn onboarding_router<R, B>(service: Service<R, B>) -> Router
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let issuer = service.issuer();

    let mut user = Router::new();
    let mut admin = Router::new();
    for kind in ApplicantKind::ALL {
        user = user.nest(
            &format!("/api/{}", kind.collection()),
            applicant_routes::<R, B>(kind),
        );
        admin = admin.nest(
            &format!("/api/admin/{}", kind.collection()),
            moderation_routes::<R, B>(kind),
        );
    }

    let user = user.route_layer(middleware::from_fn_with_state(issuer.clone(), require_user));
    let admin = admin.route_layer(middleware::from_fn_with_state(issuer, require_admin));

    user.merge(admin).with_state(service)
}

pub(crate) async fn create_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let input = json_body(payload)?;
    let record = service.registry.create(&principal, kind, input).await?;
    let body = StepView::new(
        format!("{} profile created successfully", kind.title()),
        &record,
    );
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn measurements_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StepView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let form = read_form(multipart).await?;
    let record = service
        .pipeline
        .submit_measurements(&principal, kind, form)
        .await?;
    let message = match kind {
        ApplicantKind::Model => "Measurements saved successfully",
        ApplicantKind::Hostess => "Experience saved successfully",
    };
    Ok(Json(StepView::new(message, &record)))
}

pub(crate) async fn documents_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StepView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let form = read_form(multipart).await?;
    let record = service
        .pipeline
        .submit_documents(&principal, kind, form)
        .await?;
    Ok(Json(StepView::new("Documents uploaded successfully", &record)))
}

pub(crate) async fn identity_check_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StepView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let form = read_form(multipart).await?;
    let record = service
        .pipeline
        .submit_identity_check(&principal, kind, form)
        .await?;
    Ok(Json(StepView::new(
        "Identity check submitted successfully",
        &record,
    )))
}

pub(crate) async fn progress_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ProgressView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let record = service.registry.progress(&principal, kind).await?;
    Ok(Json(ProgressView::from(&record)))
}

pub(crate) async fn gallery_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    params: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<GalleryView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let (page, limit) = query(params)?.bounds();
    let listing = service.moderation.gallery(kind, page, limit).await?;
    Ok(Json(GalleryView::new(kind, &listing, page, limit)))
}

pub(crate) async fn update_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Json<OwnApplicantView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let input = json_body(payload)?;
    let record = service
        .registry
        .update(&principal, kind, &ApplicantId(id), input)
        .await?;
    Ok(Json(OwnApplicantView::from(&record)))
}

pub(crate) async fn delete_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    service
        .registry
        .soft_delete(&principal, kind, &ApplicantId(id.clone()))
        .await?;
    Ok(Json(MessageView::new(
        format!("{} deleted successfully", kind.title()),
        kind,
        &id,
    )))
}

pub(crate) async fn list_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let filter = query(params)?.into_filter()?;
    let listing = service.moderation.list(&principal, kind, &filter).await?;
    Ok(Json(ListView::new(
        kind,
        &listing,
        filter.status,
        filter.page,
        filter.limit,
    )))
}

pub(crate) async fn detail_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ApplicantView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let detail = service
        .moderation
        .get(&principal, kind, &ApplicantId(id))
        .await?;
    Ok(Json(ApplicantView::from(&detail)))
}

pub(crate) async fn decision_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    Path((id, action)): Path<(String, String)>,
    payload: Option<Json<DecisionRequest>>,
) -> Result<Json<DecisionView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let decision = Decision::from_action(&action).ok_or_else(|| {
        ServiceError::validation("action must be one of approve, reject")
    })?;
    let notes = payload
        .and_then(|Json(request)| request.admin_notes)
        .filter(|notes| !notes.trim().is_empty());

    let record = service
        .moderation
        .decide(&principal, kind, &ApplicantId(id), decision, notes.as_deref())
        .await?;
    Ok(Json(DecisionView::new(&record, notes)))
}

pub(crate) async fn admin_update_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<AdminUpdateInput>, JsonRejection>,
) -> Result<Json<ApplicantView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    let input = json_body(payload)?;
    let detail = service
        .moderation
        .update(&principal, kind, &ApplicantId(id), input)
        .await?;
    Ok(Json(ApplicantView::from(&detail)))
}

pub(crate) async fn admin_delete_handler<R, B>(
    State(service): State<Service<R, B>>,
    Extension(kind): Extension<ApplicantKind>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<MessageView>, ServiceError>
where
    R: ApplicantRepository + 'static,
    B: BlobStore + 'static,
{
    service
        .moderation
        .delete(&principal, kind, &ApplicantId(id.clone()))
        .await?;
    Ok(Json(MessageView::new(
        format!("{} deleted successfully", kind.title()),
        kind,
        &id,
    )))
}
