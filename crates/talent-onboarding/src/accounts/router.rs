use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use super::domain::{AdminProfile, ContactForm, RegistrationDetails, UserSummary};
use super::repository::{CredentialStore, Notifier};
use super::service::{AccountService, AdminLogin, UserLogin, VerificationDispatched};
use crate::auth::{require_admin, require_user, Principal};
use crate::error::ServiceError;

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::validation(rejection.body_text()))
}

#[derive(Debug, Deserialize)]
pub struct StartRegistrationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RegistrationStarted {
    pub message: &'static str,
    #[serde(flatten)]
    pub dispatch: VerificationDispatched,
}

#[derive(Debug, Serialize)]
pub struct RegistrationCompleted {
    pub message: &'static str,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct AdminProfileResponse {
    pub admin: AdminProfile,
}

/// Public registration and login endpoints plus the two profile lookups.
pub fn account_router<S, N>(service: Arc<AccountService<S, N>>) -> Router
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let issuer = service.issuer();

    let public = Router::new()
        .route("/register/start", post(start_handler::<S, N>))
        .route("/register/verify", post(verify_handler::<S, N>))
        .route("/register/complete", post(complete_handler::<S, N>))
        .route("/login", post(login_handler::<S, N>))
        .route("/admin/login", post(admin_login_handler::<S, N>))
        .route("/contact", post(contact_handler::<S, N>));

    let user = Router::new()
        .route("/api/account", get(account_handler::<S, N>))
        .route_layer(middleware::from_fn_with_state(issuer.clone(), require_user));

    let admin = Router::new()
        .route("/api/admin/profile", get(admin_profile_handler::<S, N>))
        .route_layer(middleware::from_fn_with_state(issuer, require_admin));

    public.merge(user).merge(admin).with_state(service)
}

pub(crate) async fn start_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    payload: Result<Json<StartRegistrationRequest>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let request = json_body(payload)?;
    let dispatch = service.start_registration(&request.email).await?;
    let body = RegistrationStarted {
        message: "Verification code sent",
        dispatch,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub(crate) async fn verify_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let request = json_body(payload)?;
    service.verify_email(&request.email, &request.code).await?;
    Ok(Json(MessageResponse {
        message: "Email verified",
    }))
}

pub(crate) async fn complete_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    payload: Result<Json<RegistrationDetails>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let details = json_body(payload)?;
    let user = service.complete_registration(details).await?;
    let body = RegistrationCompleted {
        message: "Registration completed",
        user,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn login_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserLogin>, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let request = json_body(payload)?;
    Ok(Json(service.login(&request.email, &request.password).await?))
}

pub(crate) async fn admin_login_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<AdminLogin>, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let request = json_body(payload)?;
    Ok(Json(
        service
            .admin_login(&request.username, &request.password)
            .await?,
    ))
}

pub(crate) async fn account_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<AccountResponse>, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let user = service.account(&principal).await?;
    Ok(Json(AccountResponse { user }))
}

pub(crate) async fn admin_profile_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<AdminProfileResponse>, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let admin = service.admin_profile(&principal).await?;
    Ok(Json(AdminProfileResponse { admin }))
}

pub(crate) async fn contact_handler<S, N>(
    State(service): State<Arc<AccountService<S, N>>>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<MessageResponse>, ServiceError>
where
    S: CredentialStore + 'static,
    N: Notifier + 'static,
{
    let form = json_body(payload)?;
    service.contact(form).await?;
    Ok(Json(MessageResponse {
        message: "Message sent",
    }))
}
