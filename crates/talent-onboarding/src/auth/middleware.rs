//! Bearer-token middleware. Validated principals are stored in request extensions so
//! handlers can take `Extension<Principal>`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::session::{AuthError, PrincipalKind, SessionIssuer};
use crate::error::ServiceError;

pub(crate) fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

async fn require(
    issuer: &SessionIssuer,
    kind: PrincipalKind,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let principal = bearer_token(&request)
        .and_then(|token| issuer.validate(kind, token))
        .map_err(|err| {
            debug!(path = %request.uri().path(), error = %err, "request rejected");
            ServiceError::from(err)
        })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Admit only requests carrying a valid user session.
pub async fn require_user(
    State(issuer): State<Arc<SessionIssuer>>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    require(&issuer, PrincipalKind::User, request, next).await
}

/// Admit only requests carrying a valid admin session.
pub async fn require_admin(
    State(issuer): State<Arc<SessionIssuer>>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    require(&issuer, PrincipalKind::Admin, request, next).await
}
