/// Authentication Routes
///
/// Password login, refresh-token rotation and current identity information.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AccessClaims, CredentialVerifier, RotationService};
use crate::error::{AppError, ErrorContext};
use crate::users::Authority;

/// Password login form
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Identity information response
#[derive(Serialize)]
pub struct MeResponse {
    pub name: String,
    pub authority: Authority,
}

/// POST /token
///
/// Authenticate with a form-encoded username and password. Starts a new
/// refresh-token family and returns the first token pair.
///
/// # Errors
/// - 400: Malformed form body
/// - 401: Unknown user, wrong password, or disabled account
/// - 503: Token store unreachable while running fail-closed
pub async fn login(
    form: web::Form<LoginForm>,
    rotation: web::Data<RotationService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login").with_user(form.username.clone());

    let pair = rotation.login(&form.username, &form.password).await?;

    tracing::debug!(
        request_id = %context.request_id,
        user = %form.username,
        "Token pair issued"
    );
    Ok(HttpResponse::Ok().json(pair))
}

/// POST /refresh
///
/// Exchange the current refresh token of a family for a new pair. The
/// presented token is spent whether or not the caller keeps the response.
///
/// # Errors
/// - 401: Invalid, expired, denylisted or reused token; inactive identity
/// - 503: Token store unreachable while running fail-closed
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    rotation: web::Data<RotationService>,
) -> Result<HttpResponse, AppError> {
    let pair = rotation.refresh(&body.refresh_token).await?;
    Ok(HttpResponse::Ok().json(pair))
}

/// GET /me
///
/// Identity behind the bearer access token. The user record is re-read so a
/// disabled or deleted account stops working before its access token expires.
pub async fn me(
    claims: web::ReqData<AccessClaims>,
    verifier: web::Data<CredentialVerifier>,
) -> Result<HttpResponse, AppError> {
    let user = verifier.active_identity(&claims.sub).await?;

    Ok(HttpResponse::Ok().json(MeResponse {
        name: user.name,
        authority: user.authority,
    }))
}
