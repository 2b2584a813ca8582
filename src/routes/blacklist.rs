/// Administrative revocation routes
///
/// Every handler requires a bearer access token whose identity is still
/// active and holds admin authority.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{require_authority, AccessClaims, CredentialVerifier, RevocationService};
use crate::error::{AppError, ErrorContext};
use crate::users::{Authority, User};
use crate::validators::{is_valid_identifier, is_valid_reason};

#[derive(Deserialize)]
pub struct DenyJtiRequest {
    pub jti: String,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct DenyFamilyRequest {
    pub user: String,
    pub family: String,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct FamilyPath {
    pub user: String,
    pub family: String,
}

async fn admin_identity(
    claims: &AccessClaims,
    verifier: &CredentialVerifier,
) -> Result<User, AppError> {
    let user = verifier.active_identity(&claims.sub).await?;
    require_authority(&user, Authority::Admin)?;
    Ok(user)
}

/// POST /blacklist/jti
///
/// # Errors
/// - 400: Invalid jti or reason
/// - 401: Missing or invalid bearer token
/// - 403: Caller is not an administrator
pub async fn deny_jti(
    body: web::Json<DenyJtiRequest>,
    claims: web::ReqData<AccessClaims>,
    verifier: web::Data<CredentialVerifier>,
    revocation: web::Data<RevocationService>,
) -> Result<HttpResponse, AppError> {
    let admin = admin_identity(&claims, &verifier).await?;
    let context = ErrorContext::new("deny_jti").with_user(admin.name.clone());

    let jti = is_valid_identifier("jti", &body.jti)?;
    let reason = is_valid_reason(body.reason.as_deref())?;

    revocation.add_jti(&jti, reason.as_deref()).await?;

    tracing::info!(request_id = %context.request_id, admin = %admin.name, jti = %jti, "Deny entry added");
    Ok(HttpResponse::NoContent().finish())
}

/// POST /blacklist/family
pub async fn deny_family(
    body: web::Json<DenyFamilyRequest>,
    claims: web::ReqData<AccessClaims>,
    verifier: web::Data<CredentialVerifier>,
    revocation: web::Data<RevocationService>,
) -> Result<HttpResponse, AppError> {
    let admin = admin_identity(&claims, &verifier).await?;
    let context = ErrorContext::new("deny_family").with_user(admin.name.clone());

    let user = is_valid_identifier("user", &body.user)?;
    let family = is_valid_identifier("family", &body.family)?;
    let reason = is_valid_reason(body.reason.as_deref())?;

    revocation.add_family(&user, &family, reason.as_deref()).await?;

    tracing::info!(
        request_id = %context.request_id,
        admin = %admin.name,
        user = %user,
        family = %family,
        "Family deny entry added"
    );
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /blacklist/jti/{jti}
///
/// # Errors
/// - 404: The jti is not on the denylist
pub async fn allow_jti(
    path: web::Path<String>,
    claims: web::ReqData<AccessClaims>,
    verifier: web::Data<CredentialVerifier>,
    revocation: web::Data<RevocationService>,
) -> Result<HttpResponse, AppError> {
    let admin = admin_identity(&claims, &verifier).await?;
    let jti = is_valid_identifier("jti", &path)?;

    revocation.remove_jti(&jti).await?;

    tracing::info!(admin = %admin.name, jti = %jti, "Deny entry removed");
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /blacklist/family/{user}/{family}
///
/// Lifting a family denial does not revive tokens that were individually
/// denied; only the family's current token becomes usable again.
pub async fn allow_family(
    path: web::Path<FamilyPath>,
    claims: web::ReqData<AccessClaims>,
    verifier: web::Data<CredentialVerifier>,
    revocation: web::Data<RevocationService>,
) -> Result<HttpResponse, AppError> {
    let admin = admin_identity(&claims, &verifier).await?;
    let user = is_valid_identifier("user", &path.user)?;
    let family = is_valid_identifier("family", &path.family)?;

    revocation.remove_family(&user, &family).await?;

    tracing::info!(admin = %admin.name, user = %user, family = %family, "Family deny entry removed");
    Ok(HttpResponse::NoContent().finish())
}
