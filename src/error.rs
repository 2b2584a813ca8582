/// Error Handling Module
///
/// One domain enum per concern, unified into `AppError` for control flow and
/// mapped to HTTP responses at the edge.
///
/// Login and refresh failures are deliberately collapsed: whatever check
/// failed, the caller sees the same 401 body. The distinct variants only show
/// up in logs.

use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use thiserror::Error;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(String),
}

/// Authentication failures raised by login, refresh and bearer validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity is inactive")]
    InactiveIdentity,
    /// Malformed, badly signed, expired, wrong type, or denylisted token.
    #[error("invalid token")]
    InvalidToken,
    /// A rotated-out refresh token was presented again.
    #[error("refresh token reuse detected")]
    ReuseDetected,
    #[error("missing authentication token")]
    MissingToken,
    /// Only raised when the tracker runs fail-closed.
    #[error("token store unavailable")]
    StoreUnavailable,
}

/// Errors of the privileged revocation interface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevocationError {
    #[error("insufficient authority")]
    Forbidden,
    #[error("revocation target not found: {0}")]
    TargetNotFound(String),
}

/// User store errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionPool(String),
    #[error("Database error: {0}")]
    UnexpectedError(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
    #[error("Config parse error: {0}")]
    ParseError(String),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Revocation(#[from] RevocationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for every failure the caller must see as "could not validate credentials".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, AppError::Auth(e) if *e != AuthError::StoreUnavailable)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            other => AppError::Database(DatabaseError::UnexpectedError(other.to_string())),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(ConfigError::ParseError(err.to_string()))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

pub const UNAUTHENTICATED_MESSAGE: &str = "Could not validate credentials";

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Auth(AuthError::StoreUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Token store temporarily unavailable".to_string(),
            ),
            // Every other authentication failure looks the same from outside.
            AppError::Auth(_) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                UNAUTHENTICATED_MESSAGE.to_string(),
            ),

            AppError::Revocation(RevocationError::Forbidden) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You don't have permission to access".to_string(),
            ),
            AppError::Revocation(e @ RevocationError::TargetNotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            }

            AppError::Database(DatabaseError::ConnectionPool(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Database service temporarily unavailable".to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error occurred".to_string(),
            ),

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::ReuseDetected) => {
                tracing::warn!(request_id = request_id, error = %self, "Refresh token reuse rejected");
            }
            AppError::Auth(AuthError::StoreUnavailable) => {
                tracing::error!(request_id = request_id, error = %self, "Token store unavailable");
            }
            AppError::Auth(e) => {
                tracing::info!(request_id = request_id, error = %e, "Authentication rejected");
            }
            AppError::Revocation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Revocation request rejected");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        let mut builder = HttpResponse::build(status);
        if self.is_unauthenticated() {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        builder.json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Revocation(RevocationError::Forbidden) => StatusCode::FORBIDDEN,
            AppError::Revocation(RevocationError::TargetNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Database(DatabaseError::ConnectionPool(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context carried into structured logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user: None,
            operation: operation.into(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_body(err: AppError) -> (StatusCode, ErrorResponse) {
        <AppError as ErrorHandler>::error_response(&err, "test-123")
    }

    #[test]
    fn test_auth_failures_are_indistinguishable() {
        let failures = vec![
            AuthError::InvalidCredentials,
            AuthError::InactiveIdentity,
            AuthError::InvalidToken,
            AuthError::ReuseDetected,
            AuthError::MissingToken,
        ];

        for failure in failures {
            let (status, body) = status_and_body(failure.into());
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body.code, "UNAUTHORIZED");
            assert_eq!(body.message, UNAUTHENTICATED_MESSAGE);
        }
    }

    #[test]
    fn test_store_unavailable_maps_to_503() {
        let (status, body) = status_and_body(AuthError::StoreUnavailable.into());
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, 503);
        assert!(!AppError::from(AuthError::StoreUnavailable).is_unauthenticated());
    }

    #[test]
    fn test_revocation_errors_keep_their_status() {
        let (status, _) = status_and_body(RevocationError::Forbidden.into());
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = status_and_body(RevocationError::TargetNotFound("jti".into()).into());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[test]
    fn test_unauthorized_response_carries_bearer_challenge() {
        let response = ResponseError::error_response(&AppError::from(AuthError::InvalidToken));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_only_unauthenticated_responses_carry_challenge() {
        let response = ResponseError::error_response(&AppError::from(AuthError::StoreUnavailable));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let response = ResponseError::error_response(&AppError::from(RevocationError::Forbidden));
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let response = ResponseError::error_response(&AppError::from(AuthError::MissingToken));
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("token_refresh");
        assert_eq!(ctx.operation, "token_refresh");
        assert!(ctx.user.is_none());

        let ctx = ctx.with_user("alice");
        assert_eq!(ctx.user.as_deref(), Some("alice"));
    }
}
