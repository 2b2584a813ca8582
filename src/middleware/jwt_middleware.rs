/// Bearer Authentication Middleware
///
/// Decodes the access token from the Authorization header and injects its
/// claims into request extensions for use by route handlers. Refresh tokens
/// are rejected here: only `type = access` grants access to protected routes.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{AccessClaims, TokenCodec, TokenType};
use crate::error::{AppError, AuthError};

/// Bearer middleware for protecting routes
pub struct BearerAuth {
    codec: Arc<TokenCodec>,
}

impl BearerAuth {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerAuthService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    codec: Arc<TokenCodec>,
}

/// Token part of an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let Some(token) = token else {
            tracing::debug!(path = %req.path(), "Missing bearer token");
            return Box::pin(async { Err(AppError::Auth(AuthError::MissingToken).into()) });
        };

        match self.codec.decode::<AccessClaims>(&token, TokenType::Access) {
            Ok(decoded) => {
                tracing::debug!(user = %decoded.claims.sub, "Access token validated");
                req.extensions_mut().insert(decoded.claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), error = %e, "Access token rejected");
                Box::pin(async move { Err(AppError::Auth(e).into()) })
            }
        }
    }
}
