/// Middleware module
///
/// Bearer-token authentication for the protected routes.

mod jwt_middleware;

pub use jwt_middleware::BearerAuth;
