mod auth;
mod blacklist;
mod health_check;

pub use auth::{login, me, refresh};
pub use blacklist::{allow_family, allow_jti, deny_family, deny_jti};
pub use health_check::health_check;
