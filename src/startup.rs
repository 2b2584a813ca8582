use actix_web::dev::Server;
use actix_web::{error, middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{CredentialVerifier, FamilyTracker, RevocationService, RotationService, TokenCodec};
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::middleware::BearerAuth;
use crate::routes::{allow_family, allow_jti, deny_family, deny_jti, health_check, login, me, refresh};
use crate::store::TokenStore;
use crate::users::UserRepository;

/// Services shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub verifier: CredentialVerifier,
    pub tracker: FamilyTracker,
    pub rotation: RotationService,
    pub revocation: RevocationService,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        users: Arc<dyn UserRepository>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&settings.jwt.secret));
        let verifier = CredentialVerifier::new(users);
        let tracker = FamilyTracker::new(store, &settings.store);
        let rotation = RotationService::new(
            verifier.clone(),
            codec.clone(),
            tracker.clone(),
            &settings.jwt,
        );
        let revocation = RevocationService::new(tracker.clone());

        Self {
            codec,
            verifier,
            tracker,
            rotation,
            revocation,
        }
    }
}

fn malformed_body(field: &str) -> error::Error {
    AppError::Validation(ValidationError::InvalidFormat(field.to_string())).into()
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let codec = state.codec.clone();
    let verifier = web::Data::new(state.verifier);
    let rotation = web::Data::new(state.rotation);
    let revocation = web::Data::new(state.revocation);

    tracing::info!(fail_open = state.tracker.is_fail_open(), "Token store policy");

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())

            // Shared state
            .app_data(verifier.clone())
            .app_data(rotation.clone())
            .app_data(revocation.clone())

            // Malformed bodies use the same JSON error envelope as everything else
            .app_data(web::FormConfig::default().error_handler(|err, _| {
                tracing::debug!(error = %err, "Rejected form body");
                malformed_body("form body")
            }))
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                tracing::debug!(error = %err, "Rejected JSON body");
                malformed_body("request body")
            }))

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/token", web::post().to(login))
            .route("/refresh", web::post().to(refresh))

            // Protected routes (require a bearer access token)
            .service(
                web::resource("/me")
                    .wrap(BearerAuth::new(codec.clone()))
                    .route(web::get().to(me)),
            )
            .service(
                web::scope("/blacklist")
                    .wrap(BearerAuth::new(codec.clone()))
                    .route("/jti", web::post().to(deny_jti))
                    .route("/jti/{jti}", web::delete().to(allow_jti))
                    .route("/family", web::post().to(deny_family))
                    .route("/family/{user}/{family}", web::delete().to(allow_family)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
