use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokenkeeper::configuration::get_configuration;
use tokenkeeper::startup::{run, AppState};
use tokenkeeper::store::{InMemoryTokenStore, RedisTokenStore, TokenStore};
use tokenkeeper::telemetry::init_telemetry;
use tokenkeeper::users::{InMemoryUserRepository, PgUserRepository, UserRepository};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let users: Arc<dyn UserRepository> = match &configuration.database {
        Some(database) => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;
            tracing::info!("Database connection pool created successfully");
            Arc::new(PgUserRepository::new(pool))
        }
        None => {
            tracing::warn!("No database configured, using an empty in-memory user store");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    let store: Arc<dyn TokenStore> = match &configuration.store.redis_url {
        Some(url) => {
            let store = RedisTokenStore::new(url).map_err(|e| {
                tracing::error!("Invalid Redis URL: {}", e);
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "Token store configuration error")
            })?;
            tracing::info!("Using Redis token store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No Redis URL configured, token state is local to this process");
            Arc::new(InMemoryTokenStore::new())
        }
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let state = AppState::new(&configuration, users, store);
    let server = run(listener, state)?;
    tracing::info!("Server started successfully");

    server.await
}
