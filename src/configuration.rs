use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    /// Backing user store; the in-memory repository is used when absent.
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server URL without a database, for creating one.
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (e.g., 1800 for 30 minutes)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
}

/// Revocation store settings
#[derive(serde::Deserialize, Clone)]
pub struct StoreSettings {
    /// e.g. `redis://127.0.0.1:6379`; in-memory store when unset
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Keep serving when the store is unreachable instead of refusing requests.
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
    /// Used when a deny entry is written without a known token expiry.
    #[serde(default = "default_deny_ttl_days")]
    pub default_deny_ttl_days: i64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_fail_open() -> bool {
    true
}

fn default_deny_ttl_days() -> i64 {
    7
}

fn default_key_prefix() -> String {
    "refresh".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            fail_open: default_fail_open(),
            default_deny_ttl_days: default_deny_ttl_days(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl StoreSettings {
    pub fn default_deny_ttl_seconds(&self) -> i64 {
        self.default_deny_ttl_days * 24 * 60 * 60
    }
}

impl Settings {
    /// Reject settings the token lifecycle cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.jwt.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.jwt.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must be positive".to_string(),
            ));
        }
        if self.store.default_deny_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "store.default_deny_ttl_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from an optional `configuration` file, overridden by
/// `APP_`-prefixed environment variables (`APP_JWT__SECRET`, ...).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}
