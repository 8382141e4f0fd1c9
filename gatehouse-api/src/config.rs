/// Configuration management for the API server
///
/// Configuration is layered, later sources overriding earlier ones:
///
/// 1. Built-in defaults
/// 2. `config/default.toml` (optional)
/// 3. `config/{GATEHOUSE_ENV}.toml` (optional, `GATEHOUSE_ENV` defaults to `development`)
/// 4. Environment variables prefixed with `GATEHOUSE__`, nested with `__`
///
/// A `.env` file is loaded first if present.
///
/// # Environment Variables
///
/// - `GATEHOUSE__DATABASE__URL`: PostgreSQL connection string, or `memory://`
/// - `GATEHOUSE__SERVER__PORT`: Port to bind to (default: 5000)
/// - `GATEHOUSE__SERVER__DOMAIN`: Base URL of the client application
/// - `GATEHOUSE__MAIL__TRANSPORT`: `smtp` or `outbox`
/// - `GATEHOUSE__MAIL__ADMINS`: Comma-separated contact form recipients
/// - `GATEHOUSE__LOGGING__JSON`: Emit JSON log lines
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use config::{Environment, File};
use gatehouse_shared::{
    auth::{credential::CredentialParams, session::SessionSettings},
    db::pool::DatabaseConfig,
    lifecycle::LifecycleSettings,
    mail::MailSettings,
};
use serde::Deserialize;

/// Longest accepted session lifetime (one year)
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Complete application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Product name used in mail
    pub app_name: String,

    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub mail: MailSettings,
    pub cors: CorsConfig,
    pub credential: CredentialParams,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Base URL of the client application; mailed links point here
    pub domain: String,

    /// Enables HSTS
    pub production: bool,
}

/// Session cookie and lifetime configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,

    /// Only send the cookie over HTTPS
    pub secure_cookie: bool,

    pub ttl_hours: i64,
    pub reauth_window_minutes: i64,
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any origin without credentials
    pub allowed_origins: Vec<String>,

    pub max_age_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Gatehouse".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "memory://".to_string(),
                ..DatabaseConfig::default()
            },
            session: SessionConfig::default(),
            mail: MailSettings::default(),
            cors: CorsConfig::default(),
            credential: CredentialParams::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            domain: "http://localhost:9000".to_string(),
            production: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let settings = SessionSettings::default();
        Self {
            cookie_name: "gatehouse_session".to_string(),
            secure_cookie: false,
            ttl_hours: settings.ttl_hours,
            reauth_window_minutes: settings.reauth_window_minutes,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:9000".to_string()],
            max_age_seconds: 21600,
        }
    }
}

impl SessionConfig {
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            ttl_hours: self.ttl_hours,
            reauth_window_minutes: self.reauth_window_minutes,
        }
    }
}

impl Config {
    /// Loads and validates configuration from files and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A configuration file is malformed
    /// - An environment variable has an invalid value
    /// - Validation fails (see [`Config::validate`])
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Config = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("GATEHOUSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("mail.admins")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks values that would only fail later, at first use
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url must be set (use memory:// for the in-memory store)");
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }

        if !self.mail.sender.contains('@') {
            anyhow::bail!("mail.sender must be a mail address, got {:?}", self.mail.sender);
        }

        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session.ttl_hours) {
            anyhow::bail!(
                "session.ttl_hours must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS,
                self.session.ttl_hours
            );
        }

        let ttl_minutes = self.session.ttl_hours * 60;
        if !(0..=ttl_minutes).contains(&self.session.reauth_window_minutes) {
            anyhow::bail!(
                "session.reauth_window_minutes must be between 0 and the session lifetime ({} minutes), got {}",
                ttl_minutes,
                self.session.reauth_window_minutes
            );
        }

        if self.session.cookie_name.trim().is_empty() {
            anyhow::bail!("session.cookie_name must be set");
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Names and addresses the lifecycle puts into mail
    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            app_name: self.app_name.clone(),
            domain: self.server.domain.clone(),
            admins: self.mail.admins.clone(),
        }
    }
}
