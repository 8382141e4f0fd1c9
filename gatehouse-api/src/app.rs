/// Application state and router builder
///
/// This module builds the shared services once at startup (store, session
/// authority, credential store, mailer, lifecycle controller) and wires them
/// into the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::{app::{build_router, AppState}, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let state = AppState::build(config).await?;
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use gatehouse_shared::{
    auth::{credential::CredentialStore, session::SessionAuthority},
    db::pool::create_pool,
    lifecycle::LifecycleController,
    mail::{outbox::OutboxMailer, smtp::SmtpMailer, MailTransport, Mailer},
    store::{memory::MemoryStore, postgres::PgStore, AccountRepository, SessionRepository},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<LifecycleController>,
    pub config: Arc<Config>,
}

/// Concrete account and session stores selected by configuration
pub struct Stores {
    pub accounts: Arc<dyn AccountRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Stores {
    /// The in-memory store for `memory://`, PostgreSQL otherwise
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        if config.database.is_memory() {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            return Ok(Self {
                accounts: store.clone(),
                sessions: store,
            });
        }

        let pool = create_pool(config.database.clone()).await?;
        let store = Arc::new(PgStore::new(pool));
        Ok(Self {
            accounts: store.clone(),
            sessions: store,
        })
    }
}

/// Builds the mailer selected by configuration
pub fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.mail.transport {
        MailTransport::Smtp => {
            tracing::info!(host = %config.mail.smtp.host, port = config.mail.smtp.port, "Using SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(&config.mail.smtp, &config.mail.sender)?))
        }
        MailTransport::Outbox => {
            tracing::info!("Using outbox mailer; mail is logged, not sent");
            Ok(Arc::new(OutboxMailer::new()))
        }
    }
}

impl AppState {
    /// Creates application state from already-built services
    pub fn new(controller: LifecycleController, config: Config) -> Self {
        Self {
            controller: Arc::new(controller),
            config: Arc::new(config),
        }
    }

    /// Builds every service from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable, the credential
    /// parameters are invalid, or the mailer can't be set up.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let stores = Stores::connect(&config).await?;
        let mailer = build_mailer(&config)?;
        Self::with_services(config, stores, mailer)
    }

    /// Assembles the lifecycle controller over the given stores and mailer
    pub fn with_services(
        config: Config,
        stores: Stores,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let controller = LifecycleController::new(
            stores.accounts,
            SessionAuthority::new(stores.sessions, config.session.settings()),
            CredentialStore::new(config.credential)?,
            mailer,
            config.lifecycle_settings(),
        );

        Ok(Self::new(controller, config))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health
/// ├── /session
/// │   ├── POST   /                                   login
/// │   ├── GET    /                                   current session
/// │   ├── PUT    /                                   re-authenticate
/// │   └── DELETE /                                   logout
/// ├── /users
/// │   ├── GET    /                                   list accounts
/// │   ├── POST   /                                   register
/// │   ├── GET    /:id                                read account
/// │   ├── PUT    /:id                                change password / update profile
/// │   ├── DELETE /:id                                deactivate
/// │   ├── GET    /:email/:activation_key             pending confirmation lookup
/// │   ├── POST   /password/reset                     request password reset
/// │   ├── PUT    /password/:email/:activation_key    confirm password reset
/// │   └── PUT    /activate/:email/:activation_key    reactivate
/// └── POST   /mail                                   contact form
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new().route(
        "/",
        post(routes::session::login)
            .get(routes::session::current)
            .put(routes::session::reauth)
            .delete(routes::session::logout),
    );

    // The account id and the email of a pending confirmation share a segment
    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list).post(routes::users::register),
        )
        .route(
            "/:id",
            get(routes::users::get)
                .put(routes::users::update)
                .delete(routes::users::deactivate),
        )
        .route("/:id/:activation_key", get(routes::users::lookup_pending))
        .route("/password/reset", post(routes::users::request_password_reset))
        .route(
            "/password/:email/:activation_key",
            put(routes::users::confirm_password_reset),
        )
        .route("/activate/:email/:activation_key", put(routes::users::activate));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/session", session_routes)
        .nest("/users", user_routes)
        .route("/mail", post(routes::meta::contact))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.server.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(config.cors.max_age_seconds))
}
