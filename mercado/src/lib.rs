//! # mercado: classifieds and premium content marketplace backend
//!
//! `mercado` serves a Portuguese/Spanish marketplace where people publish classified listings,
//! blog posts and premium videos, buy visibility boosts, enter paid contests and talk in a forum.
//! Everything that costs something is paid for in **credits**, an internal currency bought with
//! card payments and tracked in a ledger.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses PostgreSQL for all persistence.
//!
//! ### Request Flow
//!
//! A request passes through CORS and tracing layers and reaches a handler in [`api::handlers`].
//! The caller is identified from the session cookie or a bearer token by the
//! [`CurrentUser`](api::models::users::CurrentUser) extractor; capability checks use
//! [`auth::gate::Requires`], and the whole `/admin` router sits behind [`auth::gate::admin_gate`].
//! Handlers talk to the database through the repositories in [`db::handlers`].
//!
//! ### Money
//!
//! The **ledger** ([`ledger`]) owns every balance change. Debits are a single conditional update
//! that fails with `InsufficientCredits` instead of going negative, and every spend between two
//! users is recorded as a Transaction split into platform fee and provider amount. Providers
//! withdraw through payout requests that attach unpaid Transactions first-fit.
//!
//! Card payments go through a [`payment_providers::PaymentProvider`]. A checkout is stored as
//! `PENDING` and completed once by [`reconciliation`] when the signed webhook arrives, which makes
//! redelivery harmless.
//!
//! **Background services** run alongside the HTTP server: a periodic sweep that clears the active
//! flag on expired boosts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use mercado::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = mercado::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     mercado::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

#[cfg(test)]
pub mod test_utils;

pub mod api;
pub mod auth;
pub mod commerce;
pub mod config;
pub mod contests;
pub mod db;
pub mod email;
pub mod errors;
pub mod ledger;
pub mod openapi;
pub mod payment_providers;
pub mod reconciliation;
pub mod telemetry;
pub mod types;

use crate::{
    api::{handlers, models::users::Role},
    auth::{gate::admin_gate, password},
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    errors::Error,
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use bon::Builder;
pub use config::Config;
use config::CorsOrigin;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the mercado database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: an existing account with this email keeps its id and has its password replaced
/// when one is given. The account is created verified with role `ADMIN`.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> Result<UserId, Error> {
    let email = email.trim().to_lowercase();
    let password_hash = password.map(password::hash_string).transpose()?;

    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut tx);

    let id = match users.get_user_by_email(&email).await? {
        Some(existing) => {
            if password_hash.is_some() {
                users
                    .update(
                        existing.id,
                        &UserUpdateDBRequest {
                            display_name: None,
                            password_hash,
                            role: Some(Role::Admin),
                            is_client: None,
                            is_content_creator: None,
                            is_service_provider: None,
                        },
                    )
                    .await?;
            }
            existing.id
        }
        None => {
            let username = email.split('@').next().unwrap_or("admin").to_string();
            users
                .create(&UserCreateDBRequest {
                    username,
                    email: email.clone(),
                    display_name: None,
                    password_hash,
                    role: Role::Admin,
                    flags: Default::default(),
                    email_verified: true,
                })
                .await?
                .id
        }
    };

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(id)
}

/// Connect to PostgreSQL and run migrations
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PATCH, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// Public and signed-in routes live at the root; the back-office is nested under `/admin` with
/// [`admin_gate`] applied as a route layer, so unmatched admin paths still 404.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/auth/verify", post(handlers::auth::verify_email));

    let account_routes = Router::new()
        .route("/user/me", get(handlers::users::get_me).patch(handlers::users::update_me))
        .route("/user/credits", get(handlers::users::get_credits))
        .route("/user/transactions", get(handlers::users::list_transactions))
        .route("/user/payouts", get(handlers::users::list_payouts))
        .route("/user/payouts/request", post(handlers::users::request_payout));

    let content_routes = Router::new()
        .route(
            "/listings",
            get(handlers::listings::list_listings).post(handlers::listings::create_listing),
        )
        .route(
            "/listings/{id}",
            get(handlers::listings::get_listing).delete(handlers::listings::delete_listing),
        )
        .route(
            "/blog-posts",
            get(handlers::blog_posts::list_blog_posts).post(handlers::blog_posts::create_blog_post),
        )
        .route("/vods", get(handlers::vods::list_vods).post(handlers::vods::create_vod))
        .route("/vods/{id}", get(handlers::vods::get_vod))
        .route(
            "/forum/threads",
            get(handlers::forum::list_threads).post(handlers::forum::create_thread),
        )
        .route("/forum/threads/{id}", get(handlers::forum::get_thread))
        .route("/forum/posts", post(handlers::forum::create_post))
        .route("/wishlist", get(handlers::wishlist::get_wishlist))
        .route("/wishlist/items", post(handlers::wishlist::add_item))
        .route("/wishlist/items/{product_id}", delete(handlers::wishlist::remove_item));

    let money_routes = Router::new()
        .route("/purchase/boost", post(handlers::purchases::purchase_boost))
        .route("/purchase/boosts", get(handlers::purchases::list_my_boosts))
        .route("/purchase/vod", post(handlers::purchases::unlock_vod))
        .route("/checkout/credits", post(handlers::checkout::checkout_credits))
        .route("/checkout/pro", post(handlers::checkout::checkout_pro))
        .route("/checkout/turbo", post(handlers::checkout::checkout_turbo))
        .route(
            "/contests",
            get(handlers::contests::list_contests).post(handlers::contests::create_contest),
        )
        .route("/contests/{id}", get(handlers::contests::get_contest))
        .route("/contests/{id}/enter", post(handlers::contests::enter_contest))
        .route("/contests/{id}/resolve", post(handlers::contests::resolve_contest))
        // Called by the payment processor, authenticated by signature
        .route("/webhooks/payments", post(handlers::webhooks::payment_webhook));

    let admin_routes = Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route("/users/{id}", axum::routing::patch(handlers::admin::update_user))
        .route("/users/{id}/credits", post(handlers::admin::adjust_credits))
        .route("/listings", get(handlers::admin::list_listings))
        .route("/listings/{id}/approve", post(handlers::admin::approve_listing))
        .route("/listings/{id}/reject", post(handlers::admin::reject_listing))
        .route("/payouts", get(handlers::admin::list_payouts))
        .route("/payouts/{id}/approve", post(handlers::admin::approve_payout))
        .route("/payouts/{id}/reject", post(handlers::admin::reject_payout))
        .route("/forum/threads/{id}/lock", post(handlers::admin::lock_thread))
        .route("/reports/summary", get(handlers::admin::report_summary))
        .route_layer(from_fn_with_state(state.clone(), admin_gate));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(auth_routes)
        .merge(account_routes)
        .merge(content_routes)
        .merge(money_routes)
        .nest("/admin", admin_routes)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Background tasks that run alongside the HTTP server.
///
/// Dropping this cancels the shutdown token through `drop_guard`, which stops every task.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start the background tasks enabled in `config.background_services`
fn setup_background_services(pool: PgPool, config: &Config, shutdown_token: CancellationToken) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    let mut background_tasks = Vec::new();

    let sweep = &config.background_services.boost_expiry_sweep;
    if sweep.enabled {
        let handle = tokio::spawn(ledger::boosts::run_expiry_sweep(pool, sweep.interval, shutdown_token.clone()));
        background_tasks.push(handle);
    } else {
        info!("Boost expiry sweep disabled; expired boosts are still hidden by read-time checks");
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects, runs migrations, creates the initial admin and
///    starts background services
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown signal resolves, background services are stopped and the
///    pool is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting mercado with configuration: {:#?}", config);
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Build the application on an already migrated pool
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let bg_services = setup_background_services(pool.clone(), &config, CancellationToken::new());

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Mercado listening on http://{}, docs at http://localhost:{}/docs", bind_addr, self.config.port);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
