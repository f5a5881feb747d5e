//! # ticketd: Event Ticketing Control Service
//!
//! `ticketd` is the backend of an event-ticket booking platform:
//! administrators publish events with a finite capacity and a ticket price,
//! customers reserve quantities of tickets against that capacity, and either
//! side can cancel before the event starts.
//!
//! ## Overview
//!
//! The hard problem the service owns is capacity-constrained reservation
//! accounting: for an event with capacity C, the sum of confirmed ticket
//! quantities must never exceed C - under concurrent booking attempts,
//! cancellations, capacity changes and reporting. Everything else (routing,
//! validation, docs) is plumbing around that guarantee.
//!
//! Two design decisions carry the guarantee:
//!
//! - **Availability is derived, never stored.** There is no mutable
//!   "available spots" counter that could drift; every read computes
//!   `capacity - SUM(confirmed quantities)` from the booking table.
//! - **Admission is serialized per event.** Creating a booking locks the
//!   event row (`SELECT ... FOR UPDATE`), recomputes availability inside the
//!   same transaction, and inserts - so two concurrent requests can never
//!   both pass the capacity check against stale data. Cancelling an event
//!   takes the same lock before cascading to its bookings, which makes the
//!   cascade and any in-flight admission mutually exclusive.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence.
//!
//! The **API layer** ([`api`]) exposes a management-and-booking REST surface
//! under `/api/v1`, documented via OpenAPI with a Scalar UI at `/docs`.
//!
//! The **authentication layer** ([`auth`]) trusts a fronting identity proxy:
//! a configurable header carries the caller's email, which is resolved to a
//! user row and role. The service performs authorization (role and ownership
//! checks), not authentication.
//!
//! The **database layer** ([`db`]) uses the repository pattern. Each entity
//! has a repository that owns its queries; the two operations with cross-row
//! invariants (admission, cancel cascade) always run in their own
//! transactions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use ticketd::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = ticketd::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     ticketd::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::models::users::Role,
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
};
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{BookingId, EventId, UserId};

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the ticketd database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the bootstrap administrator account if it doesn't exist.
///
/// Idempotent: a user already registered under `email` is left untouched
/// (including their role), so a demoted admin does not silently regain
/// privileges on restart.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, db: &PgPool) -> Result<UserId, errors::Error> {
    let mut conn = db.acquire().await.map_err(|e| errors::Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    if let Some(existing) = user_repo.get_by_email(email).await? {
        return Ok(existing.id);
    }

    let created = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            first_name: "Platform".to_string(),
            last_name: "Admin".to_string(),
            role: Role::Admin,
        })
        .await?;

    info!(email, "created bootstrap admin user");
    Ok(created.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.cors;

    let origin = if cors_config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new().allow_origin(origin);
    if cors_config.allow_credentials {
        cors = cors.allow_credentials(true);
    }
    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Events (capacity ledger)
        .route("/events", get(api::handlers::events::list_events))
        .route("/events", post(api::handlers::events::create_event))
        .route("/events/{id}", get(api::handlers::events::get_event))
        .route("/events/{id}", patch(api::handlers::events::update_event))
        .route("/events/{id}", delete(api::handlers::events::delete_event))
        // Bookings (reservation lifecycle)
        .route("/bookings", post(api::handlers::bookings::create_booking))
        .route("/bookings", get(api::handlers::bookings::list_my_bookings))
        .route("/bookings/all", get(api::handlers::bookings::list_bookings))
        .route("/bookings/{id}", put(api::handlers::bookings::cancel_booking))
        // Users
        .route("/users", get(api::handlers::users::list_users))
        .route("/users/me", get(api::handlers::users::get_me))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;

    Ok(router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
    ))
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations and bootstraps the admin account
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Like [`Application::new`], but reuse an existing pool (tests)
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        let pool = match pool {
            Some(pool) => pool,
            None => {
                sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.pool.max_connections)
                    .min_connections(config.pool.min_connections)
                    .acquire_timeout(config.pool.acquire_timeout)
                    .connect(&config.database_url)
                    .await?
            }
        };

        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_email, &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("ticketd listening on http://{bind_addr}");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::test_utils::*;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_and_docs_are_open(pool: sqlx::PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");

        let response = server.get("/docs").await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_bootstrap_admin_is_idempotent(pool: sqlx::PgPool) {
        let config = create_test_config();

        let first = crate::create_initial_admin_user(&config.admin_email, &pool).await.unwrap();
        let second = crate::create_initial_admin_user(&config.admin_email, &pool).await.unwrap();
        assert_eq!(first, second);
    }
}
