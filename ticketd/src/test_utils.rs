//! Test utilities for integration testing

use crate::api::models::users::Role;
use crate::config::{AuthConfig, Config, CorsConfig, PoolSettings, ProxyHeaderAuthConfig};
use crate::db::handlers::{Bookings, Events, Repository, Users};
use crate::db::models::bookings::{BookingCreateDBRequest, BookingDBResponse};
use crate::db::models::events::{EventCreateDBRequest, EventDBResponse};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Identity header used by all tests; matches the default proxy-header
/// configuration.
pub fn auth_header_name() -> &'static str {
    "x-ticketd-user"
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        // The pool is always injected in tests; this URL is never dialled
        database_url: "postgres://unused".to_string(),
        pool: PoolSettings::default(),
        admin_email: "admin@test.com".to_string(),
        auth: AuthConfig {
            proxy_header: ProxyHeaderAuthConfig {
                header_name: auth_header_name().to_string(),
                auto_create_users: false,
                default_role: Role::Customer,
            },
            cors: CorsConfig::default(),
        },
    }
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let app = crate::Application::new_with_pool(create_test_config(), Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let tag = Uuid::new_v4().simple().to_string();

    let user_create = UserCreateDBRequest {
        email: format!("testuser_{tag}@example.com"),
        first_name: format!("Test{tag}"),
        last_name: "User".to_string(),
        role,
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}

/// Create an event starting `starts_in` from now with the given capacity and
/// price (decimal string, e.g. "50.00").
pub async fn create_test_event(pool: &PgPool, capacity: i32, price: &str, starts_in: Duration) -> EventDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut events_repo = Events::new(&mut conn);

    let request = EventCreateDBRequest {
        title: format!("Test Event {}", Uuid::new_v4().simple()),
        description: "An event created by the test suite".to_string(),
        location: "Test Hall".to_string(),
        starts_at: Utc::now() + starts_in,
        capacity,
        price: Decimal::from_str(price).expect("invalid test price"),
    };

    // Events in the past are inserted directly: the repository itself does
    // not gate creation dates (the API layer does), and some tests need a
    // past event on disk.
    events_repo
        .create(&request)
        .await
        .expect("Failed to create test event")
        .event
}

pub async fn create_test_booking(pool: &PgPool, user_id: Uuid, event_id: Uuid, quantity: i32) -> BookingDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut bookings_repo = Bookings::new(&mut conn);

    let decision = bookings_repo
        .create(&BookingCreateDBRequest {
            user_id,
            event_id,
            quantity,
        })
        .await
        .expect("Failed to create test booking");

    match decision {
        crate::db::handlers::bookings::AdmissionDecision::Admitted(booking) => booking,
        other => panic!("test booking was not admitted: {other:?}"),
    }
}
