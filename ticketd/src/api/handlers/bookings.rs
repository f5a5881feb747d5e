//! HTTP handlers for booking endpoints.

use crate::{
    AppState,
    api::models::{
        bookings::{
            BookingCreate, BookingDetailResponse, BookingListResponse, BookingResponse, BookingStats,
            BookingWithEventResponse, ListBookingsQuery,
        },
        users::CurrentUser,
    },
    auth::permissions,
    db::{
        errors::DbError,
        handlers::bookings::{AdmissionDecision, BookingFilter, Bookings, CancelDecision},
        models::bookings::BookingCreateDBRequest,
    },
    errors::{Error, Result},
    types::{BookingId, Operation, Resource},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

/// Reserve tickets for an event
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    summary = "Reserve tickets",
    description = "Reserve a quantity of tickets against an event's capacity. Admission is serialized per event, so two callers can never win the same last seat.",
    request_body = BookingCreate,
    responses(
        (status = 201, description = "Booking confirmed", body = BookingResponse),
        (status = 400, description = "Bad request - past event, cancelled event or insufficient capacity (payload carries the remaining spots)"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_booking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<BookingCreate>,
) -> Result<(StatusCode, Json<BookingResponse>)> {
    if data.quantity < 1 {
        return Err(Error::BadRequest {
            message: "Quantity must be a positive integer".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Bookings::new(&mut conn);

    let request = BookingCreateDBRequest {
        user_id: current_user.id,
        event_id: data.event_id,
        quantity: data.quantity,
    };

    let decision = repo.create(&request).await.map_err(|e| match e {
        DbError::NotFound => Error::NotFound {
            resource: "Event".to_string(),
            id: data.event_id.to_string(),
        },
        other => Error::Database(other),
    })?;

    match decision {
        AdmissionDecision::Admitted(booking) => Ok((StatusCode::CREATED, Json(BookingResponse::from(booking)))),
        AdmissionDecision::EventCancelled => Err(Error::BadRequest {
            message: "Cannot book tickets for a cancelled event".to_string(),
        }),
        AdmissionDecision::PastEvent => Err(Error::PastEvent {
            message: "Cannot book tickets for past events".to_string(),
        }),
        AdmissionDecision::InsufficientCapacity { remaining } => Err(Error::InsufficientCapacity { remaining }),
    }
}

/// Cancel a booking
#[utoipa::path(
    put,
    path = "/bookings/{id}",
    tag = "bookings",
    summary = "Cancel a booking",
    description = "Cancel a confirmed booking before the event starts. Owner-only; cancellation is terminal.",
    params(("id" = String, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingResponse),
        (status = 400, description = "Bad request - already cancelled or past event"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not your booking"),
        (status = 404, description = "Booking not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<BookingId>,
    current_user: CurrentUser,
) -> Result<Json<BookingResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Bookings::new(&mut conn);

    let decision = repo.cancel(id, current_user.id).await.map_err(|e| match e {
        DbError::NotFound => Error::NotFound {
            resource: "Booking".to_string(),
            id: id.to_string(),
        },
        other => Error::Database(other),
    })?;

    match decision {
        CancelDecision::Cancelled(booking) => Ok(Json(BookingResponse::from(booking))),
        CancelDecision::NotOwner => Err(Error::Forbidden {
            message: "You can only cancel your own bookings".to_string(),
        }),
        CancelDecision::AlreadyCancelled => Err(Error::AlreadyCancelled),
        CancelDecision::PastEvent => Err(Error::PastEvent {
            message: "Cannot cancel booking for past events".to_string(),
        }),
    }
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    summary = "List my bookings",
    description = "All bookings owned by the caller, newest first, each joined with its event",
    responses(
        (status = 200, description = "The caller's bookings", body = [BookingWithEventResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_my_bookings(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<BookingWithEventResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Bookings::new(&mut conn);

    let bookings = repo.list_for_user(current_user.id).await?;

    Ok(Json(bookings.into_iter().map(BookingWithEventResponse::from).collect()))
}

/// List bookings across users with optional aggregate statistics
#[utoipa::path(
    get,
    path = "/bookings/all",
    tag = "bookings",
    summary = "List bookings (aggregate view)",
    description = "Paginated booking listing with user/event/status/free-text filters. Non-admin callers are always constrained to their own bookings regardless of the user_id parameter. With show_stats=true the response carries confirmed/cancelled/upComing counts and revenue computed over the same filter (ignoring the status override).",
    params(ListBookingsQuery),
    responses(
        (status = 200, description = "Paginated bookings with optional stats", body = BookingListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
    current_user: CurrentUser,
) -> Result<Json<BookingListResponse>> {
    let (skip, limit) = query.pagination.params();

    // Role scoping: only holders of Bookings/ReadAll may look beyond their
    // own bookings; everyone else is pinned to their own user id no matter
    // what they pass.
    let has_read_all = permissions::has_permission(&current_user, Resource::Bookings, Operation::ReadAll);
    let filter_user_id = if has_read_all {
        query.user_id
    } else {
        Some(current_user.id)
    };

    let filter = BookingFilter {
        skip,
        limit,
        user_id: filter_user_id,
        event_id: query.event_id,
        status: query.status,
        search: query.q,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Bookings::new(&mut conn);

    let rows = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let stats = if query.show_stats == Some(true) {
        Some(BookingStats::from(repo.stats(&filter).await?))
    } else {
        None
    };

    Ok(Json(BookingListResponse {
        data: rows.into_iter().map(BookingDetailResponse::from).collect(),
        total_count,
        skip,
        limit,
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::*;
    use chrono::Duration;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_booking_lifecycle_via_api(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 10, "50.00", Duration::days(7)).await;

        let response = server
            .post("/api/v1/bookings")
            .add_header(auth_header_name(), &customer.email)
            .json(&json!({ "event_id": event.id, "quantity": 2 }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let booking: serde_json::Value = response.json();
        assert_eq!(booking["quantity"], 2);
        assert_eq!(booking["status"], "confirmed");
        assert_eq!(booking["total_amount"], "100.00");
        let booking_id = booking["id"].as_str().unwrap().to_string();

        // Availability reflects the admission
        let response = server
            .get(&format!("/api/v1/events/{}", event.id))
            .add_header(auth_header_name(), &customer.email)
            .await;
        let fetched: serde_json::Value = response.json();
        assert_eq!(fetched["available_spots"], 8);

        let response = server
            .get("/api/v1/bookings")
            .add_header(auth_header_name(), &customer.email)
            .await;
        response.assert_status_ok();
        let mine: serde_json::Value = response.json();
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert_eq!(mine[0]["event"]["title"], event.title);

        let response = server
            .put(&format!("/api/v1/bookings/{booking_id}"))
            .add_header(auth_header_name(), &customer.email)
            .await;
        response.assert_status_ok();
        let cancelled: serde_json::Value = response.json();
        assert_eq!(cancelled["status"], "cancelled");

        // Cancelling again fails the idempotency guard
        let response = server
            .put(&format!("/api/v1/bookings/{booking_id}"))
            .add_header(auth_header_name(), &customer.email)
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Booking is already cancelled");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_insufficient_capacity_payload_carries_remaining(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 3, "10.00", Duration::days(1)).await;

        let response = server
            .post("/api/v1/bookings")
            .add_header(auth_header_name(), &customer.email)
            .json(&json!({ "event_id": event.id, "quantity": 5 }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["remaining"], 3);
        assert_eq!(body["message"], "Only 3 spots available");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_quantity_defaults_to_one(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 5, "12.50", Duration::days(1)).await;

        let response = server
            .post("/api/v1/bookings")
            .add_header(auth_header_name(), &customer.email)
            .json(&json!({ "event_id": event.id }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let booking: serde_json::Value = response.json();
        assert_eq!(booking["quantity"], 1);
        assert_eq!(booking["total_amount"], "12.50");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancel_foreign_booking_forbidden(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::Customer).await;
        let stranger = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 5, "10.00", Duration::days(1)).await;
        let booking = create_test_booking(&pool, owner.id, event.id, 1).await;

        let response = server
            .put(&format!("/api/v1/bookings/{}", booking.id))
            .add_header(auth_header_name(), &stranger.email)
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_all_scopes_non_admins_to_their_own(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let alice = create_test_user(&pool, Role::Customer).await;
        let bob = create_test_user(&pool, Role::Customer).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let event = create_test_event(&pool, 10, "10.00", Duration::days(1)).await;

        create_test_booking(&pool, alice.id, event.id, 1).await;
        create_test_booking(&pool, bob.id, event.id, 1).await;

        // A customer asking for someone else's bookings still only sees their own
        let response = server
            .get("/api/v1/bookings/all")
            .add_query_param("user_id", bob.id)
            .add_header(auth_header_name(), &alice.email)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["data"][0]["user"]["id"], json!(alice.id));

        // An admin may look across users
        let response = server
            .get("/api/v1/bookings/all")
            .add_header(auth_header_name(), &admin.email)
            .await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_count"], 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_stats_block_and_status_override(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, Role::Customer).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let event = create_test_event(&pool, 10, "20.00", Duration::days(1)).await;

        create_test_booking(&pool, customer.id, event.id, 1).await;
        let to_cancel = create_test_booking(&pool, customer.id, event.id, 2).await;

        let response = server
            .put(&format!("/api/v1/bookings/{}", to_cancel.id))
            .add_header(auth_header_name(), &customer.email)
            .await;
        response.assert_status_ok();

        // Filtering rows to confirmed must not narrow the stats population
        let response = server
            .get("/api/v1/bookings/all")
            .add_query_param("status", "confirmed")
            .add_query_param("show_stats", "true")
            .add_header(auth_header_name(), &admin.email)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["stats"]["confirmed"], 1);
        assert_eq!(body["stats"]["cancelled"], 1);
        assert_eq!(body["stats"]["upComing"], 1);
        assert_eq!(body["stats"]["revenue"], "20.00");

        // Without the flag the stats block is omitted entirely
        let response = server
            .get("/api/v1/bookings/all")
            .add_header(auth_header_name(), &admin.email)
            .await;
        let body: serde_json::Value = response.json();
        assert!(body.get("stats").is_none());
    }
}
