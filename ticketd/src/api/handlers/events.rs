//! HTTP handlers for event endpoints.

use crate::{
    AppState,
    api::models::{
        events::{EventCreate, EventResponse, EventUpdate, ListEventsQuery},
        pagination::PaginatedResponse,
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        errors::DbError,
        handlers::events::{EventFilter, EventUpdateDecision, Events},
        models::events::{EventCreateDBRequest, EventUpdateDBRequest},
    },
    errors::{Error, Result},
    types::EventId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use rust_decimal::Decimal;

fn map_event_not_found(err: DbError, id: EventId) -> Error {
    match err {
        DbError::NotFound => Error::NotFound {
            resource: "Event".to_string(),
            id: id.to_string(),
        },
        other => Error::Database(other),
    }
}

/// Publish a new event
#[utoipa::path(
    post,
    path = "/events",
    tag = "events",
    summary = "Publish an event",
    description = "Create a new event with a fixed capacity and ticket price (admin only)",
    request_body = EventCreate,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Bad request - start date in the past or invalid capacity/price"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_event(
    State(state): State<AppState>,
    _perm: RequiresPermission<resource::Events, operation::CreateAll>,
    Json(data): Json<EventCreate>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    if data.date <= Utc::now() {
        return Err(Error::PastDate {
            message: "Cannot create events in the past".to_string(),
        });
    }
    if data.capacity < 1 {
        return Err(Error::BadRequest {
            message: "Capacity must be a positive integer".to_string(),
        });
    }
    if data.price < Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Price must not be negative".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Events::new(&mut conn);

    let event = repo.create(&EventCreateDBRequest::from(data)).await?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// Get an event with its live availability
#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "events",
    summary = "Get an event",
    description = "Fetch an event together with its confirmed ticket count and available spots",
    params(("id" = String, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event with availability", body = EventResponse),
        (status = 404, description = "Event not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_event(State(state): State<AppState>, Path(id): Path<EventId>) -> Result<Json<EventResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Events::new(&mut conn);

    let event = repo
        .get_with_availability(id)
        .await
        .map_err(|e| map_event_not_found(e, id))?;

    Ok(Json(EventResponse::from(event)))
}

/// List events
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    summary = "List events",
    description = "Paginated event listing with date range and free-text filters; every row carries its live availability",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Paginated events", body = PaginatedResponse<EventResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<PaginatedResponse<EventResponse>>> {
    let (skip, limit) = query.pagination.params();

    let filter = EventFilter {
        skip,
        limit,
        min_date: query.min_date,
        max_date: query.max_date,
        status: query.status,
        search: query.q,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Events::new(&mut conn);

    let events = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let data = events.into_iter().map(EventResponse::from).collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Update an event
#[utoipa::path(
    patch,
    path = "/events/{id}",
    tag = "events",
    summary = "Update an event",
    description = "Partially update an event (admin only). Capacity may not drop below the confirmed ticket count; price changes never alter existing bookings.",
    params(("id" = String, Path, description = "Event ID")),
    request_body = EventUpdate,
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 400, description = "Bad request - capacity below confirmed tickets"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 404, description = "Event not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    _perm: RequiresPermission<resource::Events, operation::UpdateAll>,
    Json(data): Json<EventUpdate>,
) -> Result<Json<EventResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Events::new(&mut conn);

    let decision = repo
        .update(id, &EventUpdateDBRequest::from(data))
        .await
        .map_err(|e| map_event_not_found(e, id))?;

    match decision {
        EventUpdateDecision::Updated(event) => Ok(Json(EventResponse::from(event))),
        EventUpdateDecision::CapacityBelowConfirmed { requested, confirmed } => {
            Err(Error::InvalidCapacity { requested, confirmed })
        }
    }
}

/// Cancel an event and all its confirmed bookings
#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "events",
    summary = "Cancel an event",
    description = "Mark an event cancelled and cascade the cancellation to every confirmed booking, atomically (admin only)",
    params(("id" = String, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 404, description = "Event not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    _perm: RequiresPermission<resource::Events, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Events::new(&mut conn);

    repo.cancel(id).await.map_err(|e| map_event_not_found(e, id))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::Role;
    use crate::test_utils::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_event_crud_flow(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let starts = Utc::now() + Duration::days(14);
        let response = server
            .post("/api/v1/events")
            .add_header(auth_header_name(), &admin.email)
            .json(&json!({
                "title": "Launch Party",
                "description": "Release celebration",
                "location": "Warehouse 9",
                "date": starts,
                "capacity": 50,
                "price": "25.00",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let created: serde_json::Value = response.json();
        assert_eq!(created["available_spots"], 50);
        assert_eq!(created["confirmed_count"], 0);
        let event_id = created["id"].as_str().unwrap().to_string();

        let response = server
            .get(&format!("/api/v1/events/{event_id}"))
            .add_header(auth_header_name(), &admin.email)
            .await;
        response.assert_status_ok();
        let fetched: serde_json::Value = response.json();
        assert_eq!(fetched["title"], "Launch Party");
        assert_eq!(fetched["status"], "active");

        let response = server
            .patch(&format!("/api/v1/events/{event_id}"))
            .add_header(auth_header_name(), &admin.email)
            .json(&json!({ "title": "Launch Party (moved)", "capacity": 60 }))
            .await;
        response.assert_status_ok();
        let updated: serde_json::Value = response.json();
        assert_eq!(updated["title"], "Launch Party (moved)");
        assert_eq!(updated["capacity"], 60);

        let response = server
            .get("/api/v1/events")
            .add_query_param("q", "launch")
            .add_header(auth_header_name(), &admin.email)
            .await;
        response.assert_status_ok();
        let listed: serde_json::Value = response.json();
        assert_eq!(listed["total_count"], 1);

        let response = server
            .delete(&format!("/api/v1/events/{event_id}"))
            .add_header(auth_header_name(), &admin.email)
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_event_requires_admin(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, Role::Customer).await;

        let response = server
            .post("/api/v1/events")
            .add_header(auth_header_name(), &customer.email)
            .json(&json!({
                "title": "Nope",
                "description": "No permission",
                "location": "Anywhere",
                "date": Utc::now() + Duration::days(1),
                "capacity": 10,
                "price": "5.00",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // Browsing events needs no identity at all, publishing does
        let response = server.get("/api/v1/events").await;
        response.assert_status_ok();

        let response = server
            .post("/api/v1/events")
            .json(&json!({
                "title": "Nope",
                "description": "No identity",
                "location": "Anywhere",
                "date": Utc::now() + Duration::days(1),
                "capacity": 10,
                "price": "5.00",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_event_in_the_past_rejected(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let response = server
            .post("/api/v1/events")
            .add_header(auth_header_name(), &admin.email)
            .json(&json!({
                "title": "Yesterday",
                "description": "Too late",
                "location": "Past",
                "date": Utc::now() - Duration::hours(1),
                "capacity": 10,
                "price": "5.00",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Cannot create events in the past");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_event_is_404(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, Role::Admin).await;

        let response = server
            .patch(&format!("/api/v1/events/{}", uuid::Uuid::new_v4()))
            .add_header(auth_header_name(), &admin.email)
            .json(&json!({ "title": "ghost" }))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
