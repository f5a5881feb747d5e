//! Database repository for events and their derived availability.
//!
//! Available spots are never stored: every read derives them from the sum of
//! confirmed booking quantities. Mutations that interact with that sum (a
//! capacity decrease, the cancel cascade) take a `FOR UPDATE` row lock on the
//! event so they cannot interleave with a concurrent admission.

use crate::api::models::events::EventStatus;
use crate::db::{
    errors::{DbError, Result},
    models::events::{EventCreateDBRequest, EventDBResponse, EventUpdateDBRequest, EventWithSpotsDBResponse},
};
use crate::types::{EventId, abbrev_uuid};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Filter options for listing events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub skip: i64,
    pub limit: i64,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
    pub search: Option<String>,
}

impl EventFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

/// Outcome of a partial update that may touch capacity
#[derive(Debug)]
pub enum EventUpdateDecision {
    Updated(EventWithSpotsDBResponse),
    /// The requested capacity is below the quantity already confirmed; the
    /// update was not applied.
    CapacityBelowConfirmed { requested: i32, confirmed: i64 },
}

// Database entity model, joined with the confirmed-quantity aggregate
#[derive(Debug, Clone, FromRow)]
struct EventRow {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub capacity: i32,
    pub price: Decimal,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_count: i64,
}

const EVENT_WITH_SPOTS: &str = r#"
    SELECT e.id, e.title, e.description, e.location, e.starts_at, e.capacity,
           e.price, e.status, e.created_at, e.updated_at,
           COALESCE((SELECT SUM(b.quantity) FROM bookings b
                     WHERE b.event_id = e.id AND b.status = 'confirmed'), 0)::BIGINT AS confirmed_count
    FROM events e
"#;

impl From<EventRow> for EventWithSpotsDBResponse {
    fn from(row: EventRow) -> Self {
        // The on-disk relationship can transiently exceed capacity only if the
        // admission lock were bypassed; the floor keeps the reported number
        // non-negative regardless.
        let available_spots = (i64::from(row.capacity) - row.confirmed_count).max(0);
        Self {
            confirmed_count: row.confirmed_count,
            available_spots,
            event: EventDBResponse {
                id: row.id,
                title: row.title,
                description: row.description,
                location: row.location,
                starts_at: row.starts_at,
                capacity: row.capacity,
                price: row.price,
                status: row.status,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

pub struct Events<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Events<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    pub async fn create(&mut self, request: &EventCreateDBRequest) -> Result<EventWithSpotsDBResponse> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (title, description, location, starts_at, capacity, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, location, starts_at, capacity, price, status,
                      created_at, updated_at, 0::BIGINT AS confirmed_count
            "#,
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.starts_at)
        .bind(request.capacity)
        .bind(request.price)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(EventWithSpotsDBResponse::from(row))
    }

    /// Fetch an event with its live confirmed count and available spots
    #[instrument(skip(self), fields(event_id = %abbrev_uuid(&id)), err)]
    pub async fn get_with_availability(&mut self, id: EventId) -> Result<EventWithSpotsDBResponse> {
        let mut query = QueryBuilder::<Postgres>::new(EVENT_WITH_SPOTS);
        query.push(" WHERE e.id = ");
        query.push_bind(id);

        let row = query
            .build_query_as::<EventRow>()
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(EventWithSpotsDBResponse::from(row))
    }

    /// Apply a partial update. A capacity change is checked against the
    /// confirmed quantity under the event's row lock, so it cannot race with
    /// a concurrent admission.
    #[instrument(skip(self, request), fields(event_id = %abbrev_uuid(&id)), err)]
    pub async fn update(&mut self, id: EventId, request: &EventUpdateDBRequest) -> Result<EventUpdateDecision> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        let confirmed = confirmed_quantity(&mut tx, id).await?;

        if let Some(requested) = request.capacity
            && i64::from(requested) < confirmed
        {
            return Ok(EventUpdateDecision::CapacityBelowConfirmed { requested, confirmed });
        }

        // Price changes are intentionally not propagated to existing bookings:
        // their totals are snapshots taken at admission time.
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                starts_at = COALESCE($5, starts_at),
                capacity = COALESCE($6, capacity),
                price = COALESCE($7, price),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, location, starts_at, capacity, price, status,
                      created_at, updated_at,
                      COALESCE((SELECT SUM(b.quantity) FROM bookings b
                                WHERE b.event_id = events.id AND b.status = 'confirmed'), 0)::BIGINT AS confirmed_count
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(request.starts_at)
        .bind(request.capacity)
        .bind(request.price)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(EventUpdateDecision::Updated(EventWithSpotsDBResponse::from(row)))
    }

    /// Cancel an event and cascade to its confirmed bookings in one
    /// transaction. Readers never observe the event cancelled while one of
    /// its bookings is still confirmed, or vice versa.
    #[instrument(skip(self), fields(event_id = %abbrev_uuid(&id)), err)]
    pub async fn cancel(&mut self, id: EventId) -> Result<EventDBResponse> {
        let mut tx = self.db.begin().await?;

        // Same lock scope as admission: a concurrent booking attempt on this
        // event waits here and then sees the cancelled status.
        sqlx::query_scalar::<_, i32>("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        let row = sqlx::query_as::<_, EventRow>(
            r#"
            UPDATE events SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, location, starts_at, capacity, price, status,
                      created_at, updated_at, 0::BIGINT AS confirmed_count
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let cascaded = sqlx::query(
            "UPDATE bookings SET status = 'cancelled', updated_at = NOW() WHERE event_id = $1 AND status = 'confirmed'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(event_id = %abbrev_uuid(&id), cascaded, "event cancelled");

        Ok(EventWithSpotsDBResponse::from(row).event)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    pub async fn list(&mut self, filter: &EventFilter) -> Result<Vec<EventWithSpotsDBResponse>> {
        let mut query = QueryBuilder::<Postgres>::new(EVENT_WITH_SPOTS);
        query.push(" WHERE 1=1");
        push_filters(&mut query, filter);

        query.push(" ORDER BY e.starts_at DESC LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        let rows = query.build_query_as::<EventRow>().fetch_all(&mut *self.db).await?;

        Ok(rows.into_iter().map(EventWithSpotsDBResponse::from).collect())
    }

    /// Count events matching the given filter (without pagination)
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &EventFilter) -> Result<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e WHERE 1=1");
        push_filters(&mut query, filter);

        let count = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;

        Ok(count)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    if let Some(min_date) = filter.min_date {
        query.push(" AND e.starts_at >= ");
        query.push_bind(min_date);
    }

    if let Some(max_date) = filter.max_date {
        query.push(" AND e.starts_at <= ");
        query.push_bind(max_date);
    }

    if let Some(status) = filter.status {
        query.push(" AND e.status = ");
        query.push_bind(status);
    }

    // Case-insensitive substring match across title, description and location
    if let Some(ref search) = filter.search {
        let pattern = format!("%{search}%");
        query.push(" AND (e.title ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR e.description ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR e.location ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}

/// Sum of confirmed booking quantities for an event, inside the caller's
/// transaction.
pub(crate) async fn confirmed_quantity(tx: &mut PgConnection, event_id: EventId) -> Result<i64> {
    let confirmed = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM bookings WHERE event_id = $1 AND status = 'confirmed'",
    )
    .bind(event_id)
    .fetch_one(&mut *tx)
    .await?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::handlers::bookings::{AdmissionDecision, Bookings};
    use crate::db::models::bookings::BookingCreateDBRequest;
    use crate::test_utils::{create_test_event, create_test_user};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_availability_derived_from_confirmed_bookings(pool: PgPool) {
        let user = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 10, "25.00", Duration::days(7)).await;

        let mut conn = pool.acquire().await.unwrap();

        for _ in 0..2 {
            let mut bookings = Bookings::new(&mut conn);
            let decision = bookings
                .create(&BookingCreateDBRequest {
                    user_id: user.id,
                    event_id: event.id,
                    quantity: 2,
                })
                .await
                .unwrap();
            assert!(matches!(decision, AdmissionDecision::Admitted(_)));
        }

        let mut repo = Events::new(&mut conn);
        let fetched = repo.get_with_availability(event.id).await.unwrap();
        assert_eq!(fetched.confirmed_count, 4);
        assert_eq!(fetched.available_spots, 6);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_missing_event_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        let err = repo.get_with_availability(uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_capacity_decrease_below_confirmed_rejected(pool: PgPool) {
        let user = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 10, "10.00", Duration::days(3)).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut bookings = Bookings::new(&mut conn);
        let decision = bookings
            .create(&BookingCreateDBRequest {
                user_id: user.id,
                event_id: event.id,
                quantity: 5,
            })
            .await
            .unwrap();
        assert!(matches!(decision, AdmissionDecision::Admitted(_)));

        let mut repo = Events::new(&mut conn);
        let patch = EventUpdateDBRequest {
            capacity: Some(3),
            ..Default::default()
        };
        let decision = repo.update(event.id, &patch).await.unwrap();
        assert!(matches!(
            decision,
            EventUpdateDecision::CapacityBelowConfirmed { requested: 3, confirmed: 5 }
        ));

        // Capacity must be untouched after the rejection
        let fetched = repo.get_with_availability(event.id).await.unwrap();
        assert_eq!(fetched.event.capacity, 10);

        // Decreasing to exactly the confirmed quantity is allowed
        let patch = EventUpdateDBRequest {
            capacity: Some(5),
            ..Default::default()
        };
        let decision = repo.update(event.id, &patch).await.unwrap();
        match decision {
            EventUpdateDecision::Updated(updated) => {
                assert_eq!(updated.event.capacity, 5);
                assert_eq!(updated.available_spots, 0);
            }
            other => panic!("expected update to apply, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_price_update_does_not_touch_existing_totals(pool: PgPool) {
        let user = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 5, "50.00", Duration::days(1)).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut bookings = Bookings::new(&mut conn);
        let booking = match bookings
            .create(&BookingCreateDBRequest {
                user_id: user.id,
                event_id: event.id,
                quantity: 2,
            })
            .await
            .unwrap()
        {
            AdmissionDecision::Admitted(booking) => booking,
            other => panic!("expected admission, got {other:?}"),
        };
        assert_eq!(booking.total_amount, Decimal::new(10000, 2));

        let mut repo = Events::new(&mut conn);
        let patch = EventUpdateDBRequest {
            price: Some(Decimal::new(9900, 2)),
            ..Default::default()
        };
        repo.update(event.id, &patch).await.unwrap();

        let mut bookings = Bookings::new(&mut conn);
        let listed = bookings.list_for_user(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        // Snapshot total survives the price change
        assert_eq!(listed[0].booking.total_amount, Decimal::new(10000, 2));
        assert_eq!(listed[0].event.price, Decimal::new(9900, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cancel_cascades_to_confirmed_bookings(pool: PgPool) {
        let alice = create_test_user(&pool, Role::Customer).await;
        let bob = create_test_user(&pool, Role::Customer).await;
        let event = create_test_event(&pool, 10, "15.00", Duration::days(2)).await;

        let mut conn = pool.acquire().await.unwrap();
        for user_id in [alice.id, bob.id] {
            let mut bookings = Bookings::new(&mut conn);
            bookings
                .create(&BookingCreateDBRequest {
                    user_id,
                    event_id: event.id,
                    quantity: 1,
                })
                .await
                .unwrap();
        }

        {
            let mut repo = Events::new(&mut conn);
            let cancelled = repo.cancel(event.id).await.unwrap();
            assert_eq!(cancelled.status, EventStatus::Cancelled);
        }

        // Every booking for the event is observed cancelled in the next read
        for user_id in [alice.id, bob.id] {
            let mut bookings = Bookings::new(&mut conn);
            let listed = bookings.list_for_user(user_id).await.unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].booking.status, crate::api::models::bookings::BookingStatus::Cancelled);
        }

        let mut repo = Events::new(&mut conn);
        let fetched = repo.get_with_availability(event.id).await.unwrap();
        assert_eq!(fetched.confirmed_count, 0);
        assert_eq!(fetched.event.status, EventStatus::Cancelled);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_search(pool: PgPool) {
        let now = Utc::now();
        create_test_event_with(&pool, "Rust Conf", "Systems programming talks", "Berlin", now + Duration::days(5)).await;
        create_test_event_with(&pool, "Jazz Night", "Live quartet", "Paris", now + Duration::days(10)).await;
        create_test_event_with(&pool, "Food Fair", "Street food in the park", "Berlin", now + Duration::days(40)).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);

        // Free-text search matches location too
        let filter = EventFilter {
            search: Some("berlin".to_string()),
            ..EventFilter::new(0, 10)
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 2);
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 2);

        // Date range is inclusive
        let filter = EventFilter {
            min_date: Some(now),
            max_date: Some(now + Duration::days(14)),
            ..EventFilter::new(0, 10)
        };
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 2);
        // Newest start date first
        assert_eq!(rows[0].event.title, "Jazz Night");
        assert_eq!(rows[1].event.title, "Rust Conf");

        // Pagination applies after filtering
        let filter = EventFilter::new(1, 1);
        let rows = repo.list(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(repo.count(&EventFilter::new(1, 1)).await.unwrap(), 3);
    }

    async fn create_test_event_with(pool: &PgPool, title: &str, description: &str, location: &str, starts_at: DateTime<Utc>) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Events::new(&mut conn);
        repo.create(&EventCreateDBRequest {
            title: title.to_string(),
            description: description.to_string(),
            location: location.to_string(),
            starts_at,
            capacity: 100,
            price: Decimal::new(1000, 2),
        })
        .await
        .unwrap();
    }
}
